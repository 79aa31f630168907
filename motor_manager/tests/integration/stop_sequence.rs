//! Integration test: disable sequence, pause and re-enable.

use super::fixtures::{config, disable, enable, feedback, started};
use motor_common::motor::types::DriveState;

#[test]
fn stop_walks_the_fleet_down_in_four_cycles() {
    let mut manager = started(&config(2, ""));
    enable(&mut manager, 10).unwrap();

    let mut states = feedback(&manager);
    let first = manager.update(true, &mut states, &[]).unwrap();
    assert!(!first);
    assert!(!manager.is_enabled());
    assert_eq!(manager.drive_state(0), Some(DriveState::OperationEnabled));

    assert_eq!(disable(&mut manager, 10), Some(3));
    assert!(manager.is_disabled());
    for i in 0..2 {
        assert_eq!(manager.drive_state(i), Some(DriveState::SwitchOnDisabled));
    }
}

#[test]
fn stop_before_enable_is_immediately_done() {
    let mut manager = started(&config(2, ""));
    assert_eq!(disable(&mut manager, 10), Some(1));
}

#[test]
fn stop_keeps_reporting_disabled() {
    let mut manager = started(&config(1, ""));
    enable(&mut manager, 10).unwrap();
    disable(&mut manager, 10).unwrap();

    let mut states = feedback(&manager);
    for _ in 0..3 {
        assert!(manager.update(true, &mut states, &[]).unwrap());
    }
}

#[test]
fn faulted_slave_counts_as_disabled() {
    let mut manager = started(&config(1, "fault_slaves = [0]"));
    assert_eq!(disable(&mut manager, 10), Some(1));
}

#[test]
fn resume_after_pause_re_enables_the_fleet() {
    let mut manager = started(&config(2, ""));
    enable(&mut manager, 10).unwrap();
    disable(&mut manager, 10).unwrap();
    assert!(manager.is_disabled());

    let mut states = feedback(&manager);
    assert!(!manager.update(false, &mut states, &[]).unwrap());
    assert!(!manager.is_disabled());

    assert_eq!(enable(&mut manager, 10), Some(3));
    for i in 0..2 {
        assert_eq!(manager.drive_state(i), Some(DriveState::OperationEnabled));
    }

    // A second pause runs the full disable sequence again.
    assert_eq!(disable(&mut manager, 10), Some(4));
}

#[test]
fn stop_deactivates_transports() {
    let mut manager = started(&config(1, ""));
    assert!(manager.is_active());
    manager.stop().unwrap();
    assert!(!manager.is_active());
    assert!(manager.process_data(0).is_none());
}
