//! Integration test: fleet enable sequence and cyclic exchange.
//!
//! 1. Healthy slaves reach OperationEnabled in four cycles
//! 2. One slave that never answers holds the whole fleet
//! 3. A slave that powers up in Fault is reset first
//! 4. Commands reach the device and come back as feedback

use super::fixtures::{PPR, config, enable, feedback, image_i32, image_u16, started};
use motor_common::entry::InterfaceId;
use motor_common::motor::types::{CommandRecord, DriveState};
use std::f64::consts::PI;

fn offset(manager: &motor_manager::MotorManager, binding: usize, id: InterfaceId) -> usize {
    manager.binding(binding).unwrap().offset_of(id.as_u8()).unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn healthy_fleet_enables_in_four_cycles() {
    let mut manager = started(&config(2, ""));
    assert_eq!(enable(&mut manager, 10), Some(4));

    for i in 0..2 {
        assert_eq!(manager.drive_state(i), Some(DriveState::OperationEnabled));
    }
    assert!(!manager.is_disabled());
}

#[test]
fn stuck_slave_holds_the_fleet() {
    let mut manager = started(&config(2, "stuck_slaves = [1]"));
    assert_eq!(enable(&mut manager, 50), None);

    // The responsive drive keeps its confirmation while the fleet waits.
    assert_eq!(manager.drive_state(0), Some(DriveState::OperationEnabled));
    assert_eq!(manager.drive_state(1), Some(DriveState::SwitchOnDisabled));
    assert!(!manager.is_enabled());
}

#[test]
fn feedback_is_not_written_while_enabling() {
    let mut manager = started(&config(1, "stuck_slaves = [0]"));
    let mut states = feedback(&manager);
    for _ in 0..5 {
        manager.update(false, &mut states, &[]).unwrap();
    }
    assert_eq!(states[0].status_word, 0);
}

#[test]
fn faulted_slave_is_reset_before_enabling() {
    let mut manager = started(&config(1, "fault_slaves = [0]"));
    assert_eq!(enable(&mut manager, 10), Some(5));

    let mut states = feedback(&manager);
    manager.update(false, &mut states, &[]).unwrap();
    assert_eq!(states[0].error_code, 0);
    assert_eq!(states[0].status_word & 0x006F, 0x0027);
}

#[test]
fn position_command_round_trips_through_the_device() {
    let mut manager = started(&config(1, ""));
    enable(&mut manager, 10).unwrap();

    let mut states = feedback(&manager);
    let mut command = CommandRecord::new(0);
    command.set_position(PI).unwrap();
    manager.update(false, &mut states, &[command]).unwrap();

    let target = offset(&manager, 0, InterfaceId::TargetPosition);
    assert_eq!(image_i32(&mut manager, target), 65536);

    // The device follows on the next receive.
    manager.update(false, &mut states, &[]).unwrap();
    let actual = offset(&manager, 0, InterfaceId::CurrentPosition);
    assert_eq!(image_i32(&mut manager, actual), (PPR / 2) as i32);
    assert_eq!(states[0].binding, 0);
    assert!((states[0].position - PI).abs() < 1e-9);
}

#[test]
fn commands_are_routed_by_binding() {
    let mut manager = started(&config(2, ""));
    enable(&mut manager, 10).unwrap();

    let mut states = feedback(&manager);
    let mut command = CommandRecord::new(1);
    command.set_position(-PI / 2.0).unwrap();
    manager.update(false, &mut states, &[command]).unwrap();
    manager.update(false, &mut states, &[]).unwrap();

    assert!(states[0].position.abs() < 1e-9);
    assert!((states[1].position + PI / 2.0).abs() < 1e-9);
}

#[test]
fn control_word_stays_at_enable_operation() {
    let mut manager = started(&config(1, ""));
    enable(&mut manager, 10).unwrap();

    let mut states = feedback(&manager);
    for _ in 0..3 {
        manager.update(false, &mut states, &[]).unwrap();
    }
    let control = offset(&manager, 0, InterfaceId::ControlWord);
    assert_eq!(image_u16(&mut manager, control), 0x000F);
    assert_eq!(manager.drive_state(0), Some(DriveState::OperationEnabled));
}

#[test]
fn shipped_configuration_loads_and_enables() {
    let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../config/manager.toml");
    let mut manager =
        motor_manager::MotorManager::load(&path, &motor_manager::Registry::with_builtin()).unwrap();
    assert_eq!(manager.binding_count(), 2);
    assert_eq!(manager.period_ns(), 1_000_000);

    manager.start().unwrap();
    assert_eq!(enable(&mut manager, 10), Some(4));
}
