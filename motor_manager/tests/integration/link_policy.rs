//! Integration test: link errors and health diagnostics.

use super::fixtures::{config, enable, feedback, started};
use motor_common::error::{LinkError, MotorError};
use motor_common::motor::types::MasterId;
use motor_manager::{LinkErrorPolicy, LinkPhase};
use std::sync::{Arc, Mutex};

/// Records every failure and keeps cycling.
struct RecordingPolicy {
    seen: Arc<Mutex<Vec<(MasterId, LinkPhase)>>>,
}

impl LinkErrorPolicy for RecordingPolicy {
    fn on_link_error(
        &mut self,
        master_id: MasterId,
        phase: LinkPhase,
        _error: LinkError,
    ) -> Result<(), MotorError> {
        self.seen.lock().unwrap().push((master_id, phase));
        Ok(())
    }
}

#[test]
fn default_policy_aborts_on_receive_failure() {
    let mut manager = started(&config(1, "fail_receive_after = 6"));
    enable(&mut manager, 10).unwrap();

    let mut states = feedback(&manager);
    manager.update(false, &mut states, &[]).unwrap();
    manager.update(false, &mut states, &[]).unwrap();

    let err = manager.update(false, &mut states, &[]).unwrap_err();
    assert!(matches!(
        err,
        MotorError::Link {
            master_id: 0,
            source: LinkError::Receive(_)
        }
    ));
}

#[test]
fn custom_policy_sees_both_phases_and_keeps_cycling() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut manager = started(&config(1, "fail_receive_after = 2"))
        .with_policy(Box::new(RecordingPolicy { seen: Arc::clone(&seen) }));

    let mut states = feedback(&manager);
    for _ in 0..5 {
        manager.update(false, &mut states, &[]).unwrap();
    }

    let seen = seen.lock().unwrap();
    let expected: Vec<(MasterId, LinkPhase)> = (0..3)
        .flat_map(|_| [(0, LinkPhase::Receive), (0, LinkPhase::Transmit)])
        .collect();
    assert_eq!(*seen, expected);
    // The device stopped hearing the master after two cycles.
    assert!(!manager.is_enabled());
}

#[test]
fn update_before_start_is_a_link_error() {
    let mut manager = super::fixtures::try_manager(&config(1, "")).unwrap();
    let mut states = feedback(&manager);
    let err = manager.update(false, &mut states, &[]).unwrap_err();
    assert!(matches!(
        err,
        MotorError::Link {
            source: LinkError::NotActivated,
            ..
        }
    ));
}

#[test]
fn health_changes_are_reported_once() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut manager = started(&config(2, "fail_receive_after = 1"))
        .with_policy(Box::new(RecordingPolicy { seen }));

    assert!(manager.check_health());
    assert!(!manager.check_health());

    let mut states = feedback(&manager);
    manager.update(false, &mut states, &[]).unwrap();
    assert!(!manager.check_health());

    // Second receive loses the link.
    manager.update(false, &mut states, &[]).unwrap();
    assert!(manager.check_health());
    assert!(!manager.check_health());
}
