//! Integration test: paced cycle runner.

use super::fixtures::{config_with, try_manager};
use motor_common::error::ProtocolError;
use motor_common::motor::types::{CommandRecord, FeedbackRecord};
use motor_manager::{CycleRunner, ShutdownSignals};

const PERIOD_NS: u32 = 200_000;

#[test]
fn runner_commands_then_stops_after_disable() {
    let manager = try_manager(&config_with(2, PERIOD_NS, "")).unwrap();
    let signals = ShutdownSignals::new();
    let stop = signals.clone();
    let mut runner = CycleRunner::new(manager, signals);

    let mut filled = 0u64;
    let mut source = |cycle: u64, _: &[FeedbackRecord], commands: &mut [CommandRecord]| {
        filled += 1;
        for command in commands.iter_mut() {
            command.set_position(0.5)?;
        }
        if cycle >= 10 {
            stop.request_stop();
        }
        Ok::<(), ProtocolError>(())
    };
    runner.run(&mut source).unwrap();

    // Enabled on cycle 3, commanded on 4..=10, disabled on 11..=14.
    assert_eq!(filled, 7);
    assert_eq!(runner.stats().cycle_count, 15);
    for state in runner.feedback() {
        assert!((state.position - 0.5).abs() < 1e-3);
    }

    let manager = runner.into_manager();
    assert!(manager.is_disabled());
    assert!(!manager.is_active());
}

#[test]
fn runner_exits_when_stopped_before_enable() {
    let manager = try_manager(&config_with(1, PERIOD_NS, "")).unwrap();
    let signals = ShutdownSignals::new();
    signals.request_stop();
    let mut runner = CycleRunner::new(manager, signals);

    let mut source = |_: u64, _: &[FeedbackRecord], _: &mut [CommandRecord]| -> Result<(), ProtocolError> {
        panic!("fleet never enabled");
    };
    runner.run(&mut source).unwrap();
    assert_eq!(runner.stats().cycle_count, 1);
}

#[test]
fn source_error_ends_the_run() {
    let manager = try_manager(&config_with(1, PERIOD_NS, "")).unwrap();
    let mut runner = CycleRunner::new(manager, ShutdownSignals::new());

    let mut source = |_: u64, _: &[FeedbackRecord], commands: &mut [CommandRecord]| {
        for id in 0..=8u8 {
            commands[0].push_target(id)?;
        }
        Ok::<(), ProtocolError>(())
    };
    let err = runner.run(&mut source).unwrap_err();
    assert!(err.to_string().contains("at most"));
    assert!(!runner.manager().is_active());
}
