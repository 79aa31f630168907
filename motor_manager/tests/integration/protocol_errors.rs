//! Integration test: configuration and dispatch failures.

use super::fixtures::{config, enable, feedback, image_i32, manager_with, started, try_manager};
use motor_common::entry::InterfaceId;
use motor_common::error::{ConfigurationError, LinkError, MotorError, ProtocolError};
use motor_common::motor::types::CommandRecord;
use motor_manager::{MotorManager, Registry};
use std::f64::consts::PI;

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn unknown_transport_type_is_rejected() {
    let mut config = config(1, "");
    config.masters[0].kind = "soem".to_string();
    let err = try_manager(&config).err().unwrap();
    assert!(matches!(
        err,
        MotorError::Configuration(ConfigurationError::UnsupportedTransport { master_id: 0, .. })
    ));
}

#[test]
fn unknown_drive_type_is_rejected() {
    let mut config = config(1, "");
    config.drives[0].kind = "zeroerr".to_string();
    let err = try_manager(&config).err().unwrap();
    assert!(matches!(
        err,
        MotorError::Configuration(ConfigurationError::UnsupportedDrive { drive_id: 0, .. })
    ));
}

#[test]
fn absent_slave_is_a_transport_error() {
    let mut config = config(1, "");
    config.masters[0].slaves[0].position = 3;
    let err = try_manager(&config).err().unwrap();
    assert!(matches!(
        err,
        MotorError::Configuration(ConfigurationError::Transport {
            master_id: 0,
            position: 3,
            source: LinkError::SlaveNotFound { position: 3, .. },
        })
    ));
}

#[test]
fn feedback_interface_in_command_group_is_rejected() {
    // Target velocity (0x60FF, s32) relabelled as current position.
    let err = manager_with(&config(1, ""), |params| {
        for entry in &mut params.entries {
            if entry.id == InterfaceId::TargetVelocity.as_u8() {
                entry.id = InterfaceId::CurrentPosition.as_u8();
            }
        }
        Ok(())
    })
    .err()
    .unwrap();

    assert!(matches!(
        err,
        MotorError::Configuration(ConfigurationError::Drive { drive_id: 0, .. })
    ));
    assert!(err.to_string().contains("command group"));
}

#[test]
fn missing_status_word_is_rejected() {
    let err = manager_with(&config(1, ""), |params| {
        params
            .entries
            .retain(|e| e.id != InterfaceId::StatusWord.as_u8());
        Ok(())
    })
    .err()
    .unwrap();
    assert!(err.to_string().contains("no status word"));
}

#[test]
fn missing_parameter_file_names_the_drive() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("manager.toml");
    std::fs::write(
        &path,
        "[[masters]]\nid = 0\ntype = \"simulation\"\nnumber_of_slaves = 1\n\n\
         [[masters.slaves]]\ndrive_id = 7\nposition = 0\n\n\
         [[drives]]\nid = 7\ntype = \"minas\"\nparam_file = \"absent.toml\"\n\
         pulse_per_revolution = 131072\nrated_torque = 2.0\nunit_torque = 0.01\n",
    )
    .unwrap();

    let err = MotorManager::load(&path, &Registry::with_builtin()).err().unwrap();
    assert!(matches!(
        err,
        MotorError::Configuration(ConfigurationError::Drive { drive_id: 7, .. })
    ));
    assert!(err.to_string().contains("parameter file"));
}

#[test]
fn invalid_manager_config_is_rejected_before_any_transport() {
    let mut config = config(2, "");
    config.masters[0].slaves[1].drive_id = 0;
    let err = try_manager(&config).err().unwrap();
    assert!(matches!(
        err,
        MotorError::Configuration(ConfigurationError::ValidationError(_))
    ));
}

// ── Dispatch ────────────────────────────────────────────────────────

#[test]
fn command_for_unknown_binding_fails_the_cycle() {
    let mut manager = started(&config(1, ""));
    enable(&mut manager, 10).unwrap();

    let mut states = feedback(&manager);
    let mut command = CommandRecord::new(5);
    command.set_position(1.0).unwrap();
    let err = manager.update(false, &mut states, &[command]).unwrap_err();
    assert!(matches!(
        err,
        MotorError::Protocol(ProtocolError::UnknownBinding(5))
    ));
}

#[test]
fn short_feedback_buffer_fails_the_cycle() {
    let mut manager = started(&config(2, ""));
    enable(&mut manager, 10).unwrap();

    let mut states = Vec::new();
    let err = manager.update(false, &mut states, &[]).unwrap_err();
    assert!(matches!(
        err,
        MotorError::Protocol(ProtocolError::RecordBuffer {
            expected: 2,
            actual: 0
        })
    ));
}

#[test]
fn unsupported_target_leaves_the_image_untouched() {
    let mut manager = started(&config(1, ""));
    enable(&mut manager, 10).unwrap();

    let mut states = feedback(&manager);
    let mut command = CommandRecord::new(0);
    command.set_position(PI).unwrap();
    command.push_target(42).unwrap();
    let err = manager.update(false, &mut states, &[command]).unwrap_err();
    assert!(matches!(
        err,
        MotorError::Protocol(ProtocolError::UnsupportedInterface { binding: 0, id: 42 })
    ));

    let target = manager
        .binding(0)
        .unwrap()
        .offset_of(InterfaceId::TargetPosition.as_u8())
        .unwrap();
    assert_eq!(image_i32(&mut manager, target), 0);
}

#[test]
fn feedback_interface_as_target_is_unsupported() {
    let mut manager = started(&config(1, ""));
    enable(&mut manager, 10).unwrap();

    let mut states = feedback(&manager);
    let mut command = CommandRecord::new(0);
    command
        .push_target(InterfaceId::StatusWord.as_u8())
        .unwrap();
    let err = manager.update(false, &mut states, &[command]).unwrap_err();
    assert!(matches!(
        err,
        MotorError::Protocol(ProtocolError::UnsupportedInterface { id: 4, .. })
    ));
}

#[test]
fn non_finite_target_fails_the_cycle_without_writing() {
    let mut manager = started(&config(1, ""));
    enable(&mut manager, 10).unwrap();

    let mut states = feedback(&manager);
    let mut command = CommandRecord::new(0);
    command.set_position(f64::NAN).unwrap();
    let err = manager.update(false, &mut states, &[command]).unwrap_err();
    assert!(matches!(
        err,
        MotorError::Protocol(ProtocolError::TargetOutOfRange { binding: 0, id: 1 })
    ));

    let target = manager
        .binding(0)
        .unwrap()
        .offset_of(InterfaceId::TargetPosition.as_u8())
        .unwrap();
    assert_eq!(image_i32(&mut manager, target), 0);
}
