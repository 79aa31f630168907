//! Shared fleet fixtures.

use motor_common::error::{ConfigurationError, MotorError};
use motor_common::motor::config::ManagerConfig;
use motor_common::motor::params::DriveParameters;
use motor_common::motor::types::FeedbackRecord;
use motor_manager::{MotorManager, Registry};
use std::path::PathBuf;

/// Encoder resolution used by every test drive: pi rad is 65536 pulses.
pub const PPR: u32 = 131_072;

/// Minas A6B parameter file shipped with the repository.
pub fn param_file() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../config/minas_a6b.toml")
}

/// One simulated master with `slaves` Minas drives.
///
/// `simulation` is inserted verbatim into `[masters.simulation]`.
pub fn config_with(slaves: u16, period_ns: u32, simulation: &str) -> ManagerConfig {
    let mut text = format!(
        "period_ns = {period_ns}\nhealth_interval = 1\n\n\
         [[masters]]\nid = 0\ntype = \"simulation\"\nnumber_of_slaves = {slaves}\n\n\
         [masters.simulation]\n{simulation}\n\n"
    );
    for i in 0..slaves {
        text += &format!("[[masters.slaves]]\ndrive_id = {i}\nposition = {i}\n\n");
    }
    for i in 0..slaves {
        text += &format!(
            "[[drives]]\nid = {i}\ntype = \"minas\"\nparam_file = \"minas_a6b.toml\"\n\
             pulse_per_revolution = {PPR}\nrated_torque = 2.0\nunit_torque = 0.01\n\n"
        );
    }
    toml::from_str(&text).unwrap()
}

pub fn config(slaves: u16, simulation: &str) -> ManagerConfig {
    config_with(slaves, 1_000_000, simulation)
}

/// Build a manager, reading every drive's parameters from [`param_file`].
pub fn try_manager(config: &ManagerConfig) -> Result<MotorManager, MotorError> {
    manager_with(config, |_| Ok(()))
}

/// Build a manager, letting `tweak` edit the parameters of each drive.
pub fn manager_with<F>(config: &ManagerConfig, mut tweak: F) -> Result<MotorManager, MotorError>
where
    F: FnMut(&mut DriveParameters) -> Result<(), ConfigurationError>,
{
    MotorManager::with_parameters(config, &Registry::with_builtin(), |drive| {
        let mut params = DriveParameters::load_for(drive.id, &param_file())?;
        tweak(&mut params)?;
        Ok(params)
    })
}

/// Configured and started manager.
pub fn started(config: &ManagerConfig) -> MotorManager {
    let mut manager = try_manager(config).unwrap();
    manager.start().unwrap();
    manager
}

pub fn feedback(manager: &MotorManager) -> Vec<FeedbackRecord> {
    (0..manager.binding_count())
        .map(|binding| FeedbackRecord {
            binding,
            ..FeedbackRecord::default()
        })
        .collect()
}

/// Run enable cycles until the fleet is enabled; returns the cycle count.
pub fn enable(manager: &mut MotorManager, max_cycles: usize) -> Option<usize> {
    let mut states = feedback(manager);
    for cycle in 1..=max_cycles {
        manager.update(false, &mut states, &[]).unwrap();
        if manager.is_enabled() {
            return Some(cycle);
        }
    }
    None
}

/// Run stop cycles until the fleet reports disabled; returns the cycle count.
pub fn disable(manager: &mut MotorManager, max_cycles: usize) -> Option<usize> {
    let mut states = feedback(manager);
    for cycle in 1..=max_cycles {
        if manager.update(true, &mut states, &[]).unwrap() {
            return Some(cycle);
        }
    }
    None
}

/// Little-endian i32 at `offset` of a master's process image.
pub fn image_i32(manager: &mut MotorManager, offset: usize) -> i32 {
    let image = manager.process_data(0).unwrap();
    i32::from_le_bytes(image[offset..offset + 4].try_into().unwrap())
}

pub fn image_u16(manager: &mut MotorManager, offset: usize) -> u16 {
    let image = manager.process_data(0).unwrap();
    u16::from_le_bytes(image[offset..offset + 2].try_into().unwrap())
}
