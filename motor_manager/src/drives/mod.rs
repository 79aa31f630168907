//! Drive family implementations.
//!
//! - [`minas`] - Panasonic Minas A-series servo drives
//! - [`handshake`] - CiA-402 device-control state machine shared by families
//!
//! # Adding New Drive Families
//!
//! 1. Create a new submodule under `drives/`
//! 2. Implement the `MotorDrive` trait from `motor_common::motor::drive`
//! 3. Register the factory in [`register_all_drives`]

pub mod handshake;
pub mod minas;

use crate::registry::Registry;

/// Register all built-in drive families.
pub fn register_all_drives(registry: &mut Registry) {
    registry.register_drive("minas", minas::create_drive);
}
