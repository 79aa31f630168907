//! Panasonic Minas A-series drive family.
//!
//! CiA-402 device control over a cyclic synchronous position layout.
//! Object ids 50..=58 in a parameter file are derived from the drive
//! configuration instead of carrying a literal value.

mod driver;

pub use driver::MinasDrive;

use motor_common::motor::config::DriveConfig;
use motor_common::motor::drive::MotorDrive;

/// Ids of objects whose value is derived from [`DriveConfig`].
pub mod object_id {
    /// Max torque (0x6072), 0.1 % of rated.
    pub const MAX_TORQUE: u8 = 50;
    /// Min software position limit (0x607D:1), pulses.
    pub const MIN_POSITION_LIMIT: u8 = 51;
    /// Max software position limit (0x607D:2), pulses.
    pub const MAX_POSITION_LIMIT: u8 = 52;
    /// Max motor speed (0x6080), r/min.
    pub const MAX_MOTOR_SPEED: u8 = 53;
    /// Profile velocity (0x6081), pulses/s.
    pub const PROFILE_VELOCITY: u8 = 54;
    /// Profile acceleration (0x6083), pulses/s².
    pub const PROFILE_ACCELERATION: u8 = 55;
    /// Profile deceleration (0x6084), pulses/s².
    pub const PROFILE_DECELERATION: u8 = 56;
    /// Max acceleration (0x60C5), pulses/s².
    pub const MAX_ACCELERATION: u8 = 57;
    /// Max deceleration (0x60C6), pulses/s².
    pub const MAX_DECELERATION: u8 = 58;
}

/// Factory function to create a Minas drive instance.
pub fn create_drive(config: &DriveConfig) -> Box<dyn MotorDrive> {
    Box::new(MinasDrive::new(config.clone()))
}
