//! Drive trait and supporting types.
//!
//! This module defines:
//! - `MotorDrive` trait - one implementation per drive family
//! - `HandshakeStep` - result of one enable/disable step
//! - `CyclicLayout` - command and feedback entries of a drive
//! - `DriveFactory` type alias - factory function type

use crate::entry::Entry;
use crate::error::ConfigurationError;
use crate::motor::cia402::{ControlWord, StatusWord};
use crate::motor::config::DriveConfig;
use crate::motor::params::DriveParameters;
use crate::motor::types::{Direction, DriveId, DriveState, PdoEntry, PdoMapping, SlaveLayout};

/// Factory function type for creating drive instances.
pub type DriveFactory = fn(&DriveConfig) -> Box<dyn MotorDrive>;

/// Result of one enable/disable step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeStep {
    /// Target state reached.
    pub done: bool,
    /// Control word to write when not done.
    pub command: ControlWord,
}

impl HandshakeStep {
    /// Target state reached; nothing to write.
    pub const fn done() -> Self {
        Self {
            done: true,
            command: ControlWord::empty(),
        }
    }

    /// Not there yet; write `command`.
    pub const fn pending(command: ControlWord) -> Self {
        Self {
            done: false,
            command,
        }
    }
}

/// Cyclic entries of a drive, split into direction groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CyclicLayout {
    /// PDO mapping index of the command group.
    pub rx_pdo_index: u16,
    /// PDO mapping index of the feedback group.
    pub tx_pdo_index: u16,
    /// Entries written by the manager.
    pub commands: Vec<Entry>,
    /// Entries read by the manager.
    pub feedback: Vec<Entry>,
}

impl CyclicLayout {
    /// Entries of one direction.
    pub fn entries(&self, direction: Direction) -> &[Entry] {
        match direction {
            Direction::Output => &self.commands,
            Direction::Input => &self.feedback,
        }
    }

    /// PDO mapping requested from the transport.
    pub fn slave_layout(&self) -> SlaveLayout {
        let mapping = |index: u16, entries: &[Entry]| PdoMapping {
            index,
            entries: entries
                .iter()
                .map(|e| PdoEntry {
                    index: e.index,
                    subindex: e.subindex,
                    bit_length: e.value_type.bit_length(),
                })
                .collect(),
        };
        SlaveLayout {
            outputs: mapping(self.rx_pdo_index, &self.commands),
            inputs: mapping(self.tx_pdo_index, &self.feedback),
        }
    }
}

/// Control logic for one drive family.
///
/// The manager resolves the implementation once from the configured type
/// tag and only calls through this trait afterwards.
///
/// # Lifecycle
///
/// 1. `load_parameters()` - once, before any transport is configured
/// 2. `advance_enable()` - every cycle until it reports done
/// 3. conversions and `is_setpoint_acknowledged()` - every cycle while enabled
/// 4. `advance_disable()` - every cycle once stop is requested
pub trait MotorDrive: Send {
    /// Drive family name (e.g. "minas").
    fn name(&self) -> &'static str;

    /// Configured drive id.
    fn id(&self) -> DriveId;

    /// Static configuration.
    fn config(&self) -> &DriveConfig;

    /// Current handshake state.
    fn state(&self) -> DriveState;

    /// Build the one-time entries and the cyclic layout.
    ///
    /// # Errors
    /// `ConfigurationError` if the parameters are malformed, a declared type
    /// is unsupported, or a value does not fit its type.
    fn load_parameters(&mut self, params: &DriveParameters) -> Result<(), ConfigurationError>;

    /// One-time entries, pushed to the slave before activation.
    fn configuration_entries(&self) -> &[Entry];

    /// Cyclic command and feedback entries.
    fn cyclic_layout(&self) -> &CyclicLayout;

    /// One step towards OperationEnabled.
    fn advance_enable(&mut self, status: StatusWord) -> HandshakeStep;

    /// One step towards SwitchOnDisabled.
    fn advance_disable(&mut self, status: StatusWord) -> HandshakeStep;

    /// Acknowledge command when the set-point handshake bit is set.
    fn is_setpoint_acknowledged(&self, status: StatusWord) -> Option<ControlWord>;

    /// Encoder pulses → rad.
    fn position_to_physical(&self, raw: i32) -> f64;

    /// rad → encoder pulses (truncating).
    ///
    /// `None` when the input is not finite or the result leaves `i32`.
    fn physical_to_position(&self, position: f64) -> Option<i32>;

    /// pulses/s → rad/s.
    fn velocity_to_physical(&self, raw: i32) -> f64;

    /// rad/s → pulses/s (truncating). `None` outside `i32`.
    fn physical_to_velocity(&self, velocity: f64) -> Option<i32>;

    /// Torque units → N·m.
    fn torque_to_physical(&self, raw: i16) -> f64;

    /// N·m → torque units (truncating). `None` outside `i16`.
    fn physical_to_torque(&self, torque: f64) -> Option<i16>;
}
