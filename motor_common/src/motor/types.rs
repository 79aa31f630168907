//! Identifiers, wire layout descriptors and per-cycle records.
//!
//! - `DriveState` - four-stage CiA-402 handshake state
//! - `SlaveIdentity` / `SlaveLayout` - what a transport needs to map a slave
//! - `TransportHealth` / `SlaveHealth` - diagnostics snapshots
//! - `FeedbackRecord` / `CommandRecord` - the per-cycle call surface

use crate::consts::MAX_COMMAND_TARGETS;
use crate::entry::InterfaceId;
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};

/// Fieldbus master identifier (unique per configuration).
pub type MasterId = u8;

/// Drive identifier (unique per configuration).
pub type DriveId = u8;

// ─── Drive State ────────────────────────────────────────────────────

/// Handshake stage of one drive.
///
/// Exactly one value per drive instance; mutated only by the drive's
/// enable/disable step functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DriveState {
    /// Power stage off, waiting for shutdown command.
    SwitchOnDisabled = 0,
    /// Ready for switch-on.
    ReadyToSwitchOn = 1,
    /// Switched on, operation not yet enabled.
    SwitchedOn = 2,
    /// Following cyclic targets.
    OperationEnabled = 3,
}

impl DriveState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::SwitchOnDisabled),
            1 => Some(Self::ReadyToSwitchOn),
            2 => Some(Self::SwitchedOn),
            3 => Some(Self::OperationEnabled),
            _ => None,
        }
    }
}

impl Default for DriveState {
    fn default() -> Self {
        Self::SwitchOnDisabled
    }
}

// ─── Wire Layout ────────────────────────────────────────────────────

/// Data direction of a cyclic entry, seen from the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Master → slave (receive PDO on the slave).
    Output,
    /// Slave → master (transmit PDO on the slave).
    Input,
}

/// Address and identity of one slave on a master's ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SlaveIdentity {
    /// Station alias.
    pub alias: u16,
    /// Ring position.
    pub position: u16,
    /// Expected vendor id.
    pub vendor_id: u32,
    /// Expected product code.
    pub product_code: u32,
}

/// Opaque handle returned by a transport when a slave is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlaveHandle(pub usize);

/// One mapped object inside a PDO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdoEntry {
    /// Object index.
    pub index: u16,
    /// Object subindex.
    pub subindex: u8,
    /// Width [bits].
    pub bit_length: u8,
}

/// A PDO and the objects it carries, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PdoMapping {
    /// PDO mapping index (e.g. 0x1600, 0x1A00).
    pub index: u16,
    /// Mapped objects.
    pub entries: Vec<PdoEntry>,
}

/// Negotiated cyclic layout of one slave.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlaveLayout {
    /// Objects written by the master.
    pub outputs: PdoMapping,
    /// Objects read by the master.
    pub inputs: PdoMapping,
}

impl SlaveLayout {
    /// Mapping for one direction.
    pub fn mapping(&self, direction: Direction) -> &PdoMapping {
        match direction {
            Direction::Output => &self.outputs,
            Direction::Input => &self.inputs,
        }
    }
}

// ─── Diagnostics ────────────────────────────────────────────────────

/// Link-level health of a master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransportHealth {
    /// Slaves answering on the ring.
    pub slaves_responding: u32,
    /// Physical link detected.
    pub link_up: bool,
    /// All slaves reached the operational state.
    pub operational: bool,
}

/// Health of a single attached slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlaveHealth {
    /// Slave answers.
    pub online: bool,
    /// Slave is in the operational state.
    pub operational: bool,
}

// ─── Per-Cycle Records ──────────────────────────────────────────────

/// Feedback of one slave binding, in engineering units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeedbackRecord {
    /// Index of the binding that produced the record.
    pub binding: usize,
    /// Raw CiA-402 status word.
    pub status_word: u16,
    /// Raw drive error code.
    pub error_code: u16,
    /// Position [rad].
    pub position: f64,
    /// Velocity [rad/s].
    pub velocity: f64,
    /// Torque [N·m].
    pub torque: f64,
}

/// Commands for one slave binding, in engineering units.
///
/// Only the interfaces listed in `targets` are written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandRecord {
    /// Destination binding index.
    pub binding: usize,
    /// Raw interface ids to write this cycle.
    pub targets: heapless::Vec<u8, MAX_COMMAND_TARGETS>,
    /// Raw CiA-402 control word.
    pub control_word: u16,
    /// Target position [rad].
    pub position: f64,
    /// Target velocity [rad/s].
    pub velocity: f64,
    /// Target torque [N·m].
    pub torque: f64,
}

impl CommandRecord {
    /// Empty record for `binding`.
    pub fn new(binding: usize) -> Self {
        Self {
            binding,
            ..Self::default()
        }
    }

    /// True when at least one interface is requested.
    #[inline]
    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Drop all requested targets, keeping the binding.
    pub fn clear(&mut self) {
        self.targets.clear();
    }

    /// Request a raw interface id; duplicates are ignored.
    pub fn push_target(&mut self, id: u8) -> Result<(), ProtocolError> {
        if self.targets.contains(&id) {
            return Ok(());
        }
        self.targets
            .push(id)
            .map_err(|_| ProtocolError::TooManyTargets(MAX_COMMAND_TARGETS))
    }

    /// Request a control word write.
    pub fn set_control_word(&mut self, word: u16) -> Result<(), ProtocolError> {
        self.control_word = word;
        self.push_target(InterfaceId::ControlWord.as_u8())
    }

    /// Request a target position write [rad].
    pub fn set_position(&mut self, position: f64) -> Result<(), ProtocolError> {
        self.position = position;
        self.push_target(InterfaceId::TargetPosition.as_u8())
    }

    /// Request a target velocity write [rad/s].
    pub fn set_velocity(&mut self, velocity: f64) -> Result<(), ProtocolError> {
        self.velocity = velocity;
        self.push_target(InterfaceId::TargetVelocity.as_u8())
    }

    /// Request a target torque write [N·m].
    pub fn set_torque(&mut self, torque: f64) -> Result<(), ProtocolError> {
        self.torque = torque;
        self.push_target(InterfaceId::TargetTorque.as_u8())
    }
}
