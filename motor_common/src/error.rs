//! Error taxonomy for the motor manager.
//!
//! - [`ConfigurationError`] - load-time failures; the process does not start.
//! - [`ProtocolError`] - encode/decode dispatch failures in a live cycle.
//! - [`LinkError`] - transport-level failures reported by a fieldbus master.
//! - [`MotorError`] - umbrella returned by the orchestrator.

use crate::motor::types::{DriveId, MasterId};
use std::path::PathBuf;
use thiserror::Error;

/// Malformed or unsupported configuration, detected before activation.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// TOML parsing failed.
    #[error("Failed to parse {}: {message}", .path.display())]
    ParseError {
        /// File being parsed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// A declared wire type is not one of u8/u16/u32/s8/s16/s32.
    #[error("Unsupported value type '{0}'")]
    UnsupportedValueType(String),

    /// No factory registered for the drive type.
    #[error("Drive {drive_id}: unsupported drive type '{kind}'")]
    UnsupportedDrive {
        /// Offending drive.
        drive_id: DriveId,
        /// Configured type tag.
        kind: String,
    },

    /// No factory registered for the transport type.
    #[error("Master {master_id}: unsupported transport type '{kind}'")]
    UnsupportedTransport {
        /// Offending master.
        master_id: MasterId,
        /// Configured type tag.
        kind: String,
    },

    /// Drive parameters are malformed.
    #[error("Drive {drive_id}: {message}")]
    Drive {
        /// Offending drive.
        drive_id: DriveId,
        /// What is wrong, naming the field.
        message: String,
    },

    /// The transport rejected wire-layout negotiation or offset registration.
    #[error("Master {master_id} slave {position}: {source}")]
    Transport {
        /// Master owning the slave.
        master_id: MasterId,
        /// Slave ring position.
        position: u16,
        /// Transport failure.
        #[source]
        source: LinkError,
    },
}

/// Encode/decode dispatch failure inside a live cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The interface id is not handled by the read or write path.
    #[error("binding {binding}: unsupported interface id {id}")]
    UnsupportedInterface {
        /// Slave binding index.
        binding: usize,
        /// Raw interface id.
        id: u8,
    },

    /// The interface is recognized but has no registered offset on this slave.
    #[error("binding {binding}: interface id {id} is not mapped")]
    UnmappedInterface {
        /// Slave binding index.
        binding: usize,
        /// Raw interface id.
        id: u8,
    },

    /// Raw value-type tag outside the codec's supported set.
    #[error("unsupported value type tag {0}")]
    UnsupportedType(u8),

    /// Entry does not fit in the process-data buffer.
    #[error("process data access out of bounds: offset {offset} + {width} > {len}")]
    OutOfBounds {
        /// Byte offset.
        offset: usize,
        /// Entry width.
        width: usize,
        /// Buffer length.
        len: usize,
    },

    /// Binding used before `configure()` completed.
    #[error("binding {0} is not configured")]
    NotConfigured(usize),

    /// Command record routed to a binding that does not exist.
    #[error("no slave binding at index {0}")]
    UnknownBinding(usize),

    /// Feedback buffer smaller than the fleet.
    #[error("feedback buffer holds {actual} records, {expected} required")]
    RecordBuffer {
        /// Number of bindings.
        expected: usize,
        /// Records supplied.
        actual: usize,
    },

    /// Command record target list is full.
    #[error("command record holds at most {0} targets")]
    TooManyTargets(usize),

    /// Physical target is NaN, infinite or does not fit its wire type.
    #[error("binding {binding}: target for interface id {id} is not finite or out of wire range")]
    TargetOutOfRange {
        /// Slave binding index.
        binding: usize,
        /// Raw interface id.
        id: u8,
    },
}

/// Transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Operation requires `initialize()` first.
    #[error("master is not initialized")]
    NotInitialized,

    /// Process data requested before `activate()`.
    #[error("master is not activated")]
    NotActivated,

    /// Configuration requested after `activate()`.
    #[error("master is already active")]
    AlreadyActive,

    /// No slave at the requested alias/position.
    #[error("slave {alias}:{position} not found")]
    SlaveNotFound {
        /// Slave alias.
        alias: u16,
        /// Slave ring position.
        position: u16,
    },

    /// Handle does not name an attached slave.
    #[error("invalid slave handle {0}")]
    InvalidSlave(usize),

    /// PDO mapping negotiation rejected.
    #[error("PDO layout rejected: {0}")]
    LayoutRejected(String),

    /// Registration of an object absent from the negotiated layout.
    #[error("entry 0x{index:04X}:{subindex} is not mapped")]
    EntryNotMapped {
        /// Object index.
        index: u16,
        /// Object subindex.
        subindex: u8,
    },

    /// Frame transmission failed.
    #[error("failed to send frames: {0}")]
    Send(String),

    /// Frame reception failed.
    #[error("failed to receive frames: {0}")]
    Receive(String),

    /// Domain/working-counter bookkeeping failed.
    #[error("domain processing failed: {0}")]
    Domain(String),
}

/// Umbrella error returned by the orchestrator.
#[derive(Debug, Clone, Error)]
pub enum MotorError {
    /// Load-time failure.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Cycle dispatch failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Transport failure on a specific master.
    #[error("master {master_id}: {source}")]
    Link {
        /// Failing master.
        master_id: MasterId,
        /// Transport failure.
        #[source]
        source: LinkError,
    },
}
