//! Prelude module for common re-exports.
//!
//! ```rust
//! use motor_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigLoader, SharedConfig};
pub use crate::motor::config::{DriveConfig, ManagerConfig, MasterConfig, SlaveConfig};
pub use crate::motor::params::DriveParameters;

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::{ConfigurationError, LinkError, MotorError, ProtocolError};

// ─── Codec ──────────────────────────────────────────────────────────
pub use crate::entry::{Entry, InterfaceId, ValueType};

// ─── Drives & Transports ────────────────────────────────────────────
pub use crate::motor::cia402::{ControlWord, StatusWord};
pub use crate::motor::drive::{CyclicLayout, HandshakeStep, MotorDrive};
pub use crate::motor::transport::Transport;
pub use crate::motor::types::{
    CommandRecord, Direction, DriveId, DriveState, FeedbackRecord, MasterId, SlaveHandle,
    SlaveIdentity,
};
