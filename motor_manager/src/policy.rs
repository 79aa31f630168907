//! Reaction to transport failures inside a running cycle.

use motor_common::error::{LinkError, MotorError};
use motor_common::motor::types::MasterId;
use std::fmt;
use tracing::error;

/// Cycle phase in which a link error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    /// `receive_cycle()`.
    Receive,
    /// `transmit_cycle()`.
    Transmit,
}

impl fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receive => f.write_str("receive"),
            Self::Transmit => f.write_str("transmit"),
        }
    }
}

/// Decides whether a link error ends the control loop.
///
/// Returning `Err` propagates out of `MotorManager::update`. Returning
/// `Ok` continues the cycle with whatever process data the transport
/// holds.
pub trait LinkErrorPolicy: Send {
    /// Called once per failed transport call.
    fn on_link_error(
        &mut self,
        master_id: MasterId,
        phase: LinkPhase,
        error: LinkError,
    ) -> Result<(), MotorError>;
}

/// Any link error aborts the loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnLinkError;

impl LinkErrorPolicy for AbortOnLinkError {
    fn on_link_error(
        &mut self,
        master_id: MasterId,
        phase: LinkPhase,
        error: LinkError,
    ) -> Result<(), MotorError> {
        error!("Master {}: {} failed: {}", master_id, phase, error);
        Err(MotorError::Link {
            master_id,
            source: error,
        })
    }
}
