//! CiA-402 enable/disable handshake.
//!
//! Each step first checks whether the live status word shows the next
//! stage; on a match the state advances. The command returned belongs to
//! the (possibly new) state, so a drive that answers within one cycle
//! reaches OperationEnabled in four calls:
//!
//! | state | enable command | disable command |
//! |---|---|---|
//! | SwitchOnDisabled | shutdown | (done) |
//! | ReadyToSwitchOn | switch-on | disable-voltage |
//! | SwitchedOn | enable-operation | shutdown |
//! | OperationEnabled | (done) | disable-operation |
//!
//! A set fault bit takes priority over progression in both directions:
//! the state drops to SwitchOnDisabled and fault-reset is emitted.

use motor_common::motor::cia402::{StatusWord, command};
use motor_common::motor::drive::HandshakeStep;
use motor_common::motor::types::DriveState;

// ─── Handshake ──────────────────────────────────────────────────────

/// Per-drive CiA-402 device-control state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cia402Handshake {
    state: DriveState,
}

impl Cia402Handshake {
    /// Start at SwitchOnDisabled.
    pub const fn new() -> Self {
        Self {
            state: DriveState::SwitchOnDisabled,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> DriveState {
        self.state
    }

    /// One step towards OperationEnabled.
    pub fn advance_enable(&mut self, status: StatusWord) -> HandshakeStep {
        if status.is_fault() {
            self.state = DriveState::SwitchOnDisabled;
            return HandshakeStep::pending(command::FAULT_RESET);
        }

        self.state = match self.state {
            DriveState::SwitchOnDisabled if status.is_ready_to_switch_on() => {
                DriveState::ReadyToSwitchOn
            }
            DriveState::ReadyToSwitchOn if status.is_switched_on() => DriveState::SwitchedOn,
            DriveState::SwitchedOn if status.is_operation_enabled() => {
                DriveState::OperationEnabled
            }
            unchanged => unchanged,
        };

        match self.state {
            DriveState::SwitchOnDisabled => HandshakeStep::pending(command::SHUTDOWN),
            DriveState::ReadyToSwitchOn => HandshakeStep::pending(command::SWITCH_ON),
            DriveState::SwitchedOn => HandshakeStep::pending(command::ENABLE_OPERATION),
            DriveState::OperationEnabled => HandshakeStep::done(),
        }
    }

    /// One step towards SwitchOnDisabled.
    pub fn advance_disable(&mut self, status: StatusWord) -> HandshakeStep {
        if status.is_fault() {
            // Power stage is already off in Fault.
            if self.state == DriveState::SwitchOnDisabled {
                return HandshakeStep::done();
            }
            self.state = DriveState::SwitchOnDisabled;
            return HandshakeStep::pending(command::FAULT_RESET);
        }

        self.state = match self.state {
            DriveState::OperationEnabled if status.is_switched_on() => DriveState::SwitchedOn,
            DriveState::SwitchedOn if status.is_ready_to_switch_on() => {
                DriveState::ReadyToSwitchOn
            }
            DriveState::ReadyToSwitchOn if status.is_switch_on_disabled() => {
                DriveState::SwitchOnDisabled
            }
            unchanged => unchanged,
        };

        match self.state {
            DriveState::OperationEnabled => HandshakeStep::pending(command::DISABLE_OPERATION),
            DriveState::SwitchedOn => HandshakeStep::pending(command::SHUTDOWN),
            DriveState::ReadyToSwitchOn => HandshakeStep::pending(command::DISABLE_VOLTAGE),
            DriveState::SwitchOnDisabled => HandshakeStep::done(),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
