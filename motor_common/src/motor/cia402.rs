//! CiA-402 status and control words.
//!
//! Bit definitions follow the device profile; the masked patterns used to
//! recognize each handshake stage are exposed as `StatusWord` predicates.
//! Command words live in [`command`], standard object indices in [`object`].

use bitflags::bitflags;

bitflags! {
    /// Status word (object 0x6041).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusWord: u16 {
        /// Ready to switch on.
        const READY_TO_SWITCH_ON    = 0x0001;
        /// Switched on.
        const SWITCHED_ON           = 0x0002;
        /// Operation enabled.
        const OPERATION_ENABLED     = 0x0004;
        /// Fault present.
        const FAULT                 = 0x0008;
        /// Main voltage applied.
        const VOLTAGE_ENABLED       = 0x0010;
        /// Quick stop NOT active (active low).
        const QUICK_STOP            = 0x0020;
        /// Switch on disabled.
        const SWITCH_ON_DISABLED    = 0x0040;
        /// Warning present.
        const WARNING               = 0x0080;
        /// Controlled over the fieldbus.
        const REMOTE                = 0x0200;
        /// Target reached.
        const TARGET_REACHED        = 0x0400;
        /// Internal limit active.
        const INTERNAL_LIMIT        = 0x0800;
        /// Set-point acknowledge.
        const SETPOINT_ACKNOWLEDGE  = 0x1000;
    }
}

impl StatusWord {
    /// Mask selecting the bits that identify ready/switched-on/enabled.
    pub const STATE_MASK: u16 = 0x006F;
    /// Mask selecting the bits that identify switch-on-disabled.
    pub const DISABLED_MASK: u16 = 0x004F;

    /// Pattern for "ready to switch on" under [`Self::STATE_MASK`].
    pub const READY_PATTERN: u16 = 0x0021;
    /// Pattern for "switched on" under [`Self::STATE_MASK`].
    pub const SWITCHED_ON_PATTERN: u16 = 0x0023;
    /// Pattern for "operation enabled" under [`Self::STATE_MASK`].
    pub const ENABLED_PATTERN: u16 = 0x0027;
    /// Pattern for "switch on disabled" under [`Self::DISABLED_MASK`].
    pub const DISABLED_PATTERN: u16 = 0x0040;

    /// Wrap a raw status word, keeping unknown bits.
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self::from_bits_retain(raw)
    }

    #[inline]
    pub const fn is_ready_to_switch_on(self) -> bool {
        self.bits() & Self::STATE_MASK == Self::READY_PATTERN
    }

    #[inline]
    pub const fn is_switched_on(self) -> bool {
        self.bits() & Self::STATE_MASK == Self::SWITCHED_ON_PATTERN
    }

    #[inline]
    pub const fn is_operation_enabled(self) -> bool {
        self.bits() & Self::STATE_MASK == Self::ENABLED_PATTERN
    }

    #[inline]
    pub const fn is_switch_on_disabled(self) -> bool {
        self.bits() & Self::DISABLED_MASK == Self::DISABLED_PATTERN
    }

    #[inline]
    pub const fn is_fault(self) -> bool {
        self.contains(Self::FAULT)
    }

    #[inline]
    pub const fn is_setpoint_acknowledged(self) -> bool {
        self.contains(Self::SETPOINT_ACKNOWLEDGE)
    }
}

bitflags! {
    /// Control word (object 0x6040).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlWord: u16 {
        /// Switch on.
        const SWITCH_ON             = 0x0001;
        /// Enable voltage.
        const ENABLE_VOLTAGE        = 0x0002;
        /// Quick stop (active low).
        const QUICK_STOP            = 0x0004;
        /// Enable operation.
        const ENABLE_OPERATION      = 0x0008;
        /// New set-point (profile position mode).
        const NEW_SETPOINT          = 0x0010;
        /// Change set immediately.
        const CHANGE_SET_IMMEDIATELY = 0x0020;
        /// Relative target.
        const RELATIVE              = 0x0040;
        /// Fault reset (rising edge).
        const FAULT_RESET           = 0x0080;
        /// Halt.
        const HALT                  = 0x0100;
    }
}

impl ControlWord {
    /// Wrap a raw control word, keeping unknown bits.
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self::from_bits_retain(raw)
    }
}

impl Default for ControlWord {
    fn default() -> Self {
        Self::empty()
    }
}

/// Device-control commands written to the control word.
pub mod command {
    use super::ControlWord;

    /// Any state → switch on disabled.
    pub const DISABLE_VOLTAGE: ControlWord = ControlWord::empty();
    /// → ready to switch on.
    pub const SHUTDOWN: ControlWord = ControlWord::ENABLE_VOLTAGE.union(ControlWord::QUICK_STOP);
    /// Ready to switch on → switched on.
    pub const SWITCH_ON: ControlWord = SHUTDOWN.union(ControlWord::SWITCH_ON);
    /// Operation enabled → switched on.
    pub const DISABLE_OPERATION: ControlWord = SWITCH_ON;
    /// Switched on → operation enabled.
    pub const ENABLE_OPERATION: ControlWord = SWITCH_ON.union(ControlWord::ENABLE_OPERATION);
    /// Enable operation with a new, immediately applied set-point.
    pub const NEW_SETPOINT: ControlWord = ENABLE_OPERATION
        .union(ControlWord::NEW_SETPOINT)
        .union(ControlWord::CHANGE_SET_IMMEDIATELY);
    /// Fault → switch on disabled.
    pub const FAULT_RESET: ControlWord = ControlWord::FAULT_RESET;
    /// Clears the set-point handshake bit while staying enabled.
    pub const ACKNOWLEDGE_SETPOINT: ControlWord = ENABLE_OPERATION;
}

/// Standard CiA-402 object indices.
pub mod object {
    pub const ERROR_CODE: u16 = 0x603F;
    pub const CONTROL_WORD: u16 = 0x6040;
    pub const STATUS_WORD: u16 = 0x6041;
    pub const MODES_OF_OPERATION: u16 = 0x6060;
    pub const POSITION_ACTUAL: u16 = 0x6064;
    pub const VELOCITY_ACTUAL: u16 = 0x606C;
    pub const TARGET_TORQUE: u16 = 0x6071;
    pub const TORQUE_ACTUAL: u16 = 0x6077;
    pub const TARGET_POSITION: u16 = 0x607A;
    pub const TARGET_VELOCITY: u16 = 0x60FF;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_words_match_device_profile() {
        assert_eq!(command::DISABLE_VOLTAGE.bits(), 0x0000);
        assert_eq!(command::SHUTDOWN.bits(), 0x0006);
        assert_eq!(command::SWITCH_ON.bits(), 0x0007);
        assert_eq!(command::DISABLE_OPERATION.bits(), 0x0007);
        assert_eq!(command::ENABLE_OPERATION.bits(), 0x000F);
        assert_eq!(command::NEW_SETPOINT.bits(), 0x003F);
        assert_eq!(command::FAULT_RESET.bits(), 0x0080);
        assert_eq!(command::ACKNOWLEDGE_SETPOINT.bits(), 0x000F);
    }

    #[test]
    fn status_patterns_ignore_unmasked_bits() {
        assert!(StatusWord::from_raw(0x0221).is_ready_to_switch_on());
        assert!(StatusWord::from_raw(0x0233).is_switched_on());
        assert!(StatusWord::from_raw(0x1637).is_operation_enabled());
        assert!(StatusWord::from_raw(0x0250).is_switch_on_disabled());

        assert!(!StatusWord::from_raw(0x0023).is_ready_to_switch_on());
        assert!(!StatusWord::from_raw(0x0048).is_switch_on_disabled());
    }

    #[test]
    fn fault_and_acknowledge_bits() {
        assert!(StatusWord::from_raw(0x0218).is_fault());
        assert!(!StatusWord::from_raw(0x0237).is_fault());
        assert!(StatusWord::from_raw(0x1237).is_setpoint_acknowledged());
    }
}
