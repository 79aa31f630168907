//! Emulated CiA-402 servo slave.
//!
//! Interprets the standard device-control objects and follows cyclic
//! targets while operation is enabled. Position follows the target
//! immediately (cyclic synchronous position); velocity and torque echo
//! their targets.

use motor_common::entry::{Entry, decode, encode};
use motor_common::motor::cia402::{ControlWord, StatusWord, object};
use tracing::debug;

/// Error code reported by a device that starts in Fault.
pub const SIMULATED_FAULT_CODE: u16 = 0x7500;

/// Device-side CiA-402 state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Power-on self test; leaves automatically on the first tick.
    NotReadyToSwitchOn,
    /// Switch on disabled.
    SwitchOnDisabled,
    /// Ready to switch on.
    ReadyToSwitchOn,
    /// Switched on.
    SwitchedOn,
    /// Operation enabled.
    OperationEnabled,
    /// Fault; cleared by a fault-reset rising edge.
    Fault,
}

impl DeviceState {
    /// Status word pattern of the state, remote bit included.
    pub const fn status_bits(self) -> u16 {
        let pattern = match self {
            Self::NotReadyToSwitchOn => 0x0000,
            Self::SwitchOnDisabled => 0x0040,
            Self::ReadyToSwitchOn => 0x0021,
            Self::SwitchedOn => 0x0033,
            Self::OperationEnabled => 0x0037,
            Self::Fault => 0x0008,
        };
        pattern | StatusWord::REMOTE.bits()
    }
}

/// One emulated servo slave.
#[derive(Debug, Clone)]
pub struct Cia402Device {
    state: DeviceState,
    /// Ignores control words entirely.
    stuck: bool,
    control_word: u16,
    error_code: u16,
    setpoint_acknowledged: bool,
    target_position: i32,
    target_velocity: i32,
    target_torque: i16,
    position: i32,
    velocity: i32,
    torque: i16,
    configuration: Vec<Entry>,
}

impl Cia402Device {
    /// Healthy device, powering up.
    pub fn new() -> Self {
        Self {
            state: DeviceState::NotReadyToSwitchOn,
            stuck: false,
            control_word: 0,
            error_code: 0,
            setpoint_acknowledged: false,
            target_position: 0,
            target_velocity: 0,
            target_torque: 0,
            position: 0,
            velocity: 0,
            torque: 0,
            configuration: Vec::new(),
        }
    }

    /// Device that never reacts to control words.
    pub fn stuck() -> Self {
        Self {
            stuck: true,
            ..Self::new()
        }
    }

    /// Device latched in Fault.
    pub fn faulted() -> Self {
        Self {
            state: DeviceState::Fault,
            error_code: SIMULATED_FAULT_CODE,
            ..Self::new()
        }
    }

    /// Current state.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Live status word.
    pub fn status_word(&self) -> u16 {
        let mut status = self.state.status_bits();
        if self.setpoint_acknowledged {
            status |= StatusWord::SETPOINT_ACKNOWLEDGE.bits();
        }
        status
    }

    /// Actual position [pulses].
    pub fn position(&self) -> i32 {
        self.position
    }

    /// One-time values received before activation.
    pub fn configuration(&self) -> &[Entry] {
        &self.configuration
    }

    /// Store a one-time value.
    pub fn configure(&mut self, entry: Entry) {
        self.configuration.retain(|e| (e.index, e.subindex) != (entry.index, entry.subindex));
        self.configuration.push(entry);
    }

    /// Apply an output object received from the master.
    pub fn write_object(&mut self, index: u16, subindex: u8, bytes: &[u8; 4]) {
        if subindex != 0 {
            return;
        }
        match index {
            object::CONTROL_WORD => self.apply_control_word(decode::<u16>(bytes)),
            object::TARGET_POSITION => self.target_position = decode::<i32>(bytes),
            object::TARGET_VELOCITY => self.target_velocity = decode::<i32>(bytes),
            object::TARGET_TORQUE => self.target_torque = decode::<i16>(bytes),
            _ => {}
        }
    }

    /// Current value of an input object, little-endian.
    pub fn read_object(&self, index: u16, subindex: u8) -> [u8; 4] {
        if subindex != 0 {
            return [0; 4];
        }
        match index {
            object::STATUS_WORD => encode(self.status_word()),
            object::ERROR_CODE => encode(self.error_code),
            object::POSITION_ACTUAL => encode(self.position),
            object::VELOCITY_ACTUAL => encode(self.velocity),
            object::TORQUE_ACTUAL => encode(self.torque),
            _ => [0; 4],
        }
    }

    /// Advance internal dynamics by one cycle.
    pub fn tick(&mut self) {
        match self.state {
            DeviceState::NotReadyToSwitchOn => self.state = DeviceState::SwitchOnDisabled,
            DeviceState::OperationEnabled => {
                self.position = self.target_position;
                self.velocity = self.target_velocity;
                self.torque = self.target_torque;
            }
            _ => {
                self.velocity = 0;
                self.torque = 0;
            }
        }
    }

    fn apply_control_word(&mut self, raw: u16) {
        if self.stuck {
            return;
        }
        let previous = ControlWord::from_raw(self.control_word);
        let word = ControlWord::from_raw(raw);
        self.control_word = raw;

        let next = match self.state {
            DeviceState::Fault => {
                let rising = word.contains(ControlWord::FAULT_RESET)
                    && !previous.contains(ControlWord::FAULT_RESET);
                if rising {
                    self.error_code = 0;
                    DeviceState::SwitchOnDisabled
                } else {
                    DeviceState::Fault
                }
            }
            DeviceState::NotReadyToSwitchOn => DeviceState::NotReadyToSwitchOn,
            _ if !word.contains(ControlWord::ENABLE_VOLTAGE) => DeviceState::SwitchOnDisabled,
            state => match (state, raw & 0x0087, raw & 0x008F) {
                (_, 0x0006, _) => DeviceState::ReadyToSwitchOn,
                (DeviceState::ReadyToSwitchOn, _, 0x0007) => DeviceState::SwitchedOn,
                (DeviceState::OperationEnabled, _, 0x0007) => DeviceState::SwitchedOn,
                (DeviceState::SwitchedOn, _, 0x000F) => DeviceState::OperationEnabled,
                (state, _, _) => state,
            },
        };

        if next != self.state {
            debug!("Simulated device: {:?} -> {:?} (cw=0x{:04X})", self.state, next, raw);
            self.state = next;
        }

        self.setpoint_acknowledged = self.state == DeviceState::OperationEnabled
            && word.contains(ControlWord::NEW_SETPOINT);
    }
}

impl Default for Cia402Device {
    fn default() -> Self {
        Self::new()
    }
}
