//! Minas drive implementation.

use super::object_id;
use crate::drives::handshake::Cia402Handshake;
use motor_common::entry::{Entry, ValueType};
use motor_common::error::ConfigurationError;
use motor_common::motor::cia402::{ControlWord, StatusWord, command};
use motor_common::motor::config::DriveConfig;
use motor_common::motor::drive::{CyclicLayout, HandshakeStep, MotorDrive};
use motor_common::motor::params::{DriveParameters, ObjectSpec};
use motor_common::motor::types::{DriveId, DriveState};
use std::f64::consts::TAU;
use tracing::{debug, info, warn};

/// Panasonic Minas A-series servo drive.
pub struct MinasDrive {
    config: DriveConfig,
    handshake: Cia402Handshake,
    configuration: Vec<Entry>,
    layout: CyclicLayout,
}

impl MinasDrive {
    /// Drive with no parameters loaded yet.
    pub fn new(config: DriveConfig) -> Self {
        Self {
            config,
            handshake: Cia402Handshake::new(),
            configuration: Vec::new(),
            layout: CyclicLayout::default(),
        }
    }

    /// Raw value of a derived object, `None` for pass-through ids.
    fn derived_value(&self, id: u8) -> Option<f64> {
        let c = &self.config;
        let pulses = |radians: f64| radians / TAU * c.pulse_per_revolution as f64;
        let value = match id {
            object_id::MAX_TORQUE => c.max_torque_ratio / c.unit_torque * 100.0,
            object_id::MIN_POSITION_LIMIT => pulses(c.lower),
            object_id::MAX_POSITION_LIMIT => pulses(c.upper),
            object_id::MAX_MOTOR_SPEED => c.speed,
            object_id::PROFILE_VELOCITY => pulses(c.profile_velocity),
            object_id::PROFILE_ACCELERATION => pulses(c.profile_acceleration),
            object_id::PROFILE_DECELERATION => pulses(c.profile_deceleration),
            object_id::MAX_ACCELERATION => pulses(c.acceleration),
            object_id::MAX_DECELERATION => pulses(c.deceleration),
            _ => return None,
        };
        Some(value)
    }

    fn resolve_object(&self, spec: &ObjectSpec) -> Result<Entry, ConfigurationError> {
        let drive_id = self.config.id;
        let value_type: ValueType = spec.value_type.parse()?;

        let raw = match self.derived_value(spec.id) {
            Some(value) => {
                if spec.value.is_some() {
                    warn!(
                        "Drive {}: object {} (0x{:04X}:{}) is derived, ignoring literal value",
                        drive_id, spec.id, spec.index, spec.subindex
                    );
                }
                value.trunc() as i64
            }
            None => spec.value.ok_or_else(|| ConfigurationError::Drive {
                drive_id,
                message: format!(
                    "object {} (0x{:04X}:{}) has no value",
                    spec.id, spec.index, spec.subindex
                ),
            })?,
        };

        Entry::from_i64(spec.id, spec.index, spec.subindex, value_type, raw).ok_or_else(|| {
            ConfigurationError::Drive {
                drive_id,
                message: format!(
                    "object {} (0x{:04X}:{}) value {} does not fit {}",
                    spec.id, spec.index, spec.subindex, raw, value_type
                ),
            }
        })
    }
}

impl MotorDrive for MinasDrive {
    fn name(&self) -> &'static str {
        "minas"
    }

    fn id(&self) -> DriveId {
        self.config.id
    }

    fn config(&self) -> &DriveConfig {
        &self.config
    }

    fn state(&self) -> DriveState {
        self.handshake.state()
    }

    fn load_parameters(&mut self, params: &DriveParameters) -> Result<(), ConfigurationError> {
        let parts = params.partition(self.config.id)?;

        let mut configuration = Vec::with_capacity(parts.objects.len());
        for spec in &parts.objects {
            let entry = self.resolve_object(spec)?;
            debug!(
                "Drive {}: object 0x{:04X}:{} = {} ({})",
                self.config.id,
                entry.index,
                entry.subindex,
                entry.to_i64(),
                entry.value_type
            );
            configuration.push(entry);
        }

        self.configuration = configuration;
        self.layout = parts.layout;

        info!(
            "Drive {} (minas): {} configuration entries, {} commands, {} feedback",
            self.config.id,
            self.configuration.len(),
            self.layout.commands.len(),
            self.layout.feedback.len()
        );
        Ok(())
    }

    fn configuration_entries(&self) -> &[Entry] {
        &self.configuration
    }

    fn cyclic_layout(&self) -> &CyclicLayout {
        &self.layout
    }

    fn advance_enable(&mut self, status: StatusWord) -> HandshakeStep {
        self.handshake.advance_enable(status)
    }

    fn advance_disable(&mut self, status: StatusWord) -> HandshakeStep {
        self.handshake.advance_disable(status)
    }

    fn is_setpoint_acknowledged(&self, status: StatusWord) -> Option<ControlWord> {
        status
            .is_setpoint_acknowledged()
            .then_some(command::ACKNOWLEDGE_SETPOINT)
    }

    fn position_to_physical(&self, raw: i32) -> f64 {
        raw as f64 / self.config.pulse_per_revolution as f64 * TAU
    }

    fn physical_to_position(&self, position: f64) -> Option<i32> {
        let raw = wire_value(position / TAU * self.config.pulse_per_revolution as f64, ValueType::S32)?;
        i32::try_from(raw).ok()
    }

    fn velocity_to_physical(&self, raw: i32) -> f64 {
        raw as f64 / self.config.pulse_per_revolution as f64 * TAU
    }

    fn physical_to_velocity(&self, velocity: f64) -> Option<i32> {
        let raw = wire_value(velocity / TAU * self.config.pulse_per_revolution as f64, ValueType::S32)?;
        i32::try_from(raw).ok()
    }

    fn torque_to_physical(&self, raw: i16) -> f64 {
        self.config.rated_torque * 0.01 * raw as f64 * self.config.unit_torque
    }

    fn physical_to_torque(&self, torque: f64) -> Option<i16> {
        let raw = wire_value(
            torque / self.config.rated_torque * 100.0 / self.config.unit_torque,
            ValueType::S16,
        )?;
        i16::try_from(raw).ok()
    }
}

/// Truncate toward zero. `None` when not finite or outside `value_type`.
fn wire_value(value: f64, value_type: ValueType) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let raw = value.trunc();
    (raw >= value_type.min_value() as f64 && raw <= value_type.max_value() as f64).then_some(raw as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use std::path::PathBuf;

    const PARAMS: &str = r#"
[[objects]]
id = 10
index = 0x6060
type = "s8"
value = 8

[[objects]]
id = 50
index = 0x6072
type = "u16"

[[objects]]
id = 51
index = 0x607D
subindex = 1
type = "s32"

[[objects]]
id = 52
index = 0x607D
subindex = 2
type = "s32"

[[objects]]
id = 53
index = 0x6080
type = "u32"

[[objects]]
id = 54
index = 0x6081
type = "u32"

[[entries]]
id = 98
index = 0x1600

[[entries]]
id = 0
index = 0x6040
subindex = 0
type = "u16"

[[entries]]
id = 1
index = 0x607A
subindex = 0
type = "s32"

[[entries]]
id = 99
index = 0x1A00

[[entries]]
id = 4
index = 0x6041
subindex = 0
type = "u16"

[[entries]]
id = 6
index = 0x6064
subindex = 0
type = "s32"
"#;

    fn config() -> DriveConfig {
        DriveConfig {
            id: 1,
            kind: "minas".to_string(),
            param_file: PathBuf::from("minas.toml"),
            pulse_per_revolution: 131072,
            rated_torque: 2.0,
            unit_torque: 0.01,
            max_torque_ratio: 2.0,
            lower: -PI,
            upper: PI,
            speed: 3000.0,
            acceleration: 0.0,
            deceleration: 0.0,
            profile_velocity: 2.0 * PI,
            profile_acceleration: 0.0,
            profile_deceleration: 0.0,
        }
    }

    fn loaded() -> MinasDrive {
        let mut drive = MinasDrive::new(config());
        drive.load_parameters(&toml::from_str(PARAMS).unwrap()).unwrap();
        drive
    }

    fn value_of(drive: &MinasDrive, id: u8) -> i64 {
        drive
            .configuration_entries()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.to_i64())
            .unwrap()
    }

    #[test]
    fn position_scenario_pi_is_half_a_revolution() {
        let drive = MinasDrive::new(config());
        assert_eq!(drive.physical_to_position(PI), Some(65536));
        assert!((drive.position_to_physical(65536) - 3.14159).abs() < 1e-5);
    }

    #[test]
    fn conversions_invert_within_one_unit() {
        let drive = MinasDrive::new(config());
        for raw in [-1_000_000, -65537, -1, 0, 1, 12_345, 131_071, 7_777_777] {
            let back = drive.physical_to_position(drive.position_to_physical(raw)).unwrap();
            assert!((back - raw).abs() <= 1, "position {raw} -> {back}");
            let back = drive.physical_to_velocity(drive.velocity_to_physical(raw)).unwrap();
            assert!((back - raw).abs() <= 1, "velocity {raw} -> {back}");
        }
        for raw in [i16::MIN + 1, -1000, -1, 0, 1, 100, 2500, i16::MAX] {
            let back = drive.physical_to_torque(drive.torque_to_physical(raw)).unwrap();
            assert!((back - raw).abs() <= 1, "torque {raw} -> {back}");
        }
    }

    #[test]
    fn torque_uses_rated_torque_and_unit() {
        let drive = MinasDrive::new(config());
        // 2.0 N·m rated, 0.01 % per unit: 5000 units = 50 % = 1.0 N·m.
        assert!((drive.torque_to_physical(5000) - 1.0).abs() < 1e-9);
        assert!((drive.physical_to_torque(1.0).unwrap() - 5000).abs() <= 1);
    }

    #[test]
    fn conversions_reject_non_finite_and_out_of_range_targets() {
        let drive = MinasDrive::new(config());
        for position in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e12, -1e12] {
            assert_eq!(drive.physical_to_position(position), None, "position {position}");
            assert_eq!(drive.physical_to_velocity(position), None, "velocity {position}");
        }
        // 7.0 N·m is 35000 units, past i16::MAX.
        assert_eq!(drive.physical_to_torque(7.0), None);
        assert_eq!(drive.physical_to_torque(-7.0), None);
        assert_eq!(drive.physical_to_torque(f64::NAN), None);
        assert_eq!(drive.physical_to_torque(-0.0), Some(0));
    }

    #[test]
    fn derived_objects_follow_configuration() {
        let drive = loaded();
        assert_eq!(value_of(&drive, 10), 8);
        assert_eq!(value_of(&drive, object_id::MAX_TORQUE), 20000);
        assert_eq!(value_of(&drive, object_id::MIN_POSITION_LIMIT), -65536);
        assert_eq!(value_of(&drive, object_id::MAX_POSITION_LIMIT), 65536);
        assert_eq!(value_of(&drive, object_id::MAX_MOTOR_SPEED), 3000);
        assert_eq!(value_of(&drive, object_id::PROFILE_VELOCITY), 131072);
    }

    #[test]
    fn cyclic_layout_is_partitioned() {
        let drive = loaded();
        let layout = drive.cyclic_layout();
        assert_eq!(layout.rx_pdo_index, 0x1600);
        assert_eq!(layout.tx_pdo_index, 0x1A00);
        assert_eq!(layout.commands.len(), 2);
        assert_eq!(layout.feedback.len(), 2);
        assert_eq!(drive.configuration_entries().len(), 6);
    }

    #[test]
    fn derived_value_out_of_range_is_rejected() {
        let mut cfg = config();
        cfg.unit_torque = 0.001; // 200000 does not fit u16
        let mut drive = MinasDrive::new(cfg);
        let err = drive
            .load_parameters(&toml::from_str(PARAMS).unwrap())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Drive { drive_id: 1, .. }));
        assert!(err.to_string().contains("does not fit u16"));
    }

    #[test]
    fn literal_object_requires_value() {
        let params = PARAMS.replace("value = 8", "");
        let mut drive = MinasDrive::new(config());
        let err = drive.load_parameters(&toml::from_str(&params).unwrap()).unwrap_err();
        assert!(err.to_string().contains("has no value"));
    }

    #[test]
    fn setpoint_acknowledge() {
        let drive = MinasDrive::new(config());
        assert_eq!(
            drive.is_setpoint_acknowledged(StatusWord::from_raw(0x1237)),
            Some(command::ACKNOWLEDGE_SETPOINT)
        );
        assert_eq!(drive.is_setpoint_acknowledged(StatusWord::from_raw(0x0237)), None);
    }

    #[test]
    fn handshake_state_is_exposed() {
        let mut drive = loaded();
        assert_eq!(drive.state(), DriveState::SwitchOnDisabled);
        drive.advance_enable(StatusWord::from_raw(0x0221));
        assert_eq!(drive.state(), DriveState::ReadyToSwitchOn);
    }
}
