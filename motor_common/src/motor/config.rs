//! Manager configuration (`manager.toml`).
//!
//! ```toml
//! period_ns = 1000000
//!
//! [shared]
//! service_name = "cell-01"
//!
//! [[masters]]
//! id = 0
//! type = "simulation"
//! number_of_slaves = 1
//!
//! [[masters.slaves]]
//! drive_id = 0
//! position = 0
//! vendor_id = 0x0000066F
//! product_code = 0x60380004
//!
//! [[drives]]
//! id = 0
//! type = "minas"
//! param_file = "minas_a6b.toml"
//! pulse_per_revolution = 8388608
//! rated_torque = 0.64
//! unit_torque = 0.1
//! ```
//!
//! `param_file` paths are resolved relative to the configuration file.

use crate::config::{ConfigLoader, SharedConfig, resolve_path};
use crate::consts::{DEFAULT_HEALTH_INTERVAL, DEFAULT_PERIOD_NS, NSEC_PER_SEC};
use crate::error::ConfigurationError;
use crate::motor::types::{DriveId, MasterId, SlaveIdentity};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

fn default_period_ns() -> u32 {
    DEFAULT_PERIOD_NS
}

fn default_health_interval() -> u64 {
    DEFAULT_HEALTH_INTERVAL
}

fn default_max_torque_ratio() -> f64 {
    2.0
}

/// Root of the manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Common service settings.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Cycle period [ns].
    #[serde(default = "default_period_ns")]
    pub period_ns: u32,

    /// Cycles between two transport health polls.
    #[serde(default = "default_health_interval")]
    pub health_interval: u64,

    /// Fieldbus masters, in iteration order.
    pub masters: Vec<MasterConfig>,

    /// Drives, in iteration order.
    pub drives: Vec<DriveConfig>,
}

/// One fieldbus master and the slaves on its ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MasterConfig {
    /// Unique master id.
    pub id: MasterId,

    /// Transport selector (e.g. `"simulation"`).
    #[serde(rename = "type")]
    pub kind: String,

    /// Index of the master device on the host.
    #[serde(default)]
    pub master_index: u32,

    /// Expected slave count.
    pub number_of_slaves: u16,

    /// Options read by the simulated transport.
    #[serde(default)]
    pub simulation: SimulationOptions,

    /// Slaves bound to drives.
    #[serde(default)]
    pub slaves: Vec<SlaveConfig>,
}

/// Fault injection for the simulated transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationOptions {
    /// Ring positions whose device ignores control words.
    #[serde(default)]
    pub stuck_slaves: Vec<u16>,

    /// Ring positions whose device starts in Fault.
    #[serde(default)]
    pub fault_slaves: Vec<u16>,

    /// `receive_cycle` fails once this many cycles have been received.
    #[serde(default)]
    pub fail_receive_after: Option<u64>,
}

/// One slave and the drive bound to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlaveConfig {
    /// Drive controlling this slave.
    pub drive_id: DriveId,
    /// Station alias.
    #[serde(default)]
    pub alias: u16,
    /// Ring position.
    pub position: u16,
    /// Expected vendor id.
    #[serde(default)]
    pub vendor_id: u32,
    /// Expected product code.
    #[serde(default)]
    pub product_code: u32,
}

impl SlaveConfig {
    /// Identity handed to the transport.
    pub fn identity(&self) -> SlaveIdentity {
        SlaveIdentity {
            alias: self.alias,
            position: self.position,
            vendor_id: self.vendor_id,
            product_code: self.product_code,
        }
    }
}

/// Static physical parameters of one drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriveConfig {
    /// Unique drive id.
    pub id: DriveId,

    /// Drive family selector (e.g. `"minas"`).
    #[serde(rename = "type")]
    pub kind: String,

    /// Parameter file (objects and cyclic entries).
    pub param_file: PathBuf,

    /// Encoder pulses per motor revolution.
    pub pulse_per_revolution: u32,

    /// Rated torque [N·m].
    pub rated_torque: f64,

    /// Torque unit on the wire [% of rated torque].
    pub unit_torque: f64,

    /// Torque limit as a multiple of rated torque.
    #[serde(default = "default_max_torque_ratio")]
    pub max_torque_ratio: f64,

    /// Lower software position limit [rad].
    #[serde(default)]
    pub lower: f64,

    /// Upper software position limit [rad].
    #[serde(default)]
    pub upper: f64,

    /// Maximum motor speed [r/min].
    #[serde(default)]
    pub speed: f64,

    /// Maximum acceleration [rad/s²].
    #[serde(default)]
    pub acceleration: f64,

    /// Maximum deceleration [rad/s²].
    #[serde(default)]
    pub deceleration: f64,

    /// Profile velocity [rad/s].
    #[serde(default)]
    pub profile_velocity: f64,

    /// Profile acceleration [rad/s²].
    #[serde(default)]
    pub profile_acceleration: f64,

    /// Profile deceleration [rad/s²].
    #[serde(default)]
    pub profile_deceleration: f64,
}

impl DriveConfig {
    /// Validate physical parameters.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |message: String| ConfigurationError::Drive {
            drive_id: self.id,
            message,
        };

        if self.pulse_per_revolution == 0 {
            return Err(invalid("pulse_per_revolution must be > 0".to_string()));
        }
        if !(self.rated_torque.is_finite() && self.rated_torque > 0.0) {
            return Err(invalid(format!(
                "rated_torque must be > 0 (got {})",
                self.rated_torque
            )));
        }
        if !(self.unit_torque.is_finite() && self.unit_torque > 0.0) {
            return Err(invalid(format!(
                "unit_torque must be > 0 (got {})",
                self.unit_torque
            )));
        }
        if !(self.max_torque_ratio.is_finite() && self.max_torque_ratio > 0.0) {
            return Err(invalid(format!(
                "max_torque_ratio must be > 0 (got {})",
                self.max_torque_ratio
            )));
        }
        if !(self.lower.is_finite() && self.upper.is_finite()) {
            return Err(invalid(format!(
                "position limits must be finite (got {}..{})",
                self.lower, self.upper
            )));
        }
        if self.lower > self.upper {
            return Err(invalid(format!(
                "lower limit {} exceeds upper limit {}",
                self.lower, self.upper
            )));
        }
        let non_negative = [
            ("speed", self.speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("profile_velocity", self.profile_velocity),
            ("profile_acceleration", self.profile_acceleration),
            ("profile_deceleration", self.profile_deceleration),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(format!("{name} must be >= 0 (got {value})")));
            }
        }
        Ok(())
    }
}

impl ManagerConfig {
    /// Load, resolve parameter file paths against the file's directory,
    /// and validate.
    pub fn load_from(path: &Path) -> Result<Self, ConfigurationError> {
        let mut config = Self::load(path)?;
        let base = path.parent().unwrap_or(Path::new("."));
        for drive in &mut config.drives {
            drive.param_file = resolve_path(base, &drive.param_file);
        }
        config.validate()?;
        debug!(
            "Loaded {} masters and {} drives from {}",
            config.masters.len(),
            config.drives.len(),
            path.display()
        );
        Ok(config)
    }

    /// Cycle frequency [Hz].
    pub fn frequency_hz(&self) -> f64 {
        NSEC_PER_SEC as f64 / self.period_ns as f64
    }

    /// Total number of slave bindings.
    pub fn binding_count(&self) -> usize {
        self.masters.iter().map(|m| m.slaves.len()).sum()
    }

    /// Drive with the given id.
    pub fn drive(&self, id: DriveId) -> Option<&DriveConfig> {
        self.drives.iter().find(|d| d.id == id)
    }

    /// Validate cross-references and physical parameters.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.shared.validate()?;

        if self.period_ns == 0 {
            return Err(ConfigurationError::ValidationError(
                "period_ns must be > 0".to_string(),
            ));
        }
        if self.health_interval == 0 {
            return Err(ConfigurationError::ValidationError(
                "health_interval must be > 0".to_string(),
            ));
        }
        if self.masters.is_empty() {
            return Err(ConfigurationError::ValidationError(
                "at least one master is required".to_string(),
            ));
        }

        let mut drive_ids = HashSet::new();
        for drive in &self.drives {
            if !drive_ids.insert(drive.id) {
                return Err(ConfigurationError::ValidationError(format!(
                    "duplicate drive id {}",
                    drive.id
                )));
            }
            drive.validate()?;
        }

        let mut master_ids = HashSet::new();
        let mut bound_drives = HashSet::new();
        for master in &self.masters {
            if !master_ids.insert(master.id) {
                return Err(ConfigurationError::ValidationError(format!(
                    "duplicate master id {}",
                    master.id
                )));
            }
            if master.slaves.len() != master.number_of_slaves as usize {
                return Err(ConfigurationError::ValidationError(format!(
                    "master {}: number_of_slaves is {} but {} slaves are listed",
                    master.id,
                    master.number_of_slaves,
                    master.slaves.len()
                )));
            }

            let mut addresses = HashSet::new();
            for slave in &master.slaves {
                if !addresses.insert((slave.alias, slave.position)) {
                    return Err(ConfigurationError::ValidationError(format!(
                        "master {}: duplicate slave address {}:{}",
                        master.id, slave.alias, slave.position
                    )));
                }
                if !drive_ids.contains(&slave.drive_id) {
                    return Err(ConfigurationError::ValidationError(format!(
                        "master {} slave {}: unknown drive_id {}",
                        master.id, slave.position, slave.drive_id
                    )));
                }
                if !bound_drives.insert(slave.drive_id) {
                    return Err(ConfigurationError::ValidationError(format!(
                        "master {} slave {}: drive {} is already bound to another slave",
                        master.id, slave.position, slave.drive_id
                    )));
                }
            }
        }
        Ok(())
    }
}
