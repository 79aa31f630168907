//! Workspace-wide constants.

/// Nanoseconds per second.
pub const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Default cycle period [ns] (1 ms).
pub const DEFAULT_PERIOD_NS: u32 = 1_000_000;

/// Default number of cycles between two transport health polls.
pub const DEFAULT_HEALTH_INTERVAL: u64 = 1000;

/// Maximum number of command targets carried by one [`CommandRecord`].
///
/// [`CommandRecord`]: crate::motor::types::CommandRecord
pub const MAX_COMMAND_TARGETS: usize = 8;

/// Default path of the manager configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/motor_manager/manager.toml";
