//! Configuration loading traits and types.
//!
//! This module provides the TOML loading path shared by the manager
//! configuration and the per-drive parameter files.
//!
//! # Usage
//!
//! ```rust,no_run
//! use motor_common::config::{ConfigLoader, SharedConfig};
//! use motor_common::error::ConfigurationError;
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct MyAppConfig {
//!     shared: SharedConfig,
//!     period_ns: u32,
//! }
//!
//! fn main() -> Result<(), ConfigurationError> {
//!     let config = MyAppConfig::load(Path::new("manager.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "motor-manager-cell-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: "motor_manager".to_string(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.service_name.is_empty() {
            return Err(ConfigurationError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigurationError::FileNotFound` if the file does not exist
/// - Returns `ConfigurationError::ParseError` if TOML syntax is invalid or a
///   field does not deserialize
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigurationError::FileNotFound(path.to_path_buf())
            } else {
                ConfigurationError::ParseError {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })?;

        Self::from_toml(&content, path)
    }

    /// Parse configuration from a TOML string; `origin` is used in errors.
    fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigurationError> {
        toml::from_str(content).map_err(|e| ConfigurationError::ParseError {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
