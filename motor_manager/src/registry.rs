//! Factory registry for drive families and transports.
//!
//! The configured `type` string is resolved here exactly once, when the
//! manager is built. Cycle code only sees trait objects.

use motor_common::error::ConfigurationError;
use motor_common::motor::config::{DriveConfig, MasterConfig};
use motor_common::motor::drive::{DriveFactory, MotorDrive};
use motor_common::motor::transport::{Transport, TransportFactory};
use std::collections::HashMap;

/// Registry of available drive families and transports.
///
/// Constructed at startup, populated via `register_*()`, and passed to
/// `MotorManager::new` by reference. No global state.
pub struct Registry {
    transports: HashMap<&'static str, TransportFactory>,
    drives: HashMap<&'static str, DriveFactory>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            transports: HashMap::new(),
            drives: HashMap::new(),
        }
    }

    /// Registry holding every built-in drive family and transport.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drives::register_all_drives(&mut registry);
        crate::transports::register_all_transports(&mut registry);
        registry
    }

    /// Register a transport factory.
    ///
    /// # Panics
    /// Panics if a transport with the same name is already registered.
    pub fn register_transport(&mut self, name: &'static str, factory: TransportFactory) {
        if self.transports.contains_key(name) {
            panic!("Transport '{name}' is already registered");
        }
        self.transports.insert(name, factory);
    }

    /// Register a drive factory.
    ///
    /// # Panics
    /// Panics if a drive family with the same name is already registered.
    pub fn register_drive(&mut self, name: &'static str, factory: DriveFactory) {
        if self.drives.contains_key(name) {
            panic!("Drive '{name}' is already registered");
        }
        self.drives.insert(name, factory);
    }

    /// Create the transport selected by `config.kind`.
    ///
    /// # Errors
    /// `ConfigurationError::UnsupportedTransport` for an unknown type.
    pub fn create_transport(
        &self,
        config: &MasterConfig,
    ) -> Result<Box<dyn Transport>, ConfigurationError> {
        let factory = self.transports.get(config.kind.as_str()).ok_or_else(|| {
            ConfigurationError::UnsupportedTransport {
                master_id: config.id,
                kind: config.kind.clone(),
            }
        })?;
        Ok(factory(config))
    }

    /// Create the drive selected by `config.kind`.
    ///
    /// # Errors
    /// `ConfigurationError::UnsupportedDrive` for an unknown type.
    pub fn create_drive(&self, config: &DriveConfig) -> Result<Box<dyn MotorDrive>, ConfigurationError> {
        let factory = self.drives.get(config.kind.as_str()).ok_or_else(|| {
            ConfigurationError::UnsupportedDrive {
                drive_id: config.id,
                kind: config.kind.clone(),
            }
        })?;
        Ok(factory(config))
    }

    /// List all registered transport names.
    pub fn list_transports(&self) -> Vec<&'static str> {
        self.transports.keys().copied().collect()
    }

    /// List all registered drive names.
    pub fn list_drives(&self) -> Vec<&'static str> {
        self.drives.keys().copied().collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
