//! Transport implementations.
//!
//! - [`simulation`] - in-memory CiA-402 ring for development and testing
//!
//! # Adding New Transports
//!
//! 1. Create a new submodule under `transports/`
//! 2. Implement the `Transport` trait from `motor_common::motor::transport`
//! 3. Register the factory in [`register_all_transports`]

pub mod simulation;

use crate::registry::Registry;

/// Register all built-in transports.
pub fn register_all_transports(registry: &mut Registry) {
    registry.register_transport("simulation", simulation::create_transport);
}
