//! Simulated fieldbus master.
//!
//! Emulates a ring of CiA-402 servo slaves in memory so the manager can be
//! exercised without hardware.

mod device;
mod transport;

pub use device::{Cia402Device, DeviceState};
pub use transport::SimulatedTransport;

use motor_common::motor::config::MasterConfig;
use motor_common::motor::transport::Transport;

/// Factory function to create a simulated transport instance.
pub fn create_transport(config: &MasterConfig) -> Box<dyn Transport> {
    Box::new(SimulatedTransport::new(config.clone()))
}
