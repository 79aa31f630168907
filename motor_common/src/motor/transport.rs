//! Transport (fieldbus master) trait.
//!
//! A transport owns the cyclic process-data image shared by all slaves on
//! its ring and performs link-level send/receive. The manager only
//! consumes the contract below.
//!
//! # Process-data invariant
//!
//! The buffer returned by [`Transport::process_data`] is read and written
//! by several slave bindings during one cycle without locking. This is
//! sound only because every access happens on the single control thread
//! that owns the transport; implementations must never touch the buffer
//! from another thread while a cycle is running.

use crate::entry::Entry;
use crate::error::LinkError;
use crate::motor::config::MasterConfig;
use crate::motor::types::{
    Direction, MasterId, SlaveHandle, SlaveHealth, SlaveIdentity, SlaveLayout, TransportHealth,
};

/// Factory function type for creating transport instances.
pub type TransportFactory = fn(&MasterConfig) -> Box<dyn Transport>;

/// Contract of a cyclic fieldbus master.
///
/// # Lifecycle
///
/// 1. `initialize()` - request the master, create the cyclic domain
/// 2. `attach_slave()`, `configure_layout()`, `register_offset()`,
///    `submit_configuration_value()` - per slave, pre-activation
/// 3. `activate()` - process data becomes available
/// 4. `receive_cycle()` / `process_data()` / `transmit_cycle()` - every cycle
/// 5. `deactivate()`
///
/// # Timing Contracts
///
/// | Operation | RT Constraint |
/// |-----------|---------------|
/// | steps 1-3, 5 | None (outside the loop) |
/// | `receive_cycle()` / `transmit_cycle()` | **HARD**, bounded time |
/// | `process_data()` | **HARD**, no allocation |
pub trait Transport: Send {
    /// Transport type (e.g. "simulation").
    fn name(&self) -> &'static str;

    /// Configured master id.
    fn id(&self) -> MasterId;

    /// Request the master and create the cyclic domain.
    fn initialize(&mut self) -> Result<(), LinkError>;

    /// Start cyclic operation; process data becomes valid.
    fn activate(&mut self) -> Result<(), LinkError>;

    /// Stop cyclic operation and release the master.
    fn deactivate(&mut self) -> Result<(), LinkError>;

    /// Locate a slave on the ring.
    fn attach_slave(&mut self, identity: &SlaveIdentity) -> Result<SlaveHandle, LinkError>;

    /// Negotiate the PDO mapping of a slave.
    fn configure_layout(&mut self, slave: SlaveHandle, layout: &SlaveLayout) -> Result<(), LinkError>;

    /// Register one mapped object in the domain; returns its byte offset.
    fn register_offset(
        &mut self,
        slave: SlaveHandle,
        index: u16,
        subindex: u8,
        direction: Direction,
    ) -> Result<usize, LinkError>;

    /// Queue a one-time value written before cyclic exchange.
    fn submit_configuration_value(&mut self, slave: SlaveHandle, entry: &Entry) -> Result<(), LinkError>;

    /// Send the outputs of one cycle.
    fn transmit_cycle(&mut self) -> Result<(), LinkError>;

    /// Receive the inputs of one cycle.
    fn receive_cycle(&mut self) -> Result<(), LinkError>;

    /// Raw process-data image, valid only after `activate()`.
    fn process_data(&mut self) -> Result<&mut [u8], LinkError>;

    /// Link-level diagnostics.
    fn health(&self) -> TransportHealth;

    /// Per-slave diagnostics, `None` for an unknown handle.
    fn slave_health(&self, slave: SlaveHandle) -> Option<SlaveHealth>;
}
