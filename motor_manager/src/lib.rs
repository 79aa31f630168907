//! # Motor Manager Library
//!
//! Drives a fleet of CiA-402 servo drives over cyclic fieldbus transports
//! at a fixed period: configure, enable, exchange commands and feedback,
//! disable.
//!
//! ## Layers
//!
//! 1. **Drive** ([`drives`]) - per-family unit conversion and the
//!    enable/disable handshake
//! 2. **Slave binding** ([`controller`]) - entry-to-offset map and the
//!    per-cycle read/check/write against a transport's process image
//! 3. **Transport** ([`transports`]) - fieldbus masters behind the
//!    `Transport` trait
//! 4. **Orchestrator** ([`manager`]) - all-or-nothing fleet transitions and
//!    the receive → act → transmit cycle
//!
//! [`cycle`] paces the orchestrator in real time; [`registry`] resolves
//! configured type names to implementations.
//!
//! ## Zero-Allocation Cycle
//!
//! Offsets, confirmation flags and record buffers are sized once at
//! configuration. `MotorManager::update` never allocates.

pub mod controller;
pub mod cycle;
pub mod drives;
pub mod manager;
pub mod policy;
pub mod registry;
pub mod transports;

pub use controller::SlaveBinding;
pub use cycle::{CommandSource, CycleError, CycleRunner, CycleStats, ShutdownSignals, rt_setup};
pub use manager::MotorManager;
pub use policy::{AbortOnLinkError, LinkErrorPolicy, LinkPhase};
pub use registry::Registry;
