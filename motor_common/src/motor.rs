//! Drive, transport and fleet definitions.
//!
//! This module contains the collaborator traits, CiA-402 protocol words,
//! configuration structs and per-cycle records used by the manager.

pub mod cia402;
pub mod config;
pub mod drive;
pub mod params;
pub mod transport;
pub mod types;
