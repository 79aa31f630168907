//! Motor Common Library
//!
//! Shared building blocks for the motor manager workspace: the fieldbus
//! entry codec, CiA-402 protocol words, configuration loading and the
//! collaborator traits implemented by drive families and transports.
//!
//! # Module Structure
//!
//! - [`entry`] - Little-endian entry codec and interface identifiers
//! - [`motor`] - Drive/transport traits, CiA-402 words, config and records
//! - [`config`] - Configuration loading traits and types
//! - [`error`] - Error taxonomy shared by every crate
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use motor_common::prelude::*;
//! use motor_common::entry::{encode, decode};
//!
//! assert_eq!(decode::<i16>(&encode(-2i16)), -2);
//! ```

pub mod config;
pub mod consts;
pub mod entry;
pub mod error;
pub mod motor;
pub mod prelude;
