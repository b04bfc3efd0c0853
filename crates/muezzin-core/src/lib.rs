//! Muezzin Core - Shared types, configuration, and the scheduling rules
//!
//! Everything in this crate is pure: no I/O besides config files, no clock
//! reads. Callers pass `now` in explicitly.

pub mod config;
pub mod constants;
pub mod digest;
pub mod error;
pub mod stage;
pub mod time;
pub mod types;

pub use config::*;
pub use constants::*;
pub use error::{Error, Result};
pub use types::*;
