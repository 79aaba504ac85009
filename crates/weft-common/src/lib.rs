//! Shared plumbing for the weft crates: errors, settings and telemetry.

pub mod config;
pub mod error;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use crate::config::{FileStore, Loader, Saver, Settings};
pub use crate::error::WeftError;
