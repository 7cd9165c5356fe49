//! Configuration loading
//!
//! Defaults, then `.matchwright/config.yaml`, then `.matchwright/local.yaml`,
//! then `MATCHWRIGHT_*` environment variables. Loaded configs are validated
//! before use.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
