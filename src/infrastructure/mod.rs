//! Infrastructure layer: configuration and logging.

pub mod config;
pub mod logging;
