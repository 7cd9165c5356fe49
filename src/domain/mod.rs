//! Domain layer for the matchwright conversation engine
//!
//! This module contains the conversation models and the collaborator ports.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
