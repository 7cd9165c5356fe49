//! CLI command implementations.

pub mod chat;
pub mod generate;
pub mod index;
pub mod match_cmd;
pub mod review;
