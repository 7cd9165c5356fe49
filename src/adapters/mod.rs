//! Adapters for the collaborator ports: HTTP backends and test fakes.

pub mod embeddings;
pub mod llm;
pub mod mock;
pub mod vector;
