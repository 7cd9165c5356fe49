//! Vector store adapters.

pub mod memory;
pub mod pinecone;

pub use memory::InMemoryVectorStore;
pub use pinecone::PineconeVectorStore;
