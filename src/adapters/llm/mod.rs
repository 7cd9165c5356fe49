//! Chat-completion adapters.

pub mod openai;

pub use openai::OpenAiChatModel;
