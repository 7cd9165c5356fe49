//! Persona agent port: the response contract the conversation controller
//! depends on.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Transcript;

#[async_trait]
pub trait ConversationAgent: Send + Sync {
    /// Identifier of the persona this agent speaks for.
    fn id(&self) -> &str;

    /// Produce the next utterance given the full transcript so far.
    ///
    /// An empty string is a valid reply; it is recorded as-is.
    async fn respond(&self, transcript: &Transcript) -> DomainResult<String>;
}
