//! LLM-backed persona agent.
//!
//! Builds a per-turn context from both profiles and the last message, then
//! asks the chat model for a reply. Empty replies escalate through a bounded
//! sequence: primary call, a shortened nudge, an optional fallback model, and
//! finally an empty reply.

use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Persona, Phase, Speaker, Transcript};
use crate::domain::ports::{ChatModel, ConversationAgent, LlmError};

const PROMPT_FILE: &str = "ai_agent_prompt.md";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional conversation agent. Use the provided \
PROFILE_CONTEXT, which includes both your principal's profile and the counterpart's profile, to \
conduct a concise, outcome-oriented conversation. Ask one focused question per turn and propose \
clear next steps when appropriate.";

const STYLE_CONSTRAINTS: &str = "STYLE_CONSTRAINTS: 50-80 words, 2-3 sentences, business-formal. \
Reference at least one concrete detail from counterpart.needs or counterpart.personality, and link \
it to the agent's needs or personality. One question max (omit in closing). Plain sentences only; \
no lists; avoid greetings after the first turn; avoid generic praise. Do not invent facts; use only \
PROFILE_CONTEXT and LAST_MESSAGE. If unknown, say so briefly and ask one clarifying question. Do not \
claim commitments (meetings/materials) unless explicitly confirmed.";

const OPENING_INSTRUCTION: &str = "OPENING_INSTRUCTION: Start with a warm, professional greeting \
and a concise self-introduction (1-2 sentences) grounded in PROFILE_CONTEXT. Then ask exactly one \
focused question to understand the counterpart's current top priority.";

const CLOSING_INSTRUCTION: &str = "CLOSING_INSTRUCTION: Confirm agreed next steps in 1-2 sentences \
and, if needed, ask one short logistics question (timing/link/attachments). If everything is \
confirmed, end politely.";

const NUDGE_INSTRUCTION: &str = "Your previous response was empty. Provide a concise reply per \
STYLE_CONSTRAINTS (<=120 words, 2-4 sentences, one question max).";

const REPLY_DIRECTIVE: &str = "REPLY: Provide the response now. Do not leave this blank.";

/// Step of the empty-reply escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Primary,
    Nudge,
    Fallback,
    GiveUp,
}

impl Attempt {
    const MAX_STEPS: usize = 4;

    const fn next(self, has_fallback: bool) -> Self {
        match self {
            Self::Primary => Self::Nudge,
            Self::Nudge if has_fallback => Self::Fallback,
            Self::Nudge | Self::Fallback | Self::GiveUp => Self::GiveUp,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Nudge => "retry",
            Self::Fallback => "fallback",
            Self::GiveUp => "give_up",
        }
    }
}

pub struct PersonaAgent {
    role: Speaker,
    persona: Persona,
    counterpart: Persona,
    model: Arc<dyn ChatModel>,
    fallback: Option<Arc<dyn ChatModel>>,
    system_prompt: String,
}

impl PersonaAgent {
    pub fn new(
        role: Speaker,
        persona: Persona,
        counterpart: Persona,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            role,
            persona,
            counterpart,
            model,
            fallback: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Model tried once when primary and nudge both come back empty.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn ChatModel>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub const fn role(&self) -> Speaker {
        self.role
    }

    pub const fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Read `ai_agent_prompt.md` from `prompts_dir`, or use the built-in prompt.
    pub fn load_system_prompt(prompts_dir: Option<&Path>) -> String {
        let Some(dir) = prompts_dir else {
            return DEFAULT_SYSTEM_PROMPT.to_string();
        };
        let path = dir.join(PROMPT_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => DEFAULT_SYSTEM_PROMPT.to_string(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Falling back to default agent prompt");
                DEFAULT_SYSTEM_PROMPT.to_string()
            }
        }
    }

    fn profile_context(&self) -> String {
        json!({
            "agent_role": self.role.as_str(),
            "agent": {
                "id": self.persona.id,
                "needs": self.persona.needs,
                "personality": self.persona.personality,
            },
            "counterpart": {
                "id": self.counterpart.id,
                "needs": self.counterpart.needs,
                "personality": self.counterpart.personality,
            },
        })
        .to_string()
    }

    /// Full per-turn context.
    pub fn build_context(&self, transcript: &Transcript) -> String {
        let mut blocks = vec![
            format!("PROFILE_CONTEXT:\n{}", self.profile_context()),
            STYLE_CONSTRAINTS.to_string(),
            format!("TURN_INDEX: {}", transcript.len() + 1),
        ];
        match transcript.last() {
            None => blocks.push(OPENING_INSTRUCTION.to_string()),
            Some(last) => {
                blocks.push(format!("LAST_MESSAGE:\n{}", last.message));
                if last.phase_at_time == Phase::Closing {
                    blocks.push(CLOSING_INSTRUCTION.to_string());
                }
            }
        }
        blocks.push(REPLY_DIRECTIVE.to_string());
        blocks.join("\n\n")
    }

    /// Shortened context used after an empty primary reply.
    pub fn build_nudge_context(&self, transcript: &Transcript) -> String {
        let mut blocks = vec![
            format!("PROFILE_CONTEXT:\n{}", self.profile_context()),
            NUDGE_INSTRUCTION.to_string(),
        ];
        if let Some(last) = transcript.last() {
            blocks.push(format!("LAST_MESSAGE:\n{}", last.message));
        }
        blocks.push(REPLY_DIRECTIVE.to_string());
        blocks.join("\n\n")
    }

    /// Call `model`; `Ok(None)` means the reply was empty.
    async fn try_model(
        &self,
        model: &dyn ChatModel,
        context: &str,
        attempt: Attempt,
    ) -> Result<Option<String>, LlmError> {
        let started = Instant::now();
        let result = model.generate(&self.system_prompt, context).await;
        info!(
            role = %self.role,
            id = %self.persona.id,
            attempt = attempt.label(),
            model = model.model(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "LLM call"
        );
        match result {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => Ok(Some(text.trim().to_string())),
            Err(e) if e.is_empty_response() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn agent_failed(&self, source: LlmError) -> DomainError {
        DomainError::AgentFailed {
            speaker: format!("{} ({})", self.role, self.persona.id),
            source,
        }
    }
}

#[async_trait]
impl ConversationAgent for PersonaAgent {
    fn id(&self) -> &str {
        &self.persona.id
    }

    async fn respond(&self, transcript: &Transcript) -> DomainResult<String> {
        let context = self.build_context(transcript);
        let has_fallback = self.fallback.is_some();
        let mut attempt = Attempt::Primary;

        for _ in 0..Attempt::MAX_STEPS {
            let reply = match attempt {
                Attempt::Primary => self
                    .try_model(self.model.as_ref(), &context, attempt)
                    .await
                    .map_err(|e| self.agent_failed(e))?,
                Attempt::Nudge => {
                    let nudge = self.build_nudge_context(transcript);
                    self.try_model(self.model.as_ref(), &nudge, attempt)
                        .await
                        .map_err(|e| self.agent_failed(e))?
                }
                Attempt::Fallback => {
                    let Some(fallback) = self.fallback.as_deref() else {
                        break;
                    };
                    warn!(
                        role = %self.role,
                        model = fallback.model(),
                        "Switching to fallback model for this turn"
                    );
                    match self.try_model(fallback, &context, attempt).await {
                        Ok(reply) => reply,
                        Err(e) => {
                            error!(role = %self.role, error = %e, "Fallback model failed");
                            None
                        }
                    }
                }
                Attempt::GiveUp => break,
            };

            if let Some(text) = reply {
                return Ok(text);
            }
            attempt = attempt.next(has_fallback);
        }

        warn!(
            role = %self.role,
            id = %self.persona.id,
            turn = transcript.len() + 1,
            "All generation attempts were empty; recording empty turn"
        );
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::ScriptedChatModel;
    use crate::domain::models::TurnRecord;

    fn agent(model: Arc<ScriptedChatModel>) -> PersonaAgent {
        PersonaAgent::new(
            Speaker::SideA,
            Persona::new("founder-1", "seed funding", "direct"),
            Persona::new("investor-1", "b2b saas deals", "analytical"),
            model,
        )
    }

    #[test]
    fn test_opening_context() {
        let a = agent(Arc::new(ScriptedChatModel::new(Vec::new())));
        let ctx = a.build_context(&Transcript::new());
        assert!(ctx.starts_with("PROFILE_CONTEXT:\n"));
        assert!(ctx.contains("\"agent_role\":\"side_a\""));
        assert!(ctx.contains("TURN_INDEX: 1"));
        assert!(ctx.contains("OPENING_INSTRUCTION"));
        assert!(!ctx.contains("LAST_MESSAGE"));
        assert!(ctx.ends_with(REPLY_DIRECTIVE));
    }

    #[test]
    fn test_closing_context_follows_last_turn_phase() {
        let a = agent(Arc::new(ScriptedChatModel::new(Vec::new())));
        let mut t = Transcript::new();
        t.push(TurnRecord::new(Speaker::SideB, "Shall we wrap up?", Phase::Closing));
        let ctx = a.build_context(&t);
        assert!(ctx.contains("TURN_INDEX: 2"));
        assert!(ctx.contains("LAST_MESSAGE:\nShall we wrap up?"));
        assert!(ctx.contains("CLOSING_INSTRUCTION"));
        assert!(!ctx.contains("OPENING_INSTRUCTION"));
    }

    #[tokio::test]
    async fn test_primary_reply_is_trimmed() {
        let model = Arc::new(ScriptedChatModel::new(vec![Ok("  Hello there.  ".to_string())]));
        let a = agent(model.clone());
        let reply = a.respond(&Transcript::new()).await.unwrap();
        assert_eq!(reply, "Hello there.");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_reply_retries_with_nudge() {
        let model = Arc::new(ScriptedChatModel::new(vec![
            Err(LlmError::EmptyResponse),
            Ok("Second try.".to_string()),
        ]));
        let a = agent(model.clone());
        let reply = a.respond(&Transcript::new()).await.unwrap();
        assert_eq!(reply, "Second try.");
        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].1.contains("previous response was empty"));
    }

    #[tokio::test]
    async fn test_fallback_used_after_two_empty_replies() {
        let primary = Arc::new(ScriptedChatModel::new(vec![
            Ok(String::new()),
            Err(LlmError::EmptyResponse),
        ]));
        let fallback = Arc::new(ScriptedChatModel::new(vec![Ok("From fallback.".to_string())]));
        let a = agent(primary.clone()).with_fallback(fallback.clone());
        let reply = a.respond(&Transcript::new()).await.unwrap();
        assert_eq!(reply, "From fallback.");
        assert_eq!(primary.call_count(), 2);
        assert_eq!(fallback.call_count(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_with_empty_text() {
        let primary = Arc::new(ScriptedChatModel::new(vec![
            Err(LlmError::EmptyResponse),
            Err(LlmError::EmptyResponse),
        ]));
        let fallback = Arc::new(ScriptedChatModel::new(vec![Err(LlmError::RequestFailed(
            "boom".to_string(),
        ))]));
        let a = agent(primary).with_fallback(fallback);
        let reply = a.respond(&Transcript::new()).await.unwrap();
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn test_primary_failure_is_fatal() {
        let model = Arc::new(ScriptedChatModel::new(vec![Err(LlmError::RequestFailed(
            "503".to_string(),
        ))]));
        let a = agent(model);
        let err = a.respond(&Transcript::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::AgentFailed { .. }));
    }

    #[test]
    fn test_load_system_prompt_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROMPT_FILE), "Custom prompt").unwrap();
        assert_eq!(PersonaAgent::load_system_prompt(Some(dir.path())), "Custom prompt");

        let empty = tempfile::tempdir().unwrap();
        assert_eq!(
            PersonaAgent::load_system_prompt(Some(empty.path())),
            DEFAULT_SYSTEM_PROMPT
        );
        assert_eq!(PersonaAgent::load_system_prompt(None), DEFAULT_SYSTEM_PROMPT);
    }
}
