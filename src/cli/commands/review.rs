//! `review`: judge whether a conversation should lead to a next step.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::commands::chat::{run_conversation, ConversationArgs};
use crate::cli::output::table::{base_table, decision_cell};
use crate::cli::output::{output, CommandOutput};
use crate::cli::runtime::{load_persona, write_json, Runtime};
use crate::domain::models::{Outcome, ReviewResult, Transcript};

#[derive(Args, Debug)]
pub struct ReviewArgs {
    #[command(flatten)]
    pub conversation: ConversationArgs,

    /// Review an existing transcript instead of running a new conversation
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Conversation outcome to pass along with --transcript
    #[arg(long, requires = "transcript")]
    pub outcome: Option<Outcome>,

    /// Write the review result JSON to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ReviewOutput {
    pub side_a: String,
    pub side_b: String,
    pub conversation_outcome: Option<Outcome>,
    #[serde(flatten)]
    pub result: ReviewResult,
}

impl CommandOutput for ReviewOutput {
    fn to_human(&self) -> String {
        let decision = &self.result.chat_decision;
        let signals = &self.result.similarity_signals;

        let mut table = base_table(&["Pair", "Outcome", "Decision", "Confidence", "Similarity"]);
        table.add_row(vec![
            comfy_table::Cell::new(format!("{} ↔ {}", self.side_a, self.side_b)),
            comfy_table::Cell::new(
                self.conversation_outcome
                    .map_or("-", Outcome::as_str),
            ),
            decision_cell(decision.decision),
            comfy_table::Cell::new(format!("{:.2}", decision.confidence)),
            comfy_table::Cell::new(format!(
                "{:.2} (A→B {:.2}, B→A {:.2})",
                signals.aggregate, signals.a_needs_vs_b_personality, signals.b_needs_vs_a_personality
            )),
        ]);

        let mut lines = vec![table.to_string()];
        if !decision.rationale.is_empty() {
            lines.push(format!("\nRationale: {}", decision.rationale));
        }
        lines.push(format!("Turns reviewed: {}", self.result.chat.len()));
        lines.join("\n")
    }
}

/// A saved transcript with an optional recorded outcome.
///
/// Accepts a bare array of turns or any object carrying the turns under
/// `transcript` or `chat` (conversation and review results both qualify).
fn load_transcript(path: &Path) -> Result<(Transcript, Option<Outcome>)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Transcript {} is not valid JSON", path.display()))?;

    let (turns, outcome) = match value {
        serde_json::Value::Array(_) => (value, None),
        serde_json::Value::Object(mut obj) => {
            let turns = obj
                .remove("transcript")
                .or_else(|| obj.remove("chat"))
                .context("Transcript object has no `transcript` or `chat` field")?;
            let outcome = obj
                .remove("outcome")
                .or_else(|| obj.remove("conversation_outcome"))
                .and_then(|v| serde_json::from_value(v).ok());
            (turns, outcome)
        }
        _ => anyhow::bail!("Transcript {} must be an array or object", path.display()),
    };

    let transcript = serde_json::from_value(turns)
        .with_context(|| format!("Malformed turns in {}", path.display()))?;
    Ok((transcript, outcome))
}

pub async fn execute(args: ReviewArgs, runtime: &Runtime, json: bool) -> Result<()> {
    let side_a = load_persona(&args.conversation.persona_a)?;
    let side_b = load_persona(&args.conversation.persona_b)?;
    let reviewer = runtime.reviewer()?;

    let (transcript, outcome) = match args.transcript {
        Some(ref path) => {
            let (transcript, recorded) = load_transcript(path)?;
            (transcript, args.outcome.or(recorded))
        }
        None => {
            let config = args.conversation.apply(&runtime.config.conversation);
            let result = run_conversation(runtime, &side_a, &side_b, config, json).await?;
            (result.transcript, Some(result.outcome))
        }
    };

    let result = reviewer
        .review(&side_a, &side_b, &transcript, outcome)
        .await
        .context("Decision review failed")?;

    if let Some(ref path) = args.out {
        write_json(path, &result)?;
    }

    output(
        &ReviewOutput {
            side_a: side_a.id,
            side_b: side_b.id,
            conversation_outcome: outcome,
            result,
        },
        json,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const TURN: &str = r#"{"speaker": "side_a", "message": "hi", "phase_at_time": "introduction", "timestamp": "2026-01-01T00:00:00Z"}"#;

    #[test]
    fn test_load_bare_array() {
        let file = write_temp(&format!("[{TURN}]"));
        let (transcript, outcome) = load_transcript(file.path()).unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(outcome, None);
    }

    #[test]
    fn test_load_conversation_result_carries_outcome() {
        let file = write_temp(&format!(r#"{{"outcome": "not_a_fit", "transcript": [{TURN}, {TURN}]}}"#));
        let (transcript, outcome) = load_transcript(file.path()).unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(outcome, Some(Outcome::NotAFit));
    }

    #[test]
    fn test_load_review_result_uses_chat_field() {
        let file = write_temp(&format!(r#"{{"chat": [{TURN}]}}"#));
        assert_eq!(load_transcript(file.path()).unwrap().0.len(), 1);
    }

    #[test]
    fn test_load_rejects_other_shapes() {
        assert!(load_transcript(write_temp("42").path()).is_err());
        assert!(load_transcript(write_temp(r#"{"turns": []}"#).path()).is_err());
    }
}
