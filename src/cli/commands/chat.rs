//! `chat`: run one conversation between two personas.

use anyhow::{Context, Result};
use clap::Args;
use futures::StreamExt;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

use crate::cli::output::progress::{create_spinner, ProgressBarExt};
use crate::cli::output::table::{base_table, outcome_cell};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::cli::runtime::{load_persona, write_json, Runtime};
use crate::domain::models::{
    ConversationConfig, EngagementMetrics, Outcome, Persona, Speaker, Transcript,
};
use crate::services::{Conversation, ConversationEvent, ConversationResult};

#[derive(Args, Debug, Clone)]
pub struct ConversationArgs {
    /// Side A persona JSON file
    pub persona_a: PathBuf,

    /// Side B persona JSON file
    pub persona_b: PathBuf,

    /// Soft turn cap
    #[arg(long)]
    pub max_turns: Option<usize>,

    /// Earliest turn at which engagement heuristics may end the run
    #[arg(long)]
    pub min_turns: Option<usize>,

    /// Side that speaks first (side_a or side_b)
    #[arg(long)]
    pub start_with: Option<Speaker>,

    /// Stop hard at the turn cap instead of winding down through closing
    #[arg(long)]
    pub no_ensure_completion: bool,
}

impl ConversationArgs {
    /// Apply command-line overrides on top of the configured settings.
    pub fn apply(&self, base: &ConversationConfig) -> ConversationConfig {
        let mut config = base.clone();
        if let Some(max_turns) = self.max_turns {
            config.max_turns = max_turns;
            // a derived ceiling must follow the new cap
            if config.hard_max_turns.is_some_and(|hard| hard < max_turns) {
                config.hard_max_turns = None;
            }
        }
        if let Some(min_turns) = self.min_turns {
            config.min_turns = min_turns;
        }
        if let Some(start_with) = self.start_with {
            config.start_with = start_with;
        }
        if self.no_ensure_completion {
            config.ensure_completion = false;
        }
        config
    }
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub conversation: ConversationArgs,

    /// Print events as they happen (NDJSON with --json)
    #[arg(long)]
    pub stream: bool,

    /// Write the conversation result JSON to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ChatOutput {
    pub side_a: String,
    pub side_b: String,
    pub outcome: Outcome,
    pub turns: usize,
    pub final_metrics: EngagementMetrics,
    pub transcript: Transcript,
}

impl ChatOutput {
    fn new(side_a: &Persona, side_b: &Persona, result: ConversationResult) -> Self {
        Self {
            side_a: side_a.id.clone(),
            side_b: side_b.id.clone(),
            outcome: result.outcome,
            turns: result.transcript.len(),
            final_metrics: result.final_metrics,
            transcript: result.transcript,
        }
    }

    fn summary(&self) -> String {
        let mut table = base_table(&["Side A", "Side B", "Outcome", "Turns", "A eng.", "B eng."]);
        table.add_row(vec![
            comfy_table::Cell::new(&self.side_a),
            comfy_table::Cell::new(&self.side_b),
            outcome_cell(self.outcome),
            comfy_table::Cell::new(self.turns),
            comfy_table::Cell::new(format!("{:.2}", self.final_metrics.side_a_engagement)),
            comfy_table::Cell::new(format!("{:.2}", self.final_metrics.side_b_engagement)),
        ]);
        table.to_string()
    }
}

impl CommandOutput for ChatOutput {
    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self
            .transcript
            .iter()
            .enumerate()
            .map(|(i, turn)| {
                format!(
                    "[{:>2}] {:<6} ({}): {}",
                    i + 1,
                    turn.speaker,
                    turn.phase_at_time.as_str(),
                    turn.message
                )
            })
            .collect();
        if !self.final_metrics.red_flags.is_empty() {
            lines.push(format!("\nRed flags: {}", self.final_metrics.red_flags.join(", ")));
        }
        lines.push(String::new());
        lines.push(self.summary());
        lines.join("\n")
    }
}

/// Run one conversation to completion.
///
/// On a failed turn the partial transcript is logged before the error is
/// returned.
pub async fn run_conversation(
    runtime: &Runtime,
    side_a: &Persona,
    side_b: &Persona,
    config: ConversationConfig,
    hidden: bool,
) -> Result<ConversationResult> {
    let (agent_a, agent_b) = runtime.persona_agents(side_a, side_b)?;
    let mut conversation = Conversation::new(agent_a, agent_b, config);

    let spinner = create_spinner(format!("{} ↔ {}", side_a.id, side_b.id), hidden);
    match conversation.run().await {
        Ok(result) => {
            spinner.finish_success(format!(
                "{} after {} turns",
                result.outcome,
                result.transcript.len()
            ));
            Ok(result)
        }
        Err(err) => {
            spinner.finish_error("conversation failed");
            warn!(
                run_id = %conversation.run_id(),
                turns_recorded = conversation.transcript().len(),
                error = %err,
                "Conversation aborted; partial transcript kept"
            );
            Err(err).context("Conversation failed")
        }
    }
}

/// Drive the conversation as a stream, printing each event as it arrives.
async fn stream_conversation(
    runtime: &Runtime,
    side_a: &Persona,
    side_b: &Persona,
    config: ConversationConfig,
    json: bool,
) -> Result<ConversationResult> {
    let (agent_a, agent_b) = runtime.persona_agents(side_a, side_b)?;
    let mut events = Box::pin(Conversation::new(agent_a, agent_b, config).into_stream());

    let mut transcript = Transcript::new();
    let mut ended = None;
    while let Some(event) = events.next().await {
        let event = event.context("Conversation failed")?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", describe_event(&event));
        }
        match event {
            ConversationEvent::Turn { record, .. } => transcript.push(record),
            ConversationEvent::Ended {
                outcome,
                final_metrics,
                ..
            } => ended = Some((outcome, final_metrics)),
            ConversationEvent::Started { .. } | ConversationEvent::PhaseChanged(_) => {}
        }
    }

    let (outcome, final_metrics) =
        ended.context("Conversation stream ended without an outcome")?;
    Ok(ConversationResult {
        outcome,
        final_metrics,
        transcript,
    })
}

fn describe_event(event: &ConversationEvent) -> String {
    match event {
        ConversationEvent::Started {
            run_id,
            side_a,
            side_b,
            max_turns,
            hard_max_turns,
        } => format!(
            "▶ {side_a} ↔ {side_b} (max {max_turns}, hard max {hard_max_turns}) run {run_id}"
        ),
        ConversationEvent::PhaseChanged(t) => format!(
            "  phase {} → {}{}",
            t.from.as_str(),
            t.to.as_str(),
            if t.forced { " (forced)" } else { "" }
        ),
        ConversationEvent::Turn {
            turn,
            record,
            side_a_engagement,
            side_b_engagement,
        } => format!(
            "[{turn:>2}] {:<6} {} (A {side_a_engagement:.2} / B {side_b_engagement:.2})",
            record.speaker,
            truncate(&record.message.replace('\n', " "), 160)
        ),
        ConversationEvent::Ended { outcome, turns, .. } => {
            format!("■ {outcome} after {turns} turns")
        }
    }
}

pub async fn execute(args: ChatArgs, runtime: &Runtime, json: bool) -> Result<()> {
    let side_a = load_persona(&args.conversation.persona_a)?;
    let side_b = load_persona(&args.conversation.persona_b)?;
    let config = args.conversation.apply(&runtime.config.conversation);

    let result = if args.stream {
        stream_conversation(runtime, &side_a, &side_b, config, json).await?
    } else {
        run_conversation(runtime, &side_a, &side_b, config, json).await?
    };

    if let Some(ref path) = args.out {
        write_json(path, &result)?;
    }

    let out = ChatOutput::new(&side_a, &side_b, result);
    if args.stream {
        if !json {
            println!("{}", out.summary());
        }
    } else {
        output(&out, json);
    }
    Ok(())
}
