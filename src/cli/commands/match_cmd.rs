//! `match`: rank indexed personas against a query persona.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::commands::index::resolve_namespace;
use crate::cli::output::table::base_table;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::cli::runtime::{load_persona, load_personas_dir, Runtime};
use crate::domain::models::VectorStoreProvider;
use crate::services::{MatchCandidate, PersonaIndex, PersonaMatcher};

#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Query persona JSON file
    pub persona: PathBuf,

    /// Number of candidates to return
    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    /// Weight of needs→personality against personality→needs, clamped to [0, 1]
    #[arg(long, default_value_t = 0.5)]
    pub w12: f64,

    /// Base namespace; defaults to the configured one
    #[arg(long)]
    pub namespace: Option<String>,

    /// Index this directory of personas before matching
    #[arg(long)]
    pub candidates: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct MatchOutput {
    pub query: String,
    pub w12: f64,
    pub matches: Vec<MatchCandidate>,
}

impl CommandOutput for MatchOutput {
    fn to_human(&self) -> String {
        if self.matches.is_empty() {
            return format!("No matches found for '{}'.", self.query);
        }
        let mut table = base_table(&["#", "ID", "Score", "Needs", "Personality"]);
        for (rank, candidate) in self.matches.iter().enumerate() {
            table.add_row(vec![
                (rank + 1).to_string(),
                candidate.id.clone(),
                format!("{:.3}", candidate.score),
                truncate(&candidate.needs, 60),
                truncate(&candidate.personality, 60),
            ]);
        }
        format!("Top matches for '{}' (w12 = {:.2})\n{table}", self.query, self.w12)
    }
}

pub async fn execute(args: MatchArgs, runtime: &Runtime, json: bool) -> Result<()> {
    let in_memory = runtime.config.vector_store.provider == VectorStoreProvider::Memory;
    if in_memory && args.candidates.is_none() {
        bail!("The in-memory vector store starts empty; pass --candidates <dir>");
    }

    let query = load_persona(&args.persona)?;
    let namespace =
        resolve_namespace(args.namespace.as_deref(), &runtime.config.vector_store.namespace);
    let embeddings = runtime.embeddings()?;
    let store = runtime.vector_store()?;

    if let Some(ref dir) = args.candidates {
        let personas = load_personas_dir(dir)?;
        PersonaIndex::new(
            embeddings.clone(),
            store.clone(),
            namespace.clone(),
            runtime.config.vector_store.upsert_batch_size,
        )
        .upsert_all(&personas)
        .await
        .context("Failed to index candidates")?;
    }

    let w12 = args.w12.clamp(0.0, 1.0);
    let matches = PersonaMatcher::new(embeddings, store, namespace)
        .top_matches(&query, args.top_k, w12)
        .await
        .context("Matching failed")?;

    output(
        &MatchOutput {
            query: query.id,
            w12,
            matches,
        },
        json,
    );
    Ok(())
}
