//! `index`: embed and upsert every persona in a directory.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::progress::{create_spinner, ProgressBarExt};
use crate::cli::output::{output, CommandOutput};
use crate::cli::runtime::{load_personas_dir, Runtime};
use crate::domain::models::VectorStoreProvider;
use crate::services::{sanitize_index_name, PersonaIndex};

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Directory of persona JSON files (searched recursively)
    pub dir: PathBuf,

    /// Base namespace; defaults to the configured one
    #[arg(long)]
    pub namespace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexOutput {
    pub namespace: String,
    pub personas: usize,
    pub vectors: usize,
}

impl CommandOutput for IndexOutput {
    fn to_human(&self) -> String {
        format!(
            "Indexed {} persona(s) as {} vector(s) into '{}__needs' / '{}__personality'",
            self.personas, self.vectors, self.namespace, self.namespace
        )
    }
}

/// Resolve the base namespace: a command-line value is normalized, the
/// configured one is used as is.
pub fn resolve_namespace(flag: Option<&str>, configured: &str) -> String {
    flag.map_or_else(|| configured.to_string(), sanitize_index_name)
}

pub async fn execute(args: IndexArgs, runtime: &Runtime, json: bool) -> Result<()> {
    if runtime.config.vector_store.provider == VectorStoreProvider::Memory {
        bail!("The in-memory vector store does not persist; use `match --candidates` instead");
    }

    let personas = load_personas_dir(&args.dir)?;
    if personas.is_empty() {
        bail!("No persona JSON files found in {}", args.dir.display());
    }
    let namespace =
        resolve_namespace(args.namespace.as_deref(), &runtime.config.vector_store.namespace);

    let index = PersonaIndex::new(
        runtime.embeddings()?,
        runtime.vector_store()?,
        namespace.clone(),
        runtime.config.vector_store.upsert_batch_size,
    );

    let spinner = create_spinner(format!("Indexing {} personas", personas.len()), json);
    let report = match index.upsert_all(&personas).await {
        Ok(report) => {
            spinner.finish_success(format!("{} vectors", report.vectors));
            report
        }
        Err(e) => {
            spinner.finish_error("indexing failed");
            return Err(e).context("Persona indexing failed");
        }
    };

    output(
        &IndexOutput {
            namespace,
            personas: report.personas,
            vectors: report.vectors,
        },
        json,
    );
    Ok(())
}
