//! `generate` and `generate-batch`: build personas from profile and resume text.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cli::output::progress::{create_progress_bar, ProgressBarExt};
use crate::cli::output::table::base_table;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::cli::runtime::{write_json, Runtime};
use crate::domain::errors::DomainError;
use crate::domain::models::Persona;
use crate::services::{run_bounded, PersonaRequest};

const ERRORS_DIR: &str = "_errors";

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Entity id for the generated persona
    #[arg(long)]
    pub id: String,

    /// Profile text file
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Resume text file
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Write the persona JSON to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct GenerateBatchArgs {
    /// Directory of person folders, each holding profile.txt and/or resume.txt
    pub src_dir: PathBuf,

    /// Directory that receives `<folder>.json` personas
    pub out_dir: PathBuf,

    /// Only folders named `<batch_id>__*`
    #[arg(long)]
    pub batch_id: Option<String>,

    /// Process at most this many folders
    #[arg(long)]
    pub limit: Option<usize>,

    /// Regenerate personas that already exist in the output directory
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
pub struct PersonaOutput {
    #[serde(flatten)]
    pub persona: Persona,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<PathBuf>,
}

impl CommandOutput for PersonaOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("ID:          {}", self.persona.id),
            format!("Needs:       {}", self.persona.needs),
            format!("Personality: {}", self.persona.personality),
        ];
        if let Some(ref path) = self.written_to {
            lines.push(format!("\nWritten to {}", path.display()));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub folder: String,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Written,
    Skipped,
    Empty,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct BatchOutput {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    pub items: Vec<BatchItem>,
}

impl CommandOutput for BatchOutput {
    fn to_human(&self) -> String {
        let summary = format!(
            "Written: {}  Skipped: {}  Failed: {}",
            self.written, self.skipped, self.failed
        );
        let notable: Vec<_> = self
            .items
            .iter()
            .filter(|i| i.status != BatchStatus::Written)
            .collect();
        if notable.is_empty() {
            return summary;
        }

        let mut table = base_table(&["Folder", "Status", "Error"]);
        for item in notable {
            table.add_row(vec![
                item.folder.clone(),
                format!("{:?}", item.status).to_lowercase(),
                truncate(item.error.as_deref().unwrap_or_default(), 80),
            ]);
        }
        format!("{table}\n{summary}")
    }
}

fn read_optional(path: &Path) -> Option<String> {
    std::fs::read(path)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .filter(|text| !text.trim().is_empty())
}

pub async fn execute(args: GenerateArgs, runtime: &Runtime, json: bool) -> Result<()> {
    let profile_text = args.profile.as_deref().and_then(read_optional);
    let resume_text = args.resume.as_deref().and_then(read_optional);
    if profile_text.is_none() && resume_text.is_none() {
        bail!("Provide a non-empty --profile or --resume file");
    }

    let generator = runtime.generator()?;
    let persona = generator
        .generate(&PersonaRequest {
            entity_id: args.id,
            profile_text,
            resume_text,
        })
        .await
        .context("Persona generation failed")?;

    if let Some(ref path) = args.out {
        write_json(path, &persona)?;
    }
    output(
        &PersonaOutput {
            persona,
            written_to: args.out,
        },
        json,
    );
    Ok(())
}

/// Person folders under `src`, filtered by batch prefix and limit.
fn select_folders(src: &Path, batch_id: Option<&str>, limit: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut folders: Vec<PathBuf> = std::fs::read_dir(src)
        .with_context(|| format!("Failed to read {}", src.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();

    if let Some(batch_id) = batch_id.filter(|b| !b.eq_ignore_ascii_case("all")) {
        let prefix = format!("{batch_id}__");
        folders.retain(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        });
    }
    if let Some(limit) = limit.filter(|l| *l > 0) {
        folders.truncate(limit);
    }
    Ok(folders)
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Keep the source text of a failed generation next to the output.
fn dump_failure(out_dir: &Path, stem: &str, request: &PersonaRequest) {
    let dir = out_dir.join(ERRORS_DIR);
    let written = std::fs::create_dir_all(&dir).and_then(|()| {
        std::fs::write(
            dir.join(format!("{stem}__profile.txt")),
            request.profile_text.as_deref().unwrap_or_default(),
        )?;
        std::fs::write(
            dir.join(format!("{stem}__resume.txt")),
            request.resume_text.as_deref().unwrap_or_default(),
        )
    });
    if let Err(e) = written {
        warn!(folder = stem, error = %e, "Could not save failed generation input");
    }
}

pub async fn execute_batch(args: GenerateBatchArgs, runtime: &Runtime, json: bool) -> Result<()> {
    if !args.src_dir.is_dir() {
        bail!("Source directory not found: {}", args.src_dir.display());
    }
    let folders = select_folders(&args.src_dir, args.batch_id.as_deref(), args.limit)?;
    info!(
        src = %args.src_dir.display(),
        selected = folders.len(),
        batch_id = args.batch_id.as_deref().unwrap_or("ALL"),
        "Selected person folders"
    );

    let mut items = Vec::with_capacity(folders.len());
    let mut pending = Vec::new();
    for folder in folders {
        let stem = folder_name(&folder);
        if !args.overwrite && args.out_dir.join(format!("{stem}.json")).exists() {
            items.push(BatchItem {
                folder: stem,
                status: BatchStatus::Skipped,
                error: None,
            });
            continue;
        }
        let request = PersonaRequest {
            entity_id: stem.clone(),
            profile_text: read_optional(&folder.join("profile.txt")),
            resume_text: read_optional(&folder.join("resume.txt")),
        };
        if request.profile_text.is_none() && request.resume_text.is_none() {
            warn!(folder = %folder.display(), "No profile or resume found");
            items.push(BatchItem {
                folder: stem,
                status: BatchStatus::Empty,
                error: None,
            });
            continue;
        }
        pending.push(request);
    }

    let ids: Vec<String> = pending.iter().map(|r| r.entity_id.clone()).collect();
    let generator = runtime.generator()?;
    let progress = create_progress_bar(pending.len() as u64, json);
    let job_progress = progress.clone();
    let out_dir = args.out_dir.clone();

    let results = run_bounded(pending, runtime.config.batch.concurrency, move |request| {
        let generator = generator.clone();
        let progress = job_progress.clone();
        let out_dir = out_dir.clone();
        async move {
            let result = generator.generate(&request).await;
            let outcome = match result {
                Ok(persona) => {
                    let path = out_dir.join(format!("{}.json", request.entity_id));
                    write_json(&path, &persona)
                        .map_err(|e| DomainError::Serialization(format!("{e:#}")))
                }
                Err(e) => {
                    dump_failure(&out_dir, &request.entity_id, &request);
                    Err(e)
                }
            };
            progress.inc(1);
            outcome
        }
    })
    .await;

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed == 0 {
        progress.finish_success("batch complete");
    } else {
        progress.finish_error(format!("{failed} failed"));
    }

    for (folder, result) in ids.into_iter().zip(results) {
        items.push(match result {
            Ok(()) => BatchItem {
                folder,
                status: BatchStatus::Written,
                error: None,
            },
            Err(e) => BatchItem {
                folder,
                status: BatchStatus::Failed,
                error: Some(e.to_string()),
            },
        });
    }

    let count = |status| items.iter().filter(|i| i.status == status).count();
    let report = BatchOutput {
        written: count(BatchStatus::Written),
        skipped: count(BatchStatus::Skipped),
        failed: count(BatchStatus::Failed),
        items,
    };
    output(&report, json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(root: &Path, name: &str, profile: Option<&str>) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        if let Some(text) = profile {
            std::fs::write(dir.join("profile.txt"), text).unwrap();
        }
    }

    #[test]
    fn test_select_folders_filters_batch_and_limit() {
        let root = tempfile::tempdir().unwrap();
        person(root.path(), "001__alice", Some("a"));
        person(root.path(), "001__bob", Some("b"));
        person(root.path(), "002__carol", Some("c"));
        std::fs::write(root.path().join("stray.txt"), "x").unwrap();

        let all = select_folders(root.path(), None, None).unwrap();
        assert_eq!(all.len(), 3);

        let batch = select_folders(root.path(), Some("001"), None).unwrap();
        let names: Vec<_> = batch.iter().map(|p| folder_name(p)).collect();
        assert_eq!(names, vec!["001__alice", "001__bob"]);

        assert_eq!(select_folders(root.path(), Some("ALL"), Some(1)).unwrap().len(), 1);
        assert_eq!(select_folders(root.path(), None, Some(0)).unwrap().len(), 3);
    }

    #[test]
    fn test_read_optional_treats_blank_as_missing() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("profile.txt");
        assert!(read_optional(&path).is_none());
        std::fs::write(&path, "  \n").unwrap();
        assert!(read_optional(&path).is_none());
        std::fs::write(&path, "Engineer").unwrap();
        assert_eq!(read_optional(&path).as_deref(), Some("Engineer"));
    }

    #[test]
    fn test_dump_failure_writes_inputs() {
        let root = tempfile::tempdir().unwrap();
        let request = PersonaRequest {
            entity_id: "001__alice".to_string(),
            profile_text: Some("profile".to_string()),
            resume_text: None,
        };
        dump_failure(root.path(), "001__alice", &request);
        let dir = root.path().join(ERRORS_DIR);
        assert_eq!(
            std::fs::read_to_string(dir.join("001__alice__profile.txt")).unwrap(),
            "profile"
        );
        assert!(dir.join("001__alice__resume.txt").exists());
    }

    #[test]
    fn test_batch_output_hides_written_rows() {
        let report = BatchOutput {
            written: 1,
            skipped: 0,
            failed: 0,
            items: vec![BatchItem {
                folder: "001__alice".to_string(),
                status: BatchStatus::Written,
                error: None,
            }],
        };
        assert_eq!(report.to_human(), "Written: 1  Skipped: 0  Failed: 0");
    }
}
