//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::chat::ChatArgs;
use super::commands::generate::{GenerateArgs, GenerateBatchArgs};
use super::commands::index::IndexArgs;
use super::commands::match_cmd::MatchArgs;
use super::commands::review::ReviewArgs;

#[derive(Parser)]
#[command(name = "matchwright")]
#[command(about = "Matchwright - persona conversation simulator and match reviewer", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file, replacing `.matchwright/config.yaml`
    #[arg(short, long, global = true, env = "MATCHWRIGHT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a conversation between two personas
    Chat(ChatArgs),

    /// Run (or load) a conversation and review it for a next step
    Review(ReviewArgs),

    /// Generate one persona from profile and resume text
    Generate(GenerateArgs),

    /// Generate personas for every person folder in a directory
    GenerateBatch(GenerateBatchArgs),

    /// Index a directory of personas into the vector store
    Index(IndexArgs),

    /// Rank indexed personas against a query persona
    Match(MatchArgs),
}
