//! Matchwright CLI entry point.

use anyhow::Context;
use clap::Parser;

use matchwright::cli::{handle_error, run, Cli, Runtime};
use matchwright::infrastructure::config::ConfigLoader;
use matchwright::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
    .context("Failed to load configuration");
    let config = match config {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    // held for the life of the process so the file writer flushes on exit
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let runtime = Runtime::new(config);
    if let Err(err) = run(cli.command, &runtime, cli.json).await {
        handle_error(err, cli.json);
    }
}
