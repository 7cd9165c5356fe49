pub mod commands;
pub mod output;
pub mod runtime;
pub mod types;

pub use runtime::Runtime;
pub use types::{Cli, Commands};

use serde_json::json;

/// Dispatch a parsed command.
pub async fn run(command: Commands, runtime: &Runtime, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Chat(args) => commands::chat::execute(args, runtime, json).await,
        Commands::Review(args) => commands::review::execute(args, runtime, json).await,
        Commands::Generate(args) => commands::generate::execute(args, runtime, json).await,
        Commands::GenerateBatch(args) => {
            commands::generate::execute_batch(args, runtime, json).await
        }
        Commands::Index(args) => commands::index::execute(args, runtime, json).await,
        Commands::Match(args) => commands::match_cmd::execute(args, runtime, json).await,
    }
}

/// Report a command failure and exit with status 1.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        println!(
            "{}",
            json!({
                "error": err.to_string(),
                "causes": chain.get(1..).unwrap_or_default(),
            })
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
