//! sflcast — document-to-persona dialogue studio.
//!
//! Analyze documents into SFL personas, then generate and refine a
//! two-speaker dialogue between any two of them. All session state is
//! in-memory for the lifetime of the process.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use sflcast::analysis::analyze_document;
use sflcast::config::StudioConfig;
use sflcast::extract::extract_text;
use sflcast::logging;
use sflcast::providers::gemini::GeminiClient;
use sflcast::providers::ModelCatalog;
use sflcast::studio::{self, Studio};

#[derive(Debug, Parser)]
#[command(name = "sflcast", about = "SFL document-to-persona dialogue studio", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the interactive studio session (default).
    Studio,
    /// Analyze one document and print the analysis result as JSON.
    Analyze {
        /// Path to a .txt or .md document.
        file: PathBuf,
    },
    /// List generation-capable models.
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` values participate in the usual precedence: env > file > defaults.
    let _ = dotenvy::dotenv();
    let config = StudioConfig::load().context("failed to load configuration")?;

    match Cli::parse().command.unwrap_or(Command::Studio) {
        Command::Studio => run_studio(config).await,
        Command::Analyze { file } => run_analyze(config, &file).await,
        Command::Models => run_models(config).await,
    }
}

async fn run_studio(config: StudioConfig) -> Result<()> {
    let _guard = logging::init_studio(std::path::Path::new(&config.paths.logs_dir))?;
    let client = Arc::new(build_client(&config)?);
    info!(model = %config.llm.model, "studio starting");

    let mut studio = Studio::new(
        client.clone(),
        client,
        config.llm.thinking_budget,
    );
    studio::run(&mut studio).await
}

async fn run_analyze(config: StudioConfig, file: &std::path::Path) -> Result<()> {
    logging::init_cli();
    let text = extract_text(file)?;
    let client = build_client(&config)?;
    let result = analyze_document(&client, &text, config.llm.thinking_budget).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_models(config: StudioConfig) -> Result<()> {
    logging::init_cli();
    let client = build_client(&config)?;
    match client.list_models().await {
        Ok(models) => {
            for model in models {
                println!("{model}");
            }
            Ok(())
        }
        // Listing failure is non-fatal elsewhere in the studio; as a
        // subcommand it is the whole job, so report and exit non-zero.
        Err(e) => Err(anyhow::anyhow!("failed to load models: {e}")),
    }
}

fn build_client(config: &StudioConfig) -> Result<GeminiClient> {
    let api_key = config.require_api_key()?;
    Ok(GeminiClient::new(
        config.llm.base_url.clone(),
        api_key,
        config.llm.model.clone(),
    ))
}
