//! devcrew: run the agent pipeline over one requirement from the terminal.
//!
//!   devcrew "Create a calculator application"
//!   devcrew --requirement-file spec.txt --output out/calculator
//!   devcrew --config devcrew.toml "Build a todo list manager"
//!
//! Requires GROQ_API_KEY (or --api-key, or api_key in the config file).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;

use devcrew::config::FileConfig;
use devcrew::llm::LlmClient;
use devcrew::output;
use devcrew::pipeline::Pipeline;
use devcrew::store::ResultStore;

#[derive(Parser)]
#[command(name = "devcrew", about = "Turn a requirement into code, docs, tests and a deploy script")]
struct Args {
    /// Requirement text
    requirement: Option<String>,

    /// Read the requirement from a file instead
    #[arg(long, conflicts_with = "requirement")]
    requirement_file: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for generated artifacts
    #[arg(long)]
    output: Option<PathBuf>,

    /// Model to use
    #[arg(long)]
    model: Option<String>,

    /// OpenAI-compatible endpoint base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Per-call timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Maximum review rounds before giving up on approval
    #[arg(long)]
    max_review_iterations: Option<u32>,

    /// API key (or set GROQ_API_KEY env var)
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl Args {
    fn overrides(&self) -> FileConfig {
        FileConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            temperature: self.temperature,
            timeout_secs: self.timeout,
            max_review_iterations: self.max_review_iterations,
            output_dir: self.output.clone(),
        }
    }

    async fn requirement(&self) -> Result<String> {
        let text = match (&self.requirement, &self.requirement_file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
            (None, None) => anyhow::bail!("Give a requirement or --requirement-file"),
        };
        let text = text.trim().to_string();
        anyhow::ensure!(!text.is_empty(), "Requirement is empty");
        Ok(text)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devcrew=info".into()),
        )
        .init();

    let args = Args::parse();

    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = file.merge(args.overrides()).resolve()?;
    let requirement = args.requirement().await?;

    let llm = LlmClient::new(&config.model).context("Failed to build HTTP client")?;
    tracing::info!(
        model = %llm.model(),
        endpoint = %config.model.base_url,
        max_review_iterations = config.max_review_iterations,
        "Starting devcrew"
    );

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling the current model call");
            let _ = cancel_tx.send(true);
        }
    });

    let pipeline = Pipeline::new(Arc::new(llm), config).with_cancel(cancel_rx);
    let output_dir = pipeline.config().output_dir.clone();
    let store = ResultStore::create(&output_dir).await?;

    match pipeline.run(&requirement).await {
        Ok(result) => {
            for line in output::summary_lines(&result) {
                println!("{line}");
            }
            if let Some(code) = &result.final_code {
                println!("\nFinal code:\n{}", output::preview(code, 15));
            }
            store.save(&result).await?;
            println!("\nAll files saved to {}/", output_dir.display());
            Ok(())
        }
        Err(e) => {
            tracing::error!(stage = %e.stage, error = %e.source, "Pipeline failed");
            for line in output::summary_lines(&e.partial) {
                println!("{line}");
            }
            if !e.partial.keys().is_empty() {
                store.save(&e.partial).await?;
                println!("Partial results saved to {}/", output_dir.display());
            }
            Err(e.into())
        }
    }
}
