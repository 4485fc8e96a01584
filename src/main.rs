//! multi-llm-debate - Multi-Agent LLM Debate Harness
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use multi_llm_debate::eval::load_questions;
use multi_llm_debate::llm::ProviderRegistry;
use multi_llm_debate::{Config, EvalRunner, JsonlSink, Question};
use tracing::info;

/// Multi-agent LLM debate harness
#[derive(Parser, Debug)]
#[command(name = "multi-llm-debate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ~/.config/multi-llm-debate/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// JSON lines dataset of questions
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Output JSON lines file for debate outcomes
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Maximum debate rounds
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Maximum concurrent agent calls per round
    #[arg(long)]
    max_workers: Option<usize>,

    /// Re-run questions that already have results
    #[arg(long)]
    overwrite: bool,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Single question mode (non-dataset)
    #[arg(long, short = 'q')]
    question: Option<String>,

    /// Passage for --question
    #[arg(long, requires = "question")]
    passage: Option<String>,

    /// Write the default config file and exit
    #[arg(long)]
    init_config: bool,

    /// List the models each configured provider serves and exit
    #[arg(long)]
    list_models: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    if args.init_config {
        let path = Config::default().save()?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    // Build configuration
    let mut config = match args.config {
        Some(ref path) => {
            let _ = dotenvy::dotenv();
            let mut config = Config::load_from(path)?;
            config.apply_env();
            config
        }
        None => Config::load(),
    };

    // Apply CLI overrides
    if let Some(max_rounds) = args.max_rounds {
        config.debate.max_rounds = max_rounds;
    }
    if let Some(max_workers) = args.max_workers {
        config.debate.max_workers = max_workers;
    }
    if let Some(ref output) = args.output {
        config.eval.output = output.clone();
    }
    if args.overwrite {
        config.eval.overwrite = true;
    }

    config.validate()?;
    info!(
        agents = config.agent_count(),
        max_rounds = config.debate.max_rounds,
        mode = ?config.debate.aggregation_mode,
        "configuration loaded"
    );

    if args.list_models {
        let registry = ProviderRegistry::from_config(&config)?;
        for (provider, client) in registry.providers() {
            match client.list_models().await {
                Ok(models) => {
                    println!("{} ({}):", provider, client.name());
                    for model in models {
                        println!("  {}", model);
                    }
                }
                Err(e) => eprintln!("{}: {}", provider, e),
            }
        }
        return Ok(());
    }

    let runner = EvalRunner::new(config.clone())?;

    // Single question mode
    if let Some(text) = args.question {
        let mut question = Question::new("cli", text);
        question.passage = args.passage;

        let outcome = runner.run_one(question).await?;
        println!("{}", serde_json::to_string_pretty(&outcome.result)?);
        return Ok(());
    }

    let dataset = args
        .dataset
        .context("either --dataset or --question is required")?;
    let questions = load_questions(&dataset)
        .with_context(|| format!("failed to load dataset {}", dataset.display()))?;

    let mut sink = JsonlSink::open(&config.eval.output, config.eval.overwrite)?;
    let summary = runner.run(questions, &mut sink).await?;

    // Print execution summary
    println!("\nExecution Summary:");
    println!("{}", "-".repeat(50));
    println!("Total entries: {}", summary.total);
    println!("Successfully processed: {}", summary.processed);
    println!("Skipped (existing results): {}", summary.skipped);
    println!("Failed entries: {}", summary.failed);
    println!("Inconclusive: {}", summary.inconclusive);
    println!("With partial failures: {}", summary.partial_failures);
    println!("Success rate: {:.2}%", summary.success_rate());
    println!("Results written to {}", sink.path().display());

    Ok(())
}
