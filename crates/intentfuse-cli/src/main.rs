//! intentfuse CLI: intent classification with ensemble/transformer arbitration.

mod batch;
mod inspect;
mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use intentfuse_core::config::{DEFAULT_PROB_DIFF_THRESHOLD, DEFAULT_UNCERTAINTY_THRESHOLD};
use intentfuse_core::{ArbiterConfig, ClassifyRequest, ClassifyResponse};

use crate::pipeline::{ModelArgs, OracleArgs};

#[derive(Parser)]
#[command(name = "intentfuse", version, about = "Intent classification with oracle arbitration")]
struct Cli {
    /// Maximum probability gap to the top label for a label to stay ambiguous.
    #[arg(
        long,
        global = true,
        env = "INTENTFUSE_PROB_DIFF_THRESHOLD",
        default_value_t = DEFAULT_PROB_DIFF_THRESHOLD
    )]
    prob_diff_threshold: f64,

    /// Reserved secondary uncertainty threshold.
    #[arg(
        long,
        global = true,
        env = "INTENTFUSE_UNCERTAINTY_THRESHOLD",
        default_value_t = DEFAULT_UNCERTAINTY_THRESHOLD
    )]
    uncertainty_threshold: f64,

    /// Reject oracle answers that are not canonical labels.
    #[arg(long, global = true, env = "INTENTFUSE_VALIDATE_ORACLE")]
    validate_oracle: bool,

    #[command(flatten)]
    models: ModelArgs,

    #[command(flatten)]
    oracle: OracleArgs,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn arbiter_config(&self) -> ArbiterConfig {
        ArbiterConfig {
            prob_diff_threshold: self.prob_diff_threshold,
            uncertainty_threshold: self.uncertainty_threshold,
            validate_oracle: self.validate_oracle,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one query and print the response JSON.
    Classify {
        /// Query text.
        #[arg(long)]
        text: String,

        /// Strategy: Ensemble, Roberta, Chatgpt; anything else arbitrates.
        #[arg(long = "type", default_value = "")]
        kind: String,
    },

    /// Classify a JSONL file of `{ "text", "type" }` requests, one response per line.
    Batch {
        /// Path to the JSONL request file.
        #[arg(long)]
        input: PathBuf,

        /// Maximum requests in flight at once.
        #[arg(long, env = "INTENTFUSE_BATCH_CONCURRENCY", default_value_t = 4)]
        concurrency: usize,
    },

    /// Run only the ambiguity resolver on a probability distribution.
    Resolve {
        /// JSON object of label to probability, e.g. '{"Factual":0.45,"Multi-Part":0.4}'.
        #[arg(long)]
        probs: String,

        /// Gap threshold; defaults to --prob-diff-threshold.
        #[arg(long)]
        threshold: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("intentfuse v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Classify { text, kind } => {
            let query = ClassifyRequest {
                text: text.clone(),
                kind: kind.clone(),
            }
            .into_query()?;
            let arbiter = pipeline::build_arbiter(&cli.models, &cli.oracle, &cli.arbiter_config())?;
            let outcome = arbiter.run(&query).await?;
            let response = ClassifyResponse {
                prediction: outcome.into_prediction(),
            };
            println!("{}", serde_json::to_string(&response)?);
        }

        Commands::Batch { input, concurrency } => {
            let content = std::fs::read_to_string(input)
                .with_context(|| format!("reading {}", input.display()))?;
            let lines: Vec<String> = content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect();
            let arbiter = pipeline::build_arbiter(&cli.models, &cli.oracle, &cli.arbiter_config())?;
            for line in batch::classify_lines(Arc::new(arbiter), lines, *concurrency).await {
                println!("{line}");
            }
        }

        Commands::Resolve { probs, threshold } => {
            let threshold = threshold.unwrap_or(cli.prob_diff_threshold);
            println!("{}", inspect::resolve_json(probs, threshold)?);
        }
    }

    Ok(())
}
