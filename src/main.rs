use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;

use traffic_signal::{validate, Availability, Config, TrafficPredictor};

/// Green-light durations for a four-lane intersection batch.
#[derive(Parser, Debug)]
#[command(name = "traffic_signal", version, about, long_about = None)]
struct Cli {
    /// JSON config file (also read from TRAFFIC_CONFIG)
    #[arg(short, long, global = true, env = "TRAFFIC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Predict green times for one batch of four lane readings
    Predict {
        /// Batch JSON file; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Run the strict field validator over a batch
    Validate {
        /// Batch JSON file; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Load the artifacts and report whether predictions can be served
    Status,
}

fn read_batch(input: Option<&Path>) -> Result<Value> {
    let txt = match input {
        Some(p) => fs::read_to_string(p)
            .with_context(|| format!("failed to read batch at {}", p.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read batch from stdin")?;
            buf
        }
    };
    serde_json::from_str(&txt).context("batch is not valid json")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict { input } => {
            let cfg = Config::load(cli.config.as_deref())?;
            let predictor = TrafficPredictor::load(&cfg);
            let payload = read_batch(input.as_deref())?;

            match predictor.predict_batch(&payload) {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                    Ok(())
                }
                Err(e) => {
                    let body = json!({ "error": { "kind": e.kind(), "message": e.to_string() } });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                    Err(e.into())
                }
            }
        }
        Commands::Validate { input } => {
            let payload = read_batch(input.as_deref())?;
            let errors = validate::validate_batch(&payload);
            println!("{}", serde_json::to_string_pretty(&json!({ "errors": errors }))?);
            if errors.is_empty() {
                Ok(())
            } else {
                anyhow::bail!("{} validation error(s)", errors.len())
            }
        }
        Commands::Status => {
            let cfg = Config::load(cli.config.as_deref())?;
            let predictor = TrafficPredictor::load(&cfg);
            let (lo, hi) = predictor.policy().published_range();
            match predictor.availability() {
                Availability::Ready => {
                    println!(
                        "{}",
                        json!({ "status": "ready", "published_range": [lo, hi] })
                    );
                    Ok(())
                }
                Availability::Unavailable { reason } => {
                    println!("{}", json!({ "status": "unavailable", "reason": reason }));
                    anyhow::bail!("artifacts unavailable")
                }
            }
        }
    }
}
