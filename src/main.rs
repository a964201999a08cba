//! Canary binary: performs a single run and exits

use canary::{Canary, Config, Result, TargetSet};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about = "Probe a set of named URLs once and record the results")]
struct Args {
    /// JSON object of target name to URL, optionally wrapped as {"urls": {...}}
    #[arg(long, env = "CANARY_TARGETS")]
    targets: Option<String>,

    /// File containing the targets JSON, used when --targets is not given
    #[arg(long)]
    targets_file: Option<PathBuf>,

    /// Number of targets probed at once
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() {
    initialize_tracing();

    info!("Starting canary v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Canary run failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(concurrency) = args.concurrency {
        config.probe_concurrency = concurrency;
    }

    let targets = match (&args.targets, &args.targets_file) {
        (Some(json), _) => TargetSet::from_json(json)?,
        (None, Some(path)) => TargetSet::from_json(&tokio::fs::read_to_string(path).await?)?,
        (None, None) => {
            info!("No targets supplied, using defaults");
            TargetSet::default_targets()
        }
    };

    let canary = Canary::new(config)?;
    canary.run(&targets).await;

    Ok(())
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_and_targets_file_together() {
        let args = Args::try_parse_from([
            "canary",
            "--targets",
            r#"{"A": "https://a/"}"#,
            "--targets-file",
            "targets.json",
        ])
        .unwrap();

        assert!(args.targets.is_some());
        assert_eq!(args.targets_file, Some(PathBuf::from("targets.json")));
    }
}
