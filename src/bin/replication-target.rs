// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Command-line entry point.
//!
//! Reads messages from stdin, replicates records into the configured store,
//! and prints the final checkpoint (if any) as one JSON line on stdout.
//! Logs go to stderr so they never mix with the checkpoint output.

use anyhow::{Context, Result};
use clap::Parser;
use replication_target::{emit_state, RedisKvStore, ReplicationTarget, TargetConfig};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "replication-target")]
#[command(version)]
#[command(about = "Replicate stream records into a versioned key-value store", long_about = None)]
struct Cli {
    /// JSON config file (store URL, credentials, bucket, key prefix)
    ///
    /// Can also be set via REPLICATION_TARGET_CONFIG environment variable
    #[arg(short = 'c', long, env = "REPLICATION_TARGET_CONFIG")]
    config: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = TargetConfig::load(cli.config.as_deref()).context("load config")?;
    let store = RedisKvStore::connect(&config)
        .await
        .context("connect to key-value store")?;

    let target = ReplicationTarget::new(Arc::new(store), &config);
    let summary = target
        .run(BufReader::new(tokio::io::stdin()))
        .await
        .context("replicate messages")?;

    let mut stdout = tokio::io::stdout();
    emit_state(&mut stdout, summary.state.as_ref())
        .await
        .context("emit state")?;

    tracing::debug!("Exiting normally");
    Ok(())
}
