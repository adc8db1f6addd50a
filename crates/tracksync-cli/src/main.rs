use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tracksync_core::app::{App, AppBuilder};
use tracksync_core::config::SyncConfig;
use tracksync_core::impls::InMemoryStore;

#[derive(Parser, Debug)]
#[command(name = "tracksync")]
#[command(about = "Sync GitHub issues with Pivotal Tracker stories")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay recorded webhook deliveries through the sync engine
    Replay {
        /// JSON files holding `{"issue": ..., "sender": ...}`
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Recompute ETAs from the current backlog afterwards
        #[arg(long)]
        eta: bool,

        /// Post pending ETA comments afterwards
        #[arg(long)]
        comments: bool,
    },
}

/// One recorded `issues` event; other keys are ignored.
#[derive(Debug, Deserialize)]
struct Delivery {
    issue: Value,
    sender: Value,
}

fn read_delivery(path: &Path) -> Result<Delivery> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a webhook delivery", path.display()))
}

async fn replay(app: &App, files: &[PathBuf], eta: bool, comments: bool) -> Result<()> {
    for path in files {
        let delivery = read_delivery(path)?;
        let id = app.enqueue_webhook(delivery.issue, delivery.sender).await?;
        info!(record = %id, file = %path.display(), "delivery enqueued");
    }

    let reaped = app.reaper().reap().await?;
    let processed = app.consumer().sync().await?;
    let counts = app.queue_counts().await?;
    info!(
        processed,
        released = reaped.released.len(),
        stuck = reaped.stuck.len(),
        todo = counts.todo,
        processing = counts.processing,
        done = counts.done,
        "webhooks processed"
    );

    if eta {
        let updated = app.eta_scheduler().compute_eta().await?;
        info!(updated, "etas recomputed");
    }
    if comments {
        let report = app.comment_dispatcher().manage_comments().await?;
        info!(
            posted = report.posted,
            failed = report.failed.len(),
            "comments dispatched"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracksync=info,tracksync_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env().context("invalid configuration")?;
    let app = AppBuilder::new()
        .store(Arc::new(InMemoryStore::new()))
        .remote_clients(&config)?
        .build()?;

    match cli.command {
        Command::Replay {
            files,
            eta,
            comments,
        } => replay(&app, &files, eta, comments).await,
    }
}
