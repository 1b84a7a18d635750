//! contentsync
//!
//! Reconciles a content store with a remote data source: creates objects
//! for new records, updates stale ones, and removes objects that vanished
//! from the source.
//!
//! Usage:
//!   contentsync --source-path items.json --store content.db
//!   contentsync --source-url https://example.org/api/items --dry-run -v

use anyhow::Result;
use clap::Parser;
use contentsync_cli::{Cli, build_engine, exit_code, open_store};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_target(false)
        .compact()
        .init();

    let location = cli.source_location()?;
    let store = open_store(cli.store.as_deref())?;
    let engine = build_engine(&cli, store)?;

    info!("contentsync {} starting", env!("CARGO_PKG_VERSION"));
    let summary = engine.run(&location).await;

    println!("{}", summary.report.summary);
    if let Some(location) = &summary.report_location {
        println!("Report: {location}");
    }
    std::process::exit(exit_code(&summary));
}
