//! Argument parsing and wiring for the `contentsync` binary.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser};
use contentsync_store::{ContentStore, MemoryStore, SqliteStore};
use contentsync_sync::{
    DefaultSourceProvider, DocumentMapper, DocumentMapperConfig, EngineConfig, FileReportSink,
    HttpConfig, ReportSink, ResilientClient, RunSummary, SourceLocation, StoreReportSink, SyncEngine,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};

/// Container that receives run reports when no log path is given.
pub const REPORT_CONTAINER: &str = "sync-reports";

#[derive(Parser, Debug)]
#[command(name = "contentsync")]
#[command(about = "Reconcile a content store with a remote data source")]
#[command(version)]
pub struct Cli {
    /// Local JSON file to read records from
    #[arg(long, conflicts_with = "source_url", required_unless_present = "source_url")]
    pub source_path: Option<PathBuf>,

    /// Remote endpoint to fetch records from
    #[arg(long)]
    pub source_url: Option<String>,

    /// Run everything, then roll back instead of committing
    #[arg(long)]
    pub dry_run: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Directory for run reports; without it reports go into the store
    #[arg(long)]
    pub logpath: Option<PathBuf>,

    /// SQLite database file holding the store (in-memory when omitted)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Commit after this many changed records
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub commit_every: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// HTTP retries for transient failures
    #[arg(long, default_value = "7")]
    pub retries: u32,

    #[command(flatten)]
    pub mapper: MapperArgs,
}

/// Options for the document mapper.
#[derive(Args, Debug)]
pub struct MapperArgs {
    /// Container holding the synced objects
    #[arg(long, default_value = "content")]
    pub container: String,

    /// Type of the objects to create
    #[arg(long, default_value = "Document")]
    pub object_type: String,

    /// Record field carrying the identity
    #[arg(long, default_value = "id")]
    pub id_field: String,

    /// Record field carrying the modification time
    #[arg(long, default_value = "modification_date")]
    pub modification_field: String,

    /// Field to copy (repeatable; all fields when omitted)
    #[arg(long = "field")]
    pub fields: Vec<String>,

    /// Field holding the id of another object (repeatable)
    #[arg(long = "relation-field")]
    pub relation_fields: Vec<String>,

    /// Workflow state for new objects
    #[arg(long)]
    pub review_state: Option<String>,

    /// Update objects even when the record is not newer
    #[arg(long)]
    pub force_update: bool,
}

impl MapperArgs {
    pub fn to_config(&self) -> DocumentMapperConfig {
        DocumentMapperConfig {
            container: self.container.clone(),
            object_type: self.object_type.clone(),
            id_field: self.id_field.clone(),
            modification_field: self.modification_field.clone(),
            fields: self.fields.clone(),
            relation_fields: self.relation_fields.clone(),
            review_state: self.review_state.clone(),
            force_update: self.force_update,
        }
    }
}

impl Cli {
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    pub fn source_location(&self) -> Result<SourceLocation> {
        Ok(SourceLocation::from_options(
            self.source_path.clone(),
            self.source_url.clone(),
        )?)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            dry_run: self.dry_run,
            commit_every: self.commit_every.map(|n| n as usize),
            ..Default::default()
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            retries: self.retries,
            timeout_secs: self.timeout,
            ..Default::default()
        }
    }
}

/// Opens the SQLite store at `path`, or an in-memory store.
pub fn open_store(path: Option<&Path>) -> Result<Arc<dyn ContentStore>> {
    match path {
        Some(path) => {
            let store = SqliteStore::open(path)
                .with_context(|| format!("Failed to open store {}", path.display()))?;
            info!("Using store {}", path.display());
            Ok(Arc::new(store))
        }
        None => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Builds the engine described by the arguments.
pub fn build_engine(cli: &Cli, store: Arc<dyn ContentStore>) -> Result<SyncEngine> {
    let client = ResilientClient::new(&cli.http_config()).context("Failed to build HTTP client")?;

    let sink: Arc<dyn ReportSink> = match &cli.logpath {
        Some(dir) => Arc::new(FileReportSink::new(dir)),
        None => Arc::new(StoreReportSink::new(store.clone(), REPORT_CONTAINER)),
    };

    Ok(SyncEngine::new(
        cli.engine_config(),
        store,
        Arc::new(DocumentMapper::new(cli.mapper.to_config())),
        Arc::new(DefaultSourceProvider::new(client)),
    )
    .with_report_sink(sink))
}

/// Process exit status for a finished run.
pub fn exit_code(summary: &RunSummary) -> i32 {
    if summary.is_success() { 0 } else { 1 }
}
