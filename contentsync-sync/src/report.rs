//! Run reporting.
//!
//! [`RunReporter`] collects one line per event during a run and mirrors it
//! to `tracing`. At the end of the run the lines and counters are folded
//! into a [`ReportDocument`] and handed to a [`ReportSink`].

use crate::error::{SyncError, SyncResult};
use crate::session::{SyncCounters, SyncSession};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contentsync_store::{ContentStore, NewObject};
use contentsync_types::{FieldMap, FieldValue, ModificationDate, RemoteId};
use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<url>https?://[^\s<>"']+)|(?:^|[\s(\[])(?P<path>/[\w.~%-]+(?:/[\w.~%-]+)+/?)"#)
        .expect("LINK_RE is a valid regex pattern")
});

/// Kind of a report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Info,
    Created,
    Updated,
    Skipped,
    Deleted,
    Warning,
    Error,
}

impl EventKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Skipped => "SKIPPED",
            Self::Deleted => "DELETED",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// One event of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub kind: EventKind,
    pub message: String,
}

impl LogLine {
    /// `[YYYY-MM-DD HH:MM:SS] LEVEL message`, escaped and linkified.
    pub fn render(&self) -> String {
        format!(
            "[{}] {} {}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.kind.label(),
            linkify(&self.message)
        )
    }
}

/// HTML-escapes `text`, turning URLs and multi-segment paths into anchors.
pub fn linkify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in LINK_RE.captures_iter(text) {
        let Some(m) = caps.name("url").or_else(|| caps.name("path")) else {
            continue;
        };
        let target = m
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
        let start = m.start();
        out.push_str(&encode_text(&text[last..start]));
        out.push_str(&format!(
            "<a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(target),
            encode_text(target)
        ));
        last = start + target.len();
    }
    out.push_str(&encode_text(&text[last..]));
    out
}

/// Accumulates the lines of one run.
#[derive(Debug, Default)]
pub struct RunReporter {
    lines: Vec<LogLine>,
}

impl RunReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line and mirrors it to the tracing subscriber.
    pub fn log(&mut self, kind: EventKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            EventKind::Error => error!("{}", message),
            EventKind::Warning => warn!("{}", message),
            EventKind::Skipped => debug!("{}", message),
            _ => info!("{}", message),
        }
        self.lines.push(LogLine {
            at: Utc::now(),
            kind,
            message,
        });
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    /// Number of lines of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.lines.iter().filter(|line| line.kind == kind).count()
    }

    /// Every line rendered for the report.
    pub fn rendered(&self) -> Vec<String> {
        self.lines.iter().map(LogLine::render).collect()
    }
}

/// Aggregate numbers of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub items_seen: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub to_delete: usize,
    pub errored: usize,
}

impl From<&SyncCounters> for ReportSummary {
    fn from(counters: &SyncCounters) -> Self {
        Self {
            items_seen: counters.items_seen,
            created: counters.created,
            updated: counters.updated,
            skipped: counters.skipped,
            to_delete: counters.deleted,
            errored: counters.errored,
        }
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Items: {}, created: {}, updated: {}, skipped: {}, to delete: {}, errors: {}",
            self.items_seen, self.created, self.updated, self.skipped, self.to_delete, self.errored
        )
    }
}

/// The persisted report of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub run_id: Uuid,
    pub title: String,
    /// [`ReportSummary`] rendered as one line.
    pub summary: String,
    pub counts: ReportSummary,
    /// Rendered log lines, in event order.
    pub lines: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
}

impl ReportDocument {
    /// Composes the report of `session`.
    pub fn from_session(session: &SyncSession, title: String, dry_run: bool) -> Self {
        let counts = ReportSummary::from(&session.counters);
        Self {
            run_id: session.run_id,
            title,
            summary: counts.to_string(),
            counts,
            lines: session.reporter.rendered(),
            started_at: session.started_at,
            finished_at: session.finished_at.unwrap_or_else(Utc::now),
            dry_run,
        }
    }
}

/// Destination for run reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persists `report`, returning a description of where it went.
    async fn write_report(&self, report: &ReportDocument) -> SyncResult<String>;
}

/// Writes each report as a JSON file in a directory.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    dir: PathBuf,
}

impl FileReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write_failed(&self, e: impl fmt::Display) -> SyncError {
        SyncError::ReportWriteFailed(format!("{}: {}", self.dir.display(), e))
    }

    /// File name for a report started at `started_at`.
    pub fn file_name(started_at: DateTime<Utc>) -> String {
        format!("report-{}.json", started_at.format("%Y%m%d-%H%M%S"))
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn write_report(&self, report: &ReportDocument) -> SyncResult<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| self.write_failed(e))?;
        let path = self.dir.join(Self::file_name(report.started_at));
        let json = serde_json::to_vec_pretty(report).map_err(|e| self.write_failed(e))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| self.write_failed(e))?;

        Ok(path.display().to_string())
    }
}

/// Stores each report as a `sync_report` object.
pub struct StoreReportSink {
    store: Arc<dyn ContentStore>,
    container: String,
}

impl StoreReportSink {
    pub const OBJECT_TYPE: &'static str = "sync_report";

    pub fn new(store: Arc<dyn ContentStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }

    fn fields(report: &ReportDocument) -> SyncResult<FieldMap> {
        let counts = serde_json::to_value(report.counts)
            .map_err(|e| SyncError::ReportWriteFailed(e.to_string()))?;

        let mut fields = FieldMap::new();
        fields.insert("title".into(), report.title.clone().into());
        fields.insert("summary".into(), report.summary.clone().into());
        fields.insert("counts".into(), FieldValue::Json(counts));
        fields.insert("log".into(), FieldValue::Json(report.lines.clone().into()));
        fields.insert("started_at".into(), ModificationDate::from_datetime(report.started_at).into());
        fields.insert("finished_at".into(), ModificationDate::from_datetime(report.finished_at).into());
        fields.insert("dry_run".into(), FieldValue::Bool(report.dry_run));
        Ok(fields)
    }
}

#[async_trait]
impl ReportSink for StoreReportSink {
    async fn write_report(&self, report: &ReportDocument) -> SyncResult<String> {
        let id = format!(
            "report-{}-{}",
            report.started_at.format("%Y%m%d-%H%M%S"),
            &report.run_id.simple().to_string()[..8]
        );
        let remote_id = RemoteId::new(&id)
            .ok_or_else(|| SyncError::ReportWriteFailed(format!("invalid report id {id}")))?;

        let object = self
            .store
            .create(
                NewObject::new(&self.container, Self::OBJECT_TYPE, remote_id)
                    .with_fields(Self::fields(report)?)
                    .with_modification_date(Some(ModificationDate::from_datetime(report.finished_at))),
            )
            .map_err(|e| SyncError::ReportWriteFailed(e.to_string()))?;

        Ok(object.path())
    }
}
