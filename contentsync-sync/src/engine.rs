//! The reconciliation engine.
//!
//! One [`SyncEngine::run`] walks the source records in order, decides per
//! record whether to create, update, skip, or delete, and then lets the
//! mapper remove objects that vanished from the source. Failures on one
//! record are logged and counted; they never stop the run.

use crate::error::{MapperResult, SyncError, SyncResult};
use crate::mapper::RecordMapper;
use crate::report::{EventKind, ReportDocument, ReportSink, ReportSummary};
use crate::session::{OutcomeTally, RecordOutcome, RunPhase, SyncCounters, SyncSession};
use crate::source::{SourceLocation, SourceProvider};
use chrono::Utc;
use contentsync_store::{ContentStore, TargetObject};
use contentsync_types::{Record, RemoteId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Configuration for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Roll back instead of committing at the end of the run.
    pub dry_run: bool,
    /// Log progress every this many records. Zero disables it.
    pub progress_every: usize,
    /// Commit every this many store-changing records.
    pub commit_every: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            progress_every: 100,
            commit_every: None,
        }
    }
}

/// What to do with one record.
#[derive(Debug, Clone)]
pub enum Decision<'r> {
    Create(&'r Record),
    Update(TargetObject, &'r Record),
    Skip(TargetObject),
    Delete(TargetObject),
}

/// Result of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub counters: SyncCounters,
    pub tally: OutcomeTally,
    pub synced_ids: HashSet<RemoteId>,
    pub report: ReportDocument,
    /// Where the report was persisted, if anywhere.
    pub report_location: Option<String>,
    /// Set when the source could not be read.
    pub source_error: Option<String>,
    /// Set when the final commit (or rollback) failed.
    pub commit_error: Option<String>,
}

impl RunSummary {
    /// True when the run reached the end without a source or commit failure.
    /// Per-record errors do not count.
    pub fn is_success(&self) -> bool {
        self.source_error.is_none() && self.commit_error.is_none()
    }
}

/// Reconciles a store against a source through a mapper.
pub struct SyncEngine {
    config: EngineConfig,
    store: Arc<dyn ContentStore>,
    mapper: Arc<dyn RecordMapper>,
    source: Arc<dyn SourceProvider>,
    sink: Option<Arc<dyn ReportSink>>,
}

impl SyncEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn ContentStore>,
        mapper: Arc<dyn RecordMapper>,
        source: Arc<dyn SourceProvider>,
    ) -> Self {
        Self {
            config,
            store,
            mapper,
            source,
            sink: None,
        }
    }

    /// Sets where run reports are persisted.
    #[must_use]
    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Executes one run against `location`.
    ///
    /// Never fails: source errors end the run early with an empty report,
    /// record errors are counted, and report or commit failures are logged
    /// and surfaced in the summary.
    pub async fn run(&self, location: &SourceLocation) -> RunSummary {
        let mut session = SyncSession::new();
        info!(run_id = %session.run_id, source = %location, dry_run = self.config.dry_run, "Starting sync run");
        session
            .reporter
            .log(EventKind::Info, format!("Start sync from {location}"));

        session.enter(RunPhase::Fetch);
        let mut source_error = None;
        let records = match self.fetch(location).await {
            Ok(records) => records,
            Err(e) => {
                session.reporter.log(EventKind::Error, e.to_string());
                source_error = Some(e.to_string());
                Vec::new()
            }
        };

        if records.is_empty() {
            if source_error.is_none() {
                session
                    .reporter
                    .log(EventKind::Warning, format!("No items found in {location}"));
            }
        } else {
            session.enter(RunPhase::Iterate);
            self.iterate(&mut session, &records);
            session.enter(RunPhase::DeletePass);
            self.delete_pass(&mut session, &records);
        }

        session.enter(RunPhase::Report);
        let summary = ReportSummary::from(&session.counters);
        session.reporter.log(EventKind::Info, summary.to_string());
        session.finished_at = Some(Utc::now());
        let report = ReportDocument::from_session(
            &session,
            self.mapper.report_title(session.started_at),
            self.config.dry_run,
        );
        let report_location = self.persist_report(&report).await;

        session.finish();
        let commit_error = self.close_transaction();

        info!(run_id = %session.run_id, "Sync run finished: {}", summary);
        RunSummary {
            run_id: session.run_id,
            counters: session.counters,
            tally: session.tally,
            synced_ids: session.synced_ids,
            report,
            report_location,
            source_error,
            commit_error,
        }
    }

    async fn fetch(&self, location: &SourceLocation) -> SyncResult<Vec<Record>> {
        let payload = self.source.get_data(location).await?;
        if payload.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.mapper.convert_source_data(payload)?)
    }

    fn iterate(&self, session: &mut SyncSession, records: &[Record]) {
        let total = records.len();
        let mut changes = 0usize;

        for (index, record) in records.iter().enumerate() {
            session.counters.items_seen += 1;
            let outcome = self.reconcile(session, index, record);
            session.record(outcome);

            if matches!(
                outcome,
                RecordOutcome::Created | RecordOutcome::Updated | RecordOutcome::Deleted
            ) {
                changes += 1;
                self.intermediate_commit(session, changes);
            }

            let seen = index + 1;
            if self.config.progress_every > 0 && seen % self.config.progress_every == 0 {
                session
                    .reporter
                    .log(EventKind::Info, format!("Progress: {seen}/{total} items processed"));
            }
        }
    }

    fn intermediate_commit(&self, session: &mut SyncSession, changes: usize) {
        let Some(every) = self.config.commit_every.filter(|n| *n > 0) else {
            return;
        };
        if self.config.dry_run || changes % every != 0 {
            return;
        }
        match self.store.commit() {
            Ok(()) => debug!("Intermediate commit after {} changes", changes),
            Err(e) => session
                .reporter
                .log(EventKind::Error, format!("Intermediate commit failed: {e}")),
        }
    }

    fn reconcile(&self, session: &mut SyncSession, index: usize, record: &Record) -> RecordOutcome {
        let label = self
            .mapper
            .record_id(record)
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("record #{}", index + 1));

        match self.plan(record) {
            Ok(decision) => self.apply(session, &label, decision),
            Err(source) => Self::fail(
                session,
                SyncError::RecordLookupFailed {
                    record: label,
                    source,
                },
            ),
        }
    }

    /// Chooses what to do with `record` based on what the store holds.
    fn plan<'r>(&self, record: &'r Record) -> MapperResult<Decision<'r>> {
        Ok(match self.mapper.find_item(self.store.as_ref(), record)? {
            None => Decision::Create(record),
            Some(object) if self.mapper.is_withdrawn(record) => Decision::Delete(object),
            Some(object) => Decision::Update(object, record),
        })
    }

    fn apply(&self, session: &mut SyncSession, label: &str, decision: Decision<'_>) -> RecordOutcome {
        let store = self.store.as_ref();
        match decision {
            Decision::Create(record) => match self.mapper.create_item(store, record) {
                Ok(created) if created.is_empty() => {
                    session
                        .reporter
                        .log(EventKind::Error, format!("{label} not created"));
                    RecordOutcome::Errored
                }
                Ok(created) => {
                    session.counters.created += created.len();
                    for object in &created {
                        session.created_ids.insert(object.remote_id.clone());
                        session
                            .reporter
                            .log(EventKind::Created, format!("Created {}", object.path()));
                    }
                    RecordOutcome::Created
                }
                Err(source) => Self::fail(
                    session,
                    SyncError::RecordCreateFailed {
                        record: label.to_string(),
                        source,
                    },
                ),
            },

            Decision::Update(object, record) => match self.mapper.update_item(store, &object, record) {
                Ok(updated) if updated.is_empty() => self.apply(session, label, Decision::Skip(object)),
                Ok(updated) => {
                    session.counters.updated += updated.len();
                    for object in &updated {
                        if let Err(e) = store.reindex(object.uid) {
                            session
                                .reporter
                                .log(EventKind::Warning, format!("Reindex of {} failed: {e}", object.path()));
                        }
                        session.synced_ids.insert(object.remote_id.clone());
                        session
                            .reporter
                            .log(EventKind::Updated, format!("Updated {}", object.path()));
                    }
                    RecordOutcome::Updated
                }
                Err(source) => Self::fail(
                    session,
                    SyncError::RecordUpdateFailed {
                        record: label.to_string(),
                        source,
                    },
                ),
            },

            Decision::Skip(object) => {
                session.synced_ids.insert(object.remote_id.clone());
                session
                    .reporter
                    .log(EventKind::Skipped, format!("Skipped {}", object.path()));
                RecordOutcome::Skipped
            }

            Decision::Delete(object) => match self.mapper.delete_item(store, &object) {
                Ok(()) => {
                    session.counters.deleted += 1;
                    session.reporter.log(
                        EventKind::Deleted,
                        format!("Deleted {} (withdrawn at source)", object.path()),
                    );
                    RecordOutcome::Deleted
                }
                Err(source) => Self::fail(
                    session,
                    SyncError::RecordDeleteFailed {
                        record: label.to_string(),
                        source,
                    },
                ),
            },
        }
    }

    fn fail(session: &mut SyncSession, error: SyncError) -> RecordOutcome {
        session.reporter.log(EventKind::Error, error.to_string());
        RecordOutcome::Errored
    }

    fn delete_pass(&self, session: &mut SyncSession, records: &[Record]) {
        let survivors = session.survivors();
        match self.mapper.delete_items(self.store.as_ref(), records, &survivors) {
            Ok(deleted) => {
                session.counters.deleted += deleted.len();
                for object in &deleted {
                    session
                        .reporter
                        .log(EventKind::Deleted, format!("Deleted {}", object.path()));
                }
            }
            Err(source) => {
                let error = SyncError::RecordDeleteFailed {
                    record: "delete pass".to_string(),
                    source,
                };
                session.reporter.log(EventKind::Error, error.to_string());
            }
        }
    }

    async fn persist_report(&self, report: &ReportDocument) -> Option<String> {
        let Some(sink) = &self.sink else {
            warn!("No report sink configured, report not persisted");
            return None;
        };
        match sink.write_report(report).await {
            Ok(location) => {
                info!("Report written to {}", location);
                Some(location)
            }
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    }

    fn close_transaction(&self) -> Option<String> {
        let (action, result) = if self.config.dry_run {
            ("roll back", self.store.rollback())
        } else {
            ("commit", self.store.commit())
        };
        match result {
            Ok(()) => {
                debug!("Store {} done", action);
                None
            }
            Err(e) => {
                error!("Failed to {} store: {}", action, e);
                Some(e.to_string())
            }
        }
    }
}
