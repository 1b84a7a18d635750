//! Per-run state.
//!
//! A [`SyncSession`] lives for exactly one run. It owns the counters, the
//! per-record outcome tally, the survivor set, and the log buffer; the store
//! owns the objects themselves.

use crate::report::RunReporter;
use chrono::{DateTime, Utc};
use contentsync_types::RemoteId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

/// Phases of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Start,
    Fetch,
    Iterate,
    DeletePass,
    Report,
    End,
}

/// Object-level counters.
///
/// `created`, `updated`, and `deleted` count objects (a record may produce
/// several); `skipped` and `errored` count records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounters {
    pub items_seen: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub errored: usize,
}

/// What became of one input record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Created,
    Updated,
    Skipped,
    Deleted,
    /// Lookup, create, update, or delete failed, or nothing was created.
    Errored,
}

/// Per-record outcome counts. Every record lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub errored: usize,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Created => self.created += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Deleted => self.deleted += 1,
            RecordOutcome::Errored => self.errored += 1,
        }
    }

    /// Number of records accounted for.
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.deleted + self.errored
    }
}

/// State of one reconciliation run.
#[derive(Debug)]
pub struct SyncSession {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counters: SyncCounters,
    pub tally: OutcomeTally,
    /// Remote ids confirmed present at the source during this run.
    pub synced_ids: HashSet<RemoteId>,
    /// Remote ids of objects created during this run.
    pub created_ids: HashSet<RemoteId>,
    pub reporter: RunReporter,
    phase: RunPhase,
}

impl SyncSession {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            counters: SyncCounters::default(),
            tally: OutcomeTally::default(),
            synced_ids: HashSet::new(),
            created_ids: HashSet::new(),
            reporter: RunReporter::new(),
            phase: RunPhase::Start,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Moves to `phase`. Phases only move forward; going back is ignored.
    pub fn enter(&mut self, phase: RunPhase) {
        if phase <= self.phase {
            return;
        }
        debug!(run_id = %self.run_id, from = ?self.phase, to = ?phase, "Run phase");
        self.phase = phase;
    }

    /// Books the outcome of one record.
    pub fn record(&mut self, outcome: RecordOutcome) {
        self.tally.record(outcome);
        match outcome {
            RecordOutcome::Skipped => self.counters.skipped += 1,
            RecordOutcome::Errored => self.counters.errored += 1,
            _ => {}
        }
    }

    /// Ids the delete pass must keep: objects confirmed present plus
    /// objects created during this run.
    pub fn survivors(&self) -> HashSet<RemoteId> {
        self.synced_ids.union(&self.created_ids).cloned().collect()
    }

    /// Marks the run finished. Keeps an earlier finish time if one was set.
    pub fn finish(&mut self) {
        self.enter(RunPhase::End);
        self.finished_at.get_or_insert_with(Utc::now);
    }
}

impl Default for SyncSession {
    fn default() -> Self {
        Self::new()
    }
}
