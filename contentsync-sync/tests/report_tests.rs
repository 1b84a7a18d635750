//! Tests for the run reporter, report documents, sinks, and session state.

use chrono::{TimeZone, Utc};
use contentsync_sync::report::linkify;
use contentsync_sync::{
    EventKind, FileReportSink, LogLine, OutcomeTally, RecordOutcome, ReportDocument, ReportSink,
    ReportSummary, RunPhase, RunReporter, SyncError, SyncSession,
};
use pretty_assertions::assert_eq;

// ── linkify ─────────────────────────────────────────────────────

#[test]
fn plain_text_is_escaped() {
    assert_eq!(linkify("a < b & c"), "a &lt; b &amp; c");
}

#[test]
fn urls_become_anchors() {
    assert_eq!(
        linkify("fetched https://example.org/api?a=1&b=2 ok"),
        r#"fetched <a href="https://example.org/api?a=1&amp;b=2">https://example.org/api?a=1&amp;b=2</a> ok"#
    );
}

#[test]
fn trailing_punctuation_stays_outside_the_link() {
    assert_eq!(
        linkify("see http://example.org/x."),
        r#"see <a href="http://example.org/x">http://example.org/x</a>."#
    );
}

#[test]
fn paths_become_anchors() {
    assert_eq!(
        linkify("Created /news/item-1"),
        r#"Created <a href="/news/item-1">/news/item-1</a>"#
    );
    assert_eq!(
        linkify("/a/b and /c/d"),
        r#"<a href="/a/b">/a/b</a> and <a href="/c/d">/c/d</a>"#
    );
}

#[test]
fn fractions_and_single_segments_are_left_alone() {
    assert_eq!(linkify("Progress: 2/3 items"), "Progress: 2/3 items");
    assert_eq!(linkify("root /only"), "root /only");
}

#[test]
fn markup_in_messages_cannot_inject() {
    let out = linkify(r#"<script>alert("x")</script> /a/b"#);
    assert!(!out.contains("<script>"));
    assert!(out.ends_with(r#"<a href="/a/b">/a/b</a>"#));
}

// ── Lines and reporter ──────────────────────────────────────────

#[test]
fn line_format() {
    let line = LogLine {
        at: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
        kind: EventKind::Updated,
        message: "Updated /content/a1".into(),
    };
    assert_eq!(
        line.render(),
        r#"[2024-05-06 07:08:09] UPDATED Updated <a href="/content/a1">/content/a1</a>"#
    );
}

#[test]
fn reporter_keeps_event_order() {
    let mut reporter = RunReporter::new();
    reporter.log(EventKind::Info, "start");
    reporter.log(EventKind::Error, "boom");
    reporter.log(EventKind::Skipped, "skip");

    let kinds: Vec<EventKind> = reporter.lines().iter().map(|l| l.kind).collect();
    assert_eq!(kinds, vec![EventKind::Info, EventKind::Error, EventKind::Skipped]);
    assert_eq!(reporter.count(EventKind::Error), 1);
    assert!(reporter.rendered()[1].ends_with("ERROR boom"));
}

#[test]
fn summary_line() {
    let summary = ReportSummary {
        items_seen: 10,
        created: 2,
        updated: 3,
        skipped: 4,
        to_delete: 1,
        errored: 0,
    };
    assert_eq!(
        summary.to_string(),
        "Items: 10, created: 2, updated: 3, skipped: 4, to delete: 1, errors: 0"
    );
}

// ── Session ─────────────────────────────────────────────────────

#[test]
fn phases_only_move_forward() {
    let mut session = SyncSession::new();
    assert_eq!(session.phase(), RunPhase::Start);
    session.enter(RunPhase::Iterate);
    session.enter(RunPhase::Fetch);
    assert_eq!(session.phase(), RunPhase::Iterate);
    session.finish();
    assert_eq!(session.phase(), RunPhase::End);
    assert!(session.finished_at.is_some());
}

#[test]
fn outcomes_feed_tally_and_counters() {
    let mut session = SyncSession::new();
    for outcome in [
        RecordOutcome::Created,
        RecordOutcome::Skipped,
        RecordOutcome::Skipped,
        RecordOutcome::Errored,
        RecordOutcome::Deleted,
    ] {
        session.record(outcome);
    }
    assert_eq!(
        session.tally,
        OutcomeTally {
            created: 1,
            updated: 0,
            skipped: 2,
            deleted: 1,
            errored: 1,
        }
    );
    assert_eq!(session.tally.total(), 5);
    assert_eq!(session.counters.skipped, 2);
    assert_eq!(session.counters.errored, 1);
    // object counters are booked by the engine
    assert_eq!(session.counters.created, 0);
}

#[test]
fn document_from_session() {
    let mut session = SyncSession::new();
    session.counters.items_seen = 1;
    session.counters.created = 1;
    session.reporter.log(EventKind::Created, "Created /content/a1");
    session.finish();

    let doc = ReportDocument::from_session(&session, "Nightly".into(), true);
    assert_eq!(doc.run_id, session.run_id);
    assert_eq!(doc.title, "Nightly");
    assert_eq!(doc.counts.created, 1);
    assert_eq!(doc.summary, "Items: 1, created: 1, updated: 0, skipped: 0, to delete: 0, errors: 0");
    assert_eq!(doc.lines.len(), 1);
    assert!(doc.dry_run);
    assert_eq!(Some(doc.finished_at), session.finished_at);
}

// ── File sink ───────────────────────────────────────────────────

fn sample_document() -> ReportDocument {
    let mut session = SyncSession::new();
    session.reporter.log(EventKind::Info, "hello");
    session.finish();
    ReportDocument::from_session(&session, "Report".into(), false)
}

#[tokio::test]
async fn file_sink_writes_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("reports");
    let sink = FileReportSink::new(&target);
    let doc = sample_document();

    let location = sink.write_report(&doc).await.unwrap();

    let expected = target.join(FileReportSink::file_name(doc.started_at));
    assert_eq!(location, expected.display().to_string());
    let written: ReportDocument = serde_json::from_slice(&std::fs::read(&expected).unwrap()).unwrap();
    assert_eq!(written, doc);
}

#[test]
fn report_file_name_uses_start_time() {
    let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 1).unwrap();
    assert_eq!(FileReportSink::file_name(at), "report-20241231-235901.json");
}

#[tokio::test]
async fn file_sink_failure_is_a_report_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let err = FileReportSink::new(&blocker)
        .write_report(&sample_document())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::ReportWriteFailed(_)));
}
