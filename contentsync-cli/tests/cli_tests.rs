//! Tests for argument parsing and end-to-end runs through the CLI wiring.

use clap::Parser;
use contentsync_cli::{Cli, REPORT_CONTAINER, build_engine, exit_code, open_store};
use contentsync_store::{ContentStore, SqliteStore};
use contentsync_sync::SourceLocation;
use contentsync_types::RemoteId;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tracing::Level;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("contentsync").chain(args.iter().copied()))
}

// ── Argument validation ─────────────────────────────────────────

#[test]
fn source_path_is_enough() {
    let cli = parse(&["--source-path", "items.json"]).unwrap();
    assert_eq!(
        cli.source_location().unwrap(),
        SourceLocation::Path(PathBuf::from("items.json"))
    );
    assert!(!cli.dry_run);
    assert_eq!(cli.log_level(), Level::INFO);
}

#[test]
fn source_url_is_enough() {
    let cli = parse(&["--source-url", "https://example.org/items"]).unwrap();
    assert_eq!(
        cli.source_location().unwrap(),
        SourceLocation::Url("https://example.org/items".into())
    );
}

#[test]
fn a_source_is_required() {
    let err = parse(&["--dry-run"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn sources_are_mutually_exclusive() {
    let err = parse(&["--source-path", "a.json", "--source-url", "http://x"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn commit_every_must_be_positive() {
    assert!(parse(&["--source-path", "a.json", "--commit-every", "0"]).is_err());
    let cli = parse(&["--source-path", "a.json", "--commit-every", "50"]).unwrap();
    assert_eq!(cli.engine_config().commit_every, Some(50));
}

#[test]
fn verbosity_is_counted() {
    assert_eq!(parse(&["--source-path", "a", "-v"]).unwrap().log_level(), Level::DEBUG);
    assert_eq!(parse(&["--source-path", "a", "-vv"]).unwrap().log_level(), Level::TRACE);
    assert_eq!(parse(&["--source-path", "a", "-vvvv"]).unwrap().log_level(), Level::TRACE);
}

#[test]
fn mapper_options() {
    let cli = parse(&[
        "--source-path", "a.json",
        "--container", "news",
        "--object-type", "NewsItem",
        "--id-field", "uuid",
        "--modification-field", "modified",
        "--field", "title",
        "--field", "body",
        "--relation-field", "author",
        "--review-state", "published",
        "--force-update",
    ])
    .unwrap();

    let config = cli.mapper.to_config();
    assert_eq!(config.container, "news");
    assert_eq!(config.object_type, "NewsItem");
    assert_eq!(config.id_field, "uuid");
    assert_eq!(config.modification_field, "modified");
    assert_eq!(config.fields, vec!["title", "body"]);
    assert_eq!(config.relation_fields, vec!["author"]);
    assert_eq!(config.review_state.as_deref(), Some("published"));
    assert!(config.force_update);
}

#[test]
fn mapper_defaults() {
    let config = parse(&["--source-path", "a.json"]).unwrap().mapper.to_config();
    assert_eq!(config.container, "content");
    assert_eq!(config.id_field, "id");
    assert!(config.fields.is_empty());
    assert!(!config.force_update);
}

#[test]
fn http_options() {
    let cli = parse(&["--source-url", "http://x", "--timeout", "5", "--retries", "2"]).unwrap();
    let http = cli.http_config();
    assert_eq!(http.timeout_secs, 5);
    assert_eq!(http.retries, 2);
    assert_eq!(http.status_forcelist, vec![500, 501, 502, 503, 504]);
}

// ── End to end ──────────────────────────────────────────────────

#[tokio::test]
async fn run_against_file_and_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("items.json");
    std::fs::write(
        &source,
        serde_json::to_vec(&serde_json::json!([
            {"id": "a1", "title": "One", "modification_date": "2024-01-01"},
            {"id": "a2", "title": "Two", "modification_date": "2024-01-01"}
        ]))
        .unwrap(),
    )
    .unwrap();
    let db = dir.path().join("content.db");
    let reports = dir.path().join("reports");

    let cli = parse(&[
        "--source-path", source.to_str().unwrap(),
        "--store", db.to_str().unwrap(),
        "--logpath", reports.to_str().unwrap(),
    ])
    .unwrap();
    let engine = build_engine(&cli, open_store(cli.store.as_deref()).unwrap()).unwrap();
    let summary = engine.run(&cli.source_location().unwrap()).await;

    assert_eq!(exit_code(&summary), 0);
    assert_eq!(summary.counters.created, 2);
    let report_path = PathBuf::from(summary.report_location.unwrap());
    assert!(report_path.starts_with(&reports));
    assert!(report_path.exists());

    drop(engine);
    let reopened = SqliteStore::open(&db).unwrap();
    assert!(reopened.find("content", &RemoteId::new("a1").unwrap()).unwrap().is_some());
    assert_eq!(reopened.synced_objects("content").unwrap().len(), 2);
}

#[tokio::test]
async fn second_run_over_sqlite_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("items.json");
    std::fs::write(
        &source,
        serde_json::to_vec(&serde_json::json!([
            {"id": "a1", "title": "One", "rank": 1.5, "published": true,
             "meta": {"tags": ["x", "y"]}, "modification_date": "2024-01-01T10:00:00Z"},
            {"id": "a2", "title": "Two", "author": "a1",
             "file": {"data": "AQID", "encoding": "base64", "filename": "a.bin"},
             "modification_date": "2024-01-02"}
        ]))
        .unwrap(),
    )
    .unwrap();
    let db = dir.path().join("content.db");
    let args = [
        "--source-path", source.to_str().unwrap(),
        "--store", db.to_str().unwrap(),
        "--relation-field", "author",
        "--force-update",
    ];

    let first_cli = parse(&args).unwrap();
    let first = build_engine(&first_cli, open_store(first_cli.store.as_deref()).unwrap())
        .unwrap()
        .run(&first_cli.source_location().unwrap())
        .await;
    assert_eq!(first.counters.created, 2);

    // forced, so every field is diffed against what came back from SQLite
    let second_cli = parse(&args).unwrap();
    let second = build_engine(&second_cli, open_store(second_cli.store.as_deref()).unwrap())
        .unwrap()
        .run(&second_cli.source_location().unwrap())
        .await;

    assert_eq!(exit_code(&second), 0);
    assert_eq!(second.counters.created, 0);
    assert_eq!(second.counters.updated, 0);
    assert_eq!(second.counters.deleted, 0);
    assert_eq!(second.counters.skipped, 2);

    let reopened = SqliteStore::open(&db).unwrap();
    assert_eq!(reopened.synced_objects("content").unwrap().len(), 2);
}

#[tokio::test]
async fn dry_run_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("items.json");
    std::fs::write(&source, r#"[{"id": "a1", "title": "One"}]"#).unwrap();
    let db = dir.path().join("content.db");

    let cli = parse(&[
        "--source-path", source.to_str().unwrap(),
        "--store", db.to_str().unwrap(),
        "--dry-run",
    ])
    .unwrap();
    let engine = build_engine(&cli, open_store(cli.store.as_deref()).unwrap()).unwrap();
    let summary = engine.run(&cli.source_location().unwrap()).await;

    assert_eq!(exit_code(&summary), 0);
    assert_eq!(summary.counters.created, 1);
    assert!(summary.report_location.unwrap().starts_with(&format!("/{REPORT_CONTAINER}/")));

    drop(engine);
    let reopened = SqliteStore::open(&db).unwrap();
    assert!(reopened.synced_objects("content").unwrap().is_empty());
}

#[tokio::test]
async fn missing_source_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");

    let cli = parse(&["--source-path", missing.to_str().unwrap()]).unwrap();
    let engine = build_engine(&cli, open_store(None).unwrap()).unwrap();
    let summary = engine.run(&cli.source_location().unwrap()).await;

    assert_eq!(exit_code(&summary), 1);
    assert_eq!(summary.counters.items_seen, 0);
}
