// File aggregator tests: apply_record semantics, process_file streaming and failure handling

mod common;

use common::{ALICE_API_FAILURE, ALICE_LOGIN, write_log};
use logprocessor::aggregator::{SharedAggregate, UserUpdate, apply_record, process_file};
use logprocessor::error::IngestError;
use logprocessor::models::{AggregateSnapshot, LogLevel};
use logprocessor::parser::parse_line;
use tempfile::TempDir;

fn apply(agg: &mut AggregateSnapshot, line: &str, max_users: Option<usize>) -> UserUpdate {
    apply_record(agg, &parse_line(line).unwrap(), max_users)
}

#[test]
fn apply_record_counts_level_user_and_request() {
    let mut agg = AggregateSnapshot::default();
    assert_eq!(apply(&mut agg, ALICE_LOGIN, None), UserUpdate::Recorded);
    assert_eq!(apply(&mut agg, ALICE_API_FAILURE, None), UserUpdate::None);

    assert_eq!(agg.log_counts.get(LogLevel::Info), 1);
    assert_eq!(agg.log_counts.get(LogLevel::Error), 1);
    assert_eq!(agg.log_counts.get(LogLevel::Warn), 0);
    let alice = &agg.user_activity["alice"];
    assert_eq!(alice.last_seen, "2024-01-01T10:00:00");
    assert_eq!(alice.actions, 1);
    assert_eq!(agg.api_errors.total_requests(), 2);
    assert_eq!(agg.api_errors.failed_requests(), 1);
}

#[test]
fn repeat_activity_updates_last_seen_and_actions() {
    let mut agg = AggregateSnapshot::default();
    apply(&mut agg, "[t1] s INFO User 'bob' logged in", None);
    apply(&mut agg, "[t2] s INFO User 'bob' accessed /reports", None);
    apply(&mut agg, "[t3] s WARN User 'bob' logged out", None);
    let bob = &agg.user_activity["bob"];
    assert_eq!(bob.last_seen, "t3");
    assert_eq!(bob.actions, 3);
}

#[test]
fn access_without_user_reference_does_not_touch_users() {
    let mut agg = AggregateSnapshot::default();
    let update = apply(&mut agg, "[t] s INFO file accessed by cron", None);
    assert_eq!(update, UserUpdate::None);
    assert!(agg.user_activity.is_empty());
    assert_eq!(agg.log_counts.info, 1);
    assert_eq!(agg.api_errors.total_requests(), 1);
}

#[test]
fn unterminated_user_reference_is_an_extraction_failure() {
    let mut agg = AggregateSnapshot::default();
    let update = apply(&mut agg, "[t] s INFO User 'bob logged in", None);
    assert_eq!(update, UserUpdate::ExtractionFailed);
    assert!(agg.user_activity.is_empty());
    // the rest of the record still counts
    assert_eq!(agg.log_counts.info, 1);
    assert_eq!(agg.api_errors.total_requests(), 1);
}

#[test]
fn user_bound_drops_new_users_but_updates_known_ones() {
    let mut agg = AggregateSnapshot::default();
    apply(&mut agg, "[t1] s INFO User 'a' logged in", Some(1));
    let update = apply(&mut agg, "[t2] s INFO User 'b' logged in", Some(1));
    assert_eq!(update, UserUpdate::Dropped);
    let update = apply(&mut agg, "[t3] s INFO User 'a' accessed /x", Some(1));
    assert_eq!(update, UserUpdate::Recorded);

    assert_eq!(agg.user_activity.len(), 1);
    assert_eq!(agg.user_activity["a"].actions, 2);
    assert_eq!(agg.log_counts.info, 3);
}

#[tokio::test]
async fn process_file_skips_malformed_lines() {
    let dir = TempDir::new().unwrap();
    let path = write_log(
        dir.path(),
        "a.log",
        &[
            ALICE_LOGIN,
            "[2024-01-01T10:01:00] srv1 no level token here",
            "garbage",
            "",
            ALICE_API_FAILURE,
        ],
    );
    let aggregate = SharedAggregate::default();
    let stats = process_file(&path, &aggregate).await.unwrap();
    assert_eq!(stats.lines_read, 5);
    assert_eq!(stats.records, 2);
    assert_eq!(stats.skipped_lines, 3);

    let snapshot = aggregate.snapshot();
    assert_eq!(snapshot.log_counts.total(), 2);
    assert_eq!(snapshot.api_errors.total_requests(), 2);
    assert_eq!(snapshot.api_errors.failed_requests(), 1);
}

#[tokio::test]
async fn process_file_counts_extraction_failures() {
    let dir = TempDir::new().unwrap();
    let path = write_log(
        dir.path(),
        "a.log",
        &["[t] s INFO User 'x logged in", "[t] s INFO User 'y' logged in"],
    );
    let aggregate = SharedAggregate::default();
    let stats = process_file(&path, &aggregate).await.unwrap();
    assert_eq!(stats.user_extraction_failures, 1);
    assert_eq!(aggregate.snapshot().user_activity.len(), 1);
}

#[tokio::test]
async fn process_file_missing_file_is_open_error() {
    let dir = TempDir::new().unwrap();
    let aggregate = SharedAggregate::default();
    let err = process_file(&dir.path().join("missing.log"), &aggregate)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Open { .. }));
    assert_eq!(aggregate.snapshot(), AggregateSnapshot::default());
}

#[tokio::test]
async fn process_file_keeps_lines_before_read_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.log");
    let mut bytes = format!("{}\n", ALICE_LOGIN).into_bytes();
    bytes.extend_from_slice(b"[t] s INFO \xff\xfe not utf8\n");
    bytes.extend_from_slice(format!("{}\n", ALICE_API_FAILURE).as_bytes());
    std::fs::write(&path, bytes).unwrap();

    let aggregate = SharedAggregate::default();
    let err = process_file(&path, &aggregate).await.unwrap_err();
    match err {
        IngestError::Read { lines_read, .. } => assert_eq!(lines_read, 1),
        other => panic!("expected read error, got {other:?}"),
    }
    let snapshot = aggregate.snapshot();
    assert_eq!(snapshot.log_counts.info, 1);
    assert_eq!(snapshot.log_counts.error, 0);
    assert_eq!(snapshot.user_activity["alice"].actions, 1);
}

#[tokio::test]
async fn into_snapshot_after_all_clones_dropped() {
    let dir = TempDir::new().unwrap();
    let path = write_log(dir.path(), "a.log", &[ALICE_LOGIN]);
    let aggregate = SharedAggregate::new(None);
    {
        let clone = aggregate.clone();
        process_file(&path, &clone).await.unwrap();
    }
    let snapshot = aggregate.into_snapshot();
    assert_eq!(snapshot.log_counts.info, 1);
}

fn apply_files(aggregate: &SharedAggregate, files: &[&[&str]]) {
    for lines in files {
        for line in *lines {
            if let Some(record) = parse_line(line) {
                aggregate.apply(&record);
            }
        }
    }
}

#[test]
fn file_order_does_not_change_snapshot() {
    let a: &[&str] = &[
        "[t1] s INFO User 'ann' logged in",
        "[t2] s ERROR API request failed for ann",
    ];
    let b: &[&str] = &[
        "[t3] s WARN User 'ben' accessed /a",
        "[t4] s WARN User 'ben' accessed /b",
        "not a log line",
    ];
    let c: &[&str] = &[
        "[t5] s INFO User 'cal' logged in",
        "[t6] s ERROR API request failed for cal",
        "[t7] s INFO ok",
    ];

    let forward = SharedAggregate::default();
    apply_files(&forward, &[a, b, c]);
    let reversed = SharedAggregate::default();
    apply_files(&reversed, &[c, b, a]);
    let rotated = SharedAggregate::default();
    apply_files(&rotated, &[b, c, a]);

    let expected = forward.into_snapshot();
    assert_eq!(reversed.into_snapshot(), expected);
    assert_eq!(rotated.into_snapshot(), expected);
    assert_eq!(expected.log_counts.total(), 7);
    assert_eq!(expected.user_activity["ben"].actions, 2);
    assert_eq!(expected.user_activity["ben"].last_seen, "t4");
    assert_eq!(expected.api_errors.failed_requests(), 2);
}
