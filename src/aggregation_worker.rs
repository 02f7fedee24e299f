// Aggregation run: discover log files, fan out one task per file onto a shared aggregate,
// derive the error rate, persist the snapshot. In serve mode the same run can be repeated
// every refresh.interval_secs.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::{SharedAggregate, process_file};
use crate::config::{AppConfig, IngestConfig};
use crate::models::AggregateSnapshot;
use crate::snapshot_store::SnapshotStore;

/// Result of one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub snapshot: AggregateSnapshot,
    pub files_discovered: usize,
    /// Files that failed to open or stopped mid-read (their partial lines still count).
    pub files_failed: usize,
}

/// Creates the log directory if missing.
pub async fn ensure_log_dir(dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| anyhow::anyhow!("create log dir {}: {}", dir.display(), e))
}

/// Regular files directly under `dir` whose name ends with `extension`, sorted.
/// A missing directory yields no files; entries that cannot be inspected are skipped.
pub async fn discover_log_files(dir: &Path, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "log dir does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(anyhow::anyhow!("read log dir {}: {}", dir.display(), e)),
    };

    // Only an unreadable directory fails the run; per-entry problems are logged and
    // the files found so far are still aggregated.
    let mut files = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "log dir listing stopped early");
                break;
            }
        };
        let matches_suffix = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(extension));
        if !matches_suffix {
            continue;
        }
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => debug!(path = %path.display(), "skipping non-file entry"),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable entry"),
        }
    }
    files.sort();
    Ok(files)
}

/// Aggregates every discovered file concurrently. Per-file failures are logged, never escalated.
#[instrument(skip(ingest), fields(log_dir = %ingest.log_dir, extension = %ingest.extension))]
pub async fn aggregate_logs(ingest: &IngestConfig) -> anyhow::Result<AggregationOutcome> {
    let files = discover_log_files(Path::new(&ingest.log_dir), &ingest.extension).await?;
    let aggregate = SharedAggregate::new(ingest.max_tracked_users);

    let tasks = files.iter().cloned().map(|path| {
        let aggregate = aggregate.clone();
        tokio::spawn(async move {
            let result = process_file(&path, &aggregate).await;
            (path, result)
        })
    });

    let mut files_failed = 0;
    for joined in join_all(tasks).await {
        match joined {
            Ok((path, Ok(stats))) => {
                debug!(
                    path = %path.display(),
                    lines_read = stats.lines_read,
                    records = stats.records,
                    skipped_lines = stats.skipped_lines,
                    user_extraction_failures = stats.user_extraction_failures,
                    users_dropped = stats.users_dropped,
                    "file aggregated"
                );
            }
            Ok((_, Err(e))) => {
                files_failed += 1;
                warn!(error = %e, "error processing file; partial contribution kept");
            }
            Err(e) => {
                files_failed += 1;
                warn!(error = %e, "file task failed");
            }
        }
    }

    let mut snapshot = aggregate.into_snapshot();
    snapshot.api_errors.refresh_error_rate();

    Ok(AggregationOutcome {
        snapshot,
        files_discovered: files.len(),
        files_failed,
    })
}

/// One full batch run: aggregate then persist.
pub async fn run_once(
    config: &AppConfig,
    store: &SnapshotStore,
) -> anyhow::Result<AggregationOutcome> {
    ensure_log_dir(Path::new(&config.ingest.log_dir)).await?;
    let outcome = aggregate_logs(&config.ingest).await?;
    store.write(&outcome.snapshot).await?;

    let api = &outcome.snapshot.api_errors;
    info!(
        files = outcome.files_discovered,
        files_failed = outcome.files_failed,
        records = outcome.snapshot.log_counts.total(),
        users = outcome.snapshot.user_activity.len(),
        total_requests = api.total_requests(),
        failed_requests = api.failed_requests(),
        error_rate = %api.error_rate(),
        output = %store.path().display(),
        "aggregation complete"
    );
    Ok(outcome)
}

/// Spawns the periodic refresh used in serve mode. The first run starts immediately.
pub fn spawn(
    config: AppConfig,
    store: Arc<SnapshotStore>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(config, store, shutdown_rx).await;
    })
}

#[instrument(skip_all, fields(interval_secs = config.refresh.interval_secs))]
async fn run(
    config: AppConfig,
    store: Arc<SnapshotStore>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    if config.refresh.interval_secs == 0 {
        debug!("refresh disabled");
        return;
    }
    let mut tick = tokio::time::interval(Duration::from_secs(config.refresh.interval_secs));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                if let Err(e) = run_once(&config, &store).await {
                    warn!(error = %e, "refresh aggregation failed");
                }
            }
            _ = &mut shutdown_rx => {
                debug!("refresh worker shutting down");
                break;
            }
        }
    }
}
