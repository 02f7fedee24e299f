// File aggregator: streams one log file and applies each parsed record to the shared aggregate.
// The lock is taken once per record and never held across a read.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, instrument, warn};

use crate::error::IngestError;
use crate::models::{AggregateSnapshot, LogRecord, UserActivity};
use crate::parser;

/// What happened to the user-activity part of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserUpdate {
    /// Message did not trigger user tracking.
    None,
    Recorded,
    /// Trigger matched but no `User '<name>'` could be extracted.
    ExtractionFailed,
    /// New user not tracked because the user bound was reached.
    Dropped,
}

/// Aggregate shared by all file tasks of one run.
#[derive(Debug, Clone, Default)]
pub struct SharedAggregate {
    inner: Arc<Mutex<AggregateSnapshot>>,
    max_tracked_users: Option<usize>,
}

impl SharedAggregate {
    pub fn new(max_tracked_users: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AggregateSnapshot::default())),
            max_tracked_users,
        }
    }

    /// Applies one record: level count, user activity, API request tally. One lock acquisition.
    pub fn apply(&self, record: &LogRecord) -> UserUpdate {
        let mut agg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        apply_record(&mut agg, record, self.max_tracked_users)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> AggregateSnapshot {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Takes the aggregate out once every task holding a clone has finished.
    pub fn into_snapshot(self) -> AggregateSnapshot {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

/// Single-record update on an exclusively borrowed aggregate.
pub fn apply_record(
    agg: &mut AggregateSnapshot,
    record: &LogRecord,
    max_tracked_users: Option<usize>,
) -> UserUpdate {
    agg.log_counts.increment(record.level);

    let user_update = if parser::mentions_user_activity(&record.message) {
        match parser::extract_user(&record.message) {
            Some(user) => {
                if let Some(activity) = agg.user_activity.get_mut(user) {
                    activity.touch(&record.timestamp);
                    UserUpdate::Recorded
                } else if max_tracked_users.is_some_and(|max| agg.user_activity.len() >= max) {
                    UserUpdate::Dropped
                } else {
                    // insert-if-absent, then count the action like any other
                    let activity = agg
                        .user_activity
                        .entry(user.to_owned())
                        .or_insert_with(|| UserActivity::first_seen(&record.timestamp));
                    activity.touch(&record.timestamp);
                    UserUpdate::Recorded
                }
            }
            None => UserUpdate::ExtractionFailed,
        }
    } else {
        UserUpdate::None
    };

    agg.api_errors
        .record_request(parser::is_failed_request(&record.message));
    user_update
}

/// Per-file counters reported to the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    pub lines_read: u64,
    pub records: u64,
    pub skipped_lines: u64,
    pub user_extraction_failures: u64,
    pub users_dropped: u64,
}

/// Reads `path` line by line and applies every parsed record to `aggregate`.
/// On a read error the lines already applied are kept.
#[instrument(skip(path, aggregate), fields(path = %path.display()))]
pub async fn process_file(
    path: &Path,
    aggregate: &SharedAggregate,
) -> Result<FileStats, IngestError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| IngestError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let mut lines = BufReader::new(file).lines();
    let mut stats = FileStats::default();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(source) => {
                return Err(IngestError::Read {
                    path: path.to_path_buf(),
                    lines_read: stats.lines_read,
                    source,
                });
            }
        };
        stats.lines_read += 1;

        let Some(record) = parser::parse_line(&line) else {
            stats.skipped_lines += 1;
            continue;
        };
        stats.records += 1;

        match aggregate.apply(&record) {
            UserUpdate::None | UserUpdate::Recorded => {}
            UserUpdate::ExtractionFailed => {
                stats.user_extraction_failures += 1;
                warn!(
                    line = stats.lines_read,
                    timestamp = %record.timestamp,
                    "user activity trigger matched but no username found"
                );
            }
            UserUpdate::Dropped => {
                stats.users_dropped += 1;
                debug!(line = stats.lines_read, "user bound reached; new user not tracked");
            }
        }
    }

    debug!(
        lines_read = stats.lines_read,
        records = stats.records,
        skipped_lines = stats.skipped_lines,
        "file processed"
    );
    Ok(stats)
}
