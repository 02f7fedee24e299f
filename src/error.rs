// Typed errors for file ingestion and snapshot persistence.

use std::path::PathBuf;

/// Per-file failure. Records applied before the failure stay in the aggregate.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("read failed in {} after {lines_read} lines: {source}", path.display())]
    Read {
        path: PathBuf,
        lines_read: u64,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("no snapshot at {}", .0.display())]
    NotFound(PathBuf),
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}
