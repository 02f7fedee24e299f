// Domain models: parsed records and the aggregate snapshot

mod record;
mod snapshot;

pub use record::{LogLevel, LogRecord};
pub use snapshot::{AggregateSnapshot, ApiErrorStats, LogCounts, UserActivity, format_error_rate};
