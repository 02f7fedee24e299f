// Aggregate snapshot: level counters, per-user activity and API request tallies.
// This is the document persisted to the output file and served on GET /logs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::LogLevel;

/// Per-level line counts. All three levels are always present in the encoded form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCounts {
    #[serde(rename = "INFO", default)]
    pub info: u64,
    #[serde(rename = "ERROR", default)]
    pub error: u64,
    #[serde(rename = "WARN", default)]
    pub warn: u64,
}

impl LogCounts {
    pub fn increment(&mut self, level: LogLevel) {
        match level {
            LogLevel::Info => self.info += 1,
            LogLevel::Error => self.error += 1,
            LogLevel::Warn => self.warn += 1,
        }
    }

    pub fn get(&self, level: LogLevel) -> u64 {
        match level {
            LogLevel::Info => self.info,
            LogLevel::Error => self.error,
            LogLevel::Warn => self.warn,
        }
    }

    pub fn total(&self) -> u64 {
        self.info + self.error + self.warn
    }
}

/// Rolling summary for one username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub last_seen: String,
    pub actions: u64,
}

impl UserActivity {
    /// Fresh entry for a user seen for the first time; `touch` counts the action.
    pub fn first_seen(timestamp: &str) -> Self {
        Self {
            last_seen: timestamp.to_owned(),
            actions: 0,
        }
    }

    pub fn touch(&mut self, timestamp: &str) {
        timestamp.clone_into(&mut self.last_seen);
        self.actions += 1;
    }
}

/// API request tallies. Counters only move through `record_request`, so
/// `failed_requests <= total_requests` always holds; `error_rate` is derived.
/// Decoding rejects documents that break the invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawApiErrorStats")]
pub struct ApiErrorStats {
    total_requests: u64,
    failed_requests: u64,
    error_rate: String,
}

#[derive(Deserialize)]
struct RawApiErrorStats {
    total_requests: u64,
    failed_requests: u64,
}

impl TryFrom<RawApiErrorStats> for ApiErrorStats {
    type Error = String;

    // error_rate is not trusted from the document; it is recomputed.
    fn try_from(raw: RawApiErrorStats) -> Result<Self, Self::Error> {
        if raw.failed_requests > raw.total_requests {
            return Err(format!(
                "failed_requests ({}) exceeds total_requests ({})",
                raw.failed_requests, raw.total_requests
            ));
        }
        let mut stats = Self {
            total_requests: raw.total_requests,
            failed_requests: raw.failed_requests,
            error_rate: String::new(),
        };
        stats.refresh_error_rate();
        Ok(stats)
    }
}

impl Default for ApiErrorStats {
    fn default() -> Self {
        Self {
            total_requests: 0,
            failed_requests: 0,
            error_rate: format_error_rate(0, 0),
        }
    }
}

impl ApiErrorStats {
    pub fn record_request(&mut self, failed: bool) {
        self.total_requests += 1;
        if failed {
            self.failed_requests += 1;
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests
    }

    /// Last computed rate; call `refresh_error_rate` after the final request is recorded.
    pub fn error_rate(&self) -> &str {
        &self.error_rate
    }

    pub fn refresh_error_rate(&mut self) {
        self.error_rate = format_error_rate(self.failed_requests, self.total_requests);
    }
}

/// `failed / total * 100` with one decimal and a `%` suffix; `"0%"` when total is 0.
pub fn format_error_rate(failed: u64, total: u64) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    let rate = (failed as f64 / total as f64) * 100.0;
    format!("{:.1}%", rate)
}

/// Everything one aggregation run produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub log_counts: LogCounts,
    pub user_activity: BTreeMap<String, UserActivity>,
    pub api_errors: ApiErrorStats,
}
