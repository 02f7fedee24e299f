// Parsed log line models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity token of a log line. Only these three are part of the line grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Error,
    Warn,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
        }
    }

    /// Maps the exact upper-case token; anything else is not a level.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "INFO" => Some(LogLevel::Info),
            "ERROR" => Some(LogLevel::Error),
            "WARN" => Some(LogLevel::Warn),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed line. Created per line and applied to the aggregate immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: String,
    pub server: String,
    pub level: LogLevel,
    pub message: String,
}
