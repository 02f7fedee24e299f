// Line grammar: `[<timestamp>] <server> <LEVEL> <message>`

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{LogLevel, LogRecord};

static LINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]]+)\] (\S+) (INFO|ERROR|WARN) (.*)$").expect("line pattern is valid")
});

static USER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"User '([^']*)'").expect("user pattern is valid"));

/// Marker for a user reference inside a message.
pub const USER_MARKER: &str = "User '";
/// Substring that marks an API request as failed.
pub const FAILED_REQUEST_MARKER: &str = "API request failed";

/// Parses one raw line. Surrounding whitespace (including `\r`) is ignored.
/// Returns `None` for anything outside the grammar; that is not an error.
pub fn parse_line(line: &str) -> Option<LogRecord> {
    let caps = LINE_PATTERN.captures(line.trim())?;
    let level = LogLevel::from_token(&caps[3])?;
    Some(LogRecord {
        timestamp: caps[1].to_string(),
        server: caps[2].to_string(),
        level,
        message: caps[4].to_string(),
    })
}

/// True when the message should update per-user activity: it carries a user
/// reference and mentions either a login or an access.
pub fn mentions_user_activity(message: &str) -> bool {
    message.contains(USER_MARKER) && (message.contains("logged") || message.contains("accessed"))
}

/// First `User '<name>'` reference in the message.
pub fn extract_user(message: &str) -> Option<&str> {
    USER_PATTERN
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn is_failed_request(message: &str) -> bool {
    message.contains(FAILED_REQUEST_MARKER)
}
