// Shared test helpers

#![allow(dead_code)]

use logprocessor::config::IngestConfig;
use std::path::{Path, PathBuf};

pub const ALICE_LOGIN: &str = "[2024-01-01T10:00:00] srv1 INFO User 'alice' logged in";
pub const ALICE_API_FAILURE: &str = "[2024-01-01T10:05:00] srv1 ERROR API request failed for alice";

pub fn write_log(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut body = lines.join("\n");
    body.push('\n');
    std::fs::write(&path, body).unwrap();
    path
}

pub fn ingest_config(dir: &Path) -> IngestConfig {
    IngestConfig {
        log_dir: dir.to_str().unwrap().to_string(),
        ..IngestConfig::default()
    }
}
