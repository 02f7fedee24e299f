use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub output: OutputConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory scanned (non-recursively) for log files.
    pub log_dir: String,
    /// File name suffix that marks a log file.
    pub extension: String,
    /// Cap on distinct users kept in user_activity. Unset = unbounded.
    pub max_tracked_users: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            extension: ".log".into(),
            max_tracked_users: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "output_processed_logs.json".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Serve mode only: re-aggregate every N seconds. 0 disables.
    pub interval_secs: u64,
}

impl AppConfig {
    /// Loads `$CONFIG_FILE`, else `config.toml`. Defaults are used only when no
    /// path was given explicitly and `config.toml` does not exist.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::load_from_path(&path),
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from_path(DEFAULT_CONFIG_PATH)
            }
            Err(_) => {
                tracing::info!("no {} found; using defaults", DEFAULT_CONFIG_PATH);
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("config {}: {}", path.display(), e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            !self.ingest.log_dir.is_empty(),
            "ingest.log_dir must be non-empty"
        );
        anyhow::ensure!(
            !self.ingest.extension.is_empty(),
            "ingest.extension must be non-empty"
        );
        if let Some(max) = self.ingest.max_tracked_users {
            anyhow::ensure!(max > 0, "ingest.max_tracked_users must be > 0, got {}", max);
        }
        anyhow::ensure!(!self.output.path.is_empty(), "output.path must be non-empty");
        Ok(())
    }
}
