use anyhow::Result;
use clap::{Parser, Subcommand};
use logprocessor::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "logprocessor",
    version,
    about = "Aggregate log files into a JSON snapshot and serve it over HTTP"
)]
struct Cli {
    /// Path to the config file (overrides CONFIG_FILE / ./config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the log directory once, write the snapshot and exit (default)
    Aggregate,
    /// Serve the latest snapshot on GET /logs
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = match &cli.config {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    let store = Arc::new(snapshot_store::SnapshotStore::new(&app_config.output.path));

    match cli.command.unwrap_or(Command::Aggregate) {
        Command::Aggregate => {
            aggregation_worker::run_once(&app_config, &store).await?;
            Ok(())
        }
        Command::Serve => serve(app_config, store).await,
    }
}

async fn serve(
    app_config: config::AppConfig,
    store: Arc<snapshot_store::SnapshotStore>,
) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let refresh_handle = (app_config.refresh.interval_secs > 0)
        .then(|| aggregation_worker::spawn(app_config.clone(), store.clone(), shutdown_rx));

    let app = routes::app(store);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    if let Some(handle) = refresh_handle {
        let _ = handle.await;
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
