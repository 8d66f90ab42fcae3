//! tunematch-server - music similarity service
//!
//! Downloads a user-supplied track, fingerprints it, finds the most similar
//! song in the reference catalog and records the comparison.
//!
//! Subcommands:
//! - `serve` (default): run the HTTP API
//! - `import-catalog <file>`: load reference songs from JSON

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use tunematch_common::config::{load_toml_config, locate_config_file, prepare_root_folder};
use tunematch_server::config::{CliOverrides, ServiceConfig};
use tunematch_server::db::SqliteCatalog;
use tunematch_server::extractors::{AudioFeatureExtractor, HttpEmbeddingClient, SignalAnalyzer};
use tunematch_server::services::{import_catalog_file, ComparisonService, YtDlpSource};
use tunematch_server::AppState;

const DEFAULT_LOG_FILTER: &str = "tunematch_server=info,tunematch_common=info,tower_http=info";

type LogFilterHandle = reload::Handle<EnvFilter, Registry>;

/// Command-line arguments for tunematch-server
#[derive(Parser, Debug)]
#[command(name = "tunematch-server")]
#[command(about = "Match uploaded tracks against a reference music catalog")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "TUNEMATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, env = "TUNEMATCH_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "TUNEMATCH_BIND_ADDR")]
    bind_addr: Option<String>,

    /// Embedding model server endpoint
    #[arg(long, env = "TUNEMATCH_EMBEDDER_URL")]
    embedder_url: Option<String>,

    /// yt-dlp executable
    #[arg(long, env = "TUNEMATCH_YTDLP_BINARY")]
    ytdlp_binary: Option<String>,

    /// Maximum concurrent download + extraction jobs
    #[arg(long, env = "TUNEMATCH_MAX_CONCURRENT_EXTRACTIONS")]
    max_concurrent_extractions: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Upsert catalog songs from a JSON file
    ImportCatalog {
        /// JSON array of {id, title, url, embedding}
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_filter = init_tracing();

    let args = Args::parse();

    let config_path = locate_config_file(args.config.as_deref());
    let toml_config =
        load_toml_config(config_path.as_deref()).context("Failed to load configuration")?;

    let cli = CliOverrides {
        root_folder: args.root_folder.clone(),
        bind_addr: args.bind_addr.clone(),
        embedder_url: args.embedder_url.clone(),
        ytdlp_binary: args.ytdlp_binary.clone(),
        max_concurrent_extractions: args.max_concurrent_extractions,
    };
    let config = ServiceConfig::resolve(&cli, &toml_config).context("Invalid configuration")?;
    apply_config_log_level(&log_filter, config.log_level.as_deref());

    info!("Starting tunematch-server v{}", env!("CARGO_PKG_VERSION"));
    info!("Root folder: {}", config.root_folder.display());

    let db_path = prepare_root_folder(&config.root_folder)
        .context("Failed to initialize root folder")?;
    let pool = tunematch_common::db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let catalog = SqliteCatalog::new(pool);

    match args.command.unwrap_or(Command::Serve) {
        Command::ImportCatalog { file } => {
            let summary = import_catalog_file(&catalog, &file).await?;
            info!(
                imported = summary.imported,
                rejected = summary.rejected,
                "Imported {}",
                file.display()
            );
            Ok(())
        }
        Command::Serve => serve(config, catalog).await,
    }
}

/// Install the global subscriber before anything logs
///
/// `RUST_LOG` wins; otherwise the default filter stays in place until the
/// config file's `[logging] level` is known.
fn init_tracing() -> LogFilterHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    handle
}

fn apply_config_log_level(handle: &LogFilterHandle, level: Option<&str>) {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return;
    }
    let Some(level) = level else {
        return;
    };

    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                warn!(error = %e, "Failed to apply configured log level");
            }
        }
        Err(e) => warn!(level = level, error = %e, "Ignoring invalid [logging] level"),
    }
}

async fn serve(config: ServiceConfig, catalog: SqliteCatalog) -> Result<()> {
    let embedder = HttpEmbeddingClient::new(config.embedder_url.clone(), config.embedder_timeout)
        .context("Failed to create embedding client")?;
    info!("Embedding model server: {}", embedder.endpoint());

    let extractor = AudioFeatureExtractor::new(
        Arc::new(embedder),
        SignalAnalyzer::new(config.analysis_sample_rate),
    );
    let source = YtDlpSource::new(config.ytdlp_binary.clone(), config.acquisition_timeout);

    let comparison = ComparisonService::new(
        Arc::new(source),
        Arc::new(extractor),
        Arc::new(catalog),
        config.max_concurrent_extractions,
    );

    let state = AppState::new(Arc::new(comparison));
    let app = tunematch_server::build_router(state, &config.cors_allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
