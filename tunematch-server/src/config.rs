//! Service configuration resolution for tunematch-server
//!
//! Every setting resolves CLI → ENV → TOML → compiled default. clap merges
//! the first two into [`CliOverrides`]; the TOML layer comes from
//! `tunematch_common::config`.

use crate::extractors::{DEFAULT_EMBEDDER_TIMEOUT, DEFAULT_EMBEDDER_URL};
use crate::services::acquisition::{DEFAULT_ACQUISITION_TIMEOUT, DEFAULT_YTDLP_BINARY};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tunematch_common::config::{resolve_root_folder, TomlConfig};
use tunematch_common::{Error, Result};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5731";
pub const DEFAULT_MAX_CONCURRENT_EXTRACTIONS: usize = 2;
pub const DEFAULT_ANALYSIS_SAMPLE_RATE: u32 = 22050;
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:3001",
];

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub embedder_url: Option<String>,
    pub ytdlp_binary: Option<String>,
    pub max_concurrent_extractions: Option<usize>,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_addr: SocketAddr,
    pub embedder_url: String,
    pub embedder_timeout: Duration,
    pub ytdlp_binary: String,
    pub acquisition_timeout: Duration,
    pub max_concurrent_extractions: usize,
    pub analysis_sample_rate: u32,
    pub cors_allowed_origins: Vec<String>,
    pub log_level: Option<String>,
}

impl ServiceConfig {
    /// Merge CLI/ENV overrides over the TOML layer and validate the result
    pub fn resolve(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let root_folder = resolve_root_folder(cli.root_folder.as_deref(), toml_config);

        let bind_addr_text = cli
            .bind_addr
            .clone()
            .or_else(|| toml_config.bind_addr.clone())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr_text.parse().map_err(|e| {
            Error::Config(format!("Invalid bind address '{}': {}", bind_addr_text, e))
        })?;

        let max_concurrent_extractions = cli
            .max_concurrent_extractions
            .or(toml_config.max_concurrent_extractions)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_EXTRACTIONS);
        if max_concurrent_extractions == 0 {
            return Err(Error::Config(
                "max_concurrent_extractions must be at least 1".to_string(),
            ));
        }

        let analysis_sample_rate = toml_config
            .analysis_sample_rate
            .unwrap_or(DEFAULT_ANALYSIS_SAMPLE_RATE);
        if analysis_sample_rate == 0 {
            return Err(Error::Config("analysis_sample_rate must be positive".to_string()));
        }

        let embedder_url = cli
            .embedder_url
            .clone()
            .or_else(|| toml_config.embedder.url.clone())
            .unwrap_or_else(|| DEFAULT_EMBEDDER_URL.to_string());

        let ytdlp_binary = cli
            .ytdlp_binary
            .clone()
            .or_else(|| toml_config.acquisition.ytdlp_binary.clone())
            .unwrap_or_else(|| DEFAULT_YTDLP_BINARY.to_string());

        let embedder_timeout = positive_secs(
            toml_config.embedder.timeout_secs,
            DEFAULT_EMBEDDER_TIMEOUT,
            "embedder.timeout_secs",
        )?;
        let acquisition_timeout = positive_secs(
            toml_config.acquisition.timeout_secs,
            DEFAULT_ACQUISITION_TIMEOUT,
            "acquisition.timeout_secs",
        )?;

        let cors_allowed_origins = toml_config
            .cors_allowed_origins
            .clone()
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect());

        Ok(Self {
            root_folder,
            bind_addr,
            embedder_url,
            embedder_timeout,
            ytdlp_binary,
            acquisition_timeout,
            max_concurrent_extractions,
            analysis_sample_rate,
            cors_allowed_origins,
            log_level: toml_config.logging.level.clone(),
        })
    }
}

fn positive_secs(value: Option<u64>, default: Duration, name: &str) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(0) => Err(Error::Config(format!("{} must be positive", name))),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}
