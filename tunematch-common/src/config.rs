//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Steps 1 and 2 are handled by clap in the binaries; this module owns the
//! TOML layer and the compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TUNEMATCH_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "TUNEMATCH_ROOT_FOLDER";

/// Database file created inside the root folder
pub const DATABASE_FILE_NAME: &str = "tunematch.db";

/// Contents of `config.toml`
///
/// Every field is optional; absent fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_addr: Option<String>,
    pub max_concurrent_extractions: Option<usize>,
    pub analysis_sample_rate: Option<u32>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub logging: LoggingConfig,
    pub embedder: EmbedderConfig,
    pub acquisition: AcquisitionConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "info" or "tunematch_server=debug"
    pub level: Option<String>,
}

/// `[embedder]` section: the embedding model server
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// `[acquisition]` section: remote audio download
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub ytdlp_binary: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}

/// Locate the config file
///
/// Explicit path (CLI) first, then `TUNEMATCH_CONFIG`, then the per-user and
/// system-wide locations. Returns `None` when nothing exists.
pub fn locate_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("tunematch").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/tunematch/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load the TOML layer
///
/// With no path the service starts on defaults. A path only reaches here when
/// it was given explicitly or already exists, so a missing file is a
/// configuration error, as is a file that does not parse.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!("Config file {} not found", path.display());
        return Err(Error::Config(format!(
            "Config file {} not found",
            path.display()
        )));
    }

    let config = TomlConfig::from_file(path)?;
    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Resolve the root folder (CLI → ENV → TOML → compiled default)
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/tunematch (or /var/lib/tunematch for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("tunematch"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/tunematch"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("tunematch"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/tunematch"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("tunematch"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\tunematch"))
    } else {
        PathBuf::from("./tunematch_data")
    }
}

/// Create the root folder if missing and return the database path inside it
pub fn prepare_root_folder(root_folder: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root_folder)?;
    Ok(root_folder.join(DATABASE_FILE_NAME))
}
