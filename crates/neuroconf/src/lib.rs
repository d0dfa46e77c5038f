//! Minimal configuration loading for Neuromotion Capture.
//!
//! Everything here is infrastructure configuration: values that are fixed
//! for the lifetime of the process (where records land on disk, which port
//! the HTTP server binds, how chatty the logs are). Runtime session state
//! lives in the server, not here.
//!
//! # Usage
//!
//! ```rust,no_run
//! use neuroconf::CaptureConfig;
//!
//! let config = CaptureConfig::load().expect("Failed to load config");
//! println!("records dir: {}", config.paths.records_dir.display());
//! println!("HTTP port: {}", config.bind.http_port);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/neuromotion/config.toml` (system)
//! 2. `~/.config/neuromotion/config.toml` (user)
//! 3. `./neuromotion.toml` (local override)
//! 4. Environment variables (`NEUROMOTION_*`)
//!
//! # Example Config
//!
//! ```toml
//! [paths]
//! records_dir = "./data"
//!
//! [bind]
//! http_port = 5000
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod infra;
pub mod loader;

pub use infra::{BindConfig, PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete Neuromotion Capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaptureConfig {
    /// Filesystem paths.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Network bind settings.
    #[serde(default)]
    pub bind: BindConfig,

    /// Telemetry settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl CaptureConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/neuromotion/config.toml`
    /// 3. `~/.config/neuromotion/config.toml`
    /// 4. `./neuromotion.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided it takes precedence over the local
    /// `./neuromotion.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = CaptureConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let overlay = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, overlay);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }
}
