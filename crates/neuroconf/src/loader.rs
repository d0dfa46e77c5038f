//! Config file discovery, loading, and environment variable overlay.

use crate::infra::{BindConfig, PathsConfig, TelemetryConfig};
use crate::{CaptureConfig, ConfigError};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    // System config
    let system = PathBuf::from("/etc/neuromotion/config.toml");
    if system.exists() {
        files.push(system);
    }

    // User config (XDG_CONFIG_HOME or ~/.config)
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("neuromotion/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    // CLI override takes precedence over local
    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    // Local override (current directory)
    let local = PathBuf::from("neuromotion.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<CaptureConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from TOML string.
fn parse_toml(contents: &str, path: &Path) -> Result<CaptureConfig, ConfigError> {
    // Parse as raw TOML table first so missing sections fall back to defaults
    let table: toml::Table = contents
        .parse()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut config = CaptureConfig::default();

    if let Some(paths) = table.get("paths").and_then(|v| v.as_table()) {
        if let Some(v) = paths.get("records_dir").and_then(|v| v.as_str()) {
            config.paths.records_dir = expand_path(v);
        }
    }

    if let Some(bind) = table.get("bind").and_then(|v| v.as_table()) {
        if let Some(v) = bind.get("http_port").and_then(|v| v.as_integer()) {
            config.bind.http_port = v as u16;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(config)
}

/// Merge two configs, with `overlay` taking precedence.
///
/// A field wins only if it differs from the compiled default, so a later
/// file that omits a section does not clobber an earlier file's value.
pub fn merge_configs(base: CaptureConfig, overlay: CaptureConfig) -> CaptureConfig {
    CaptureConfig {
        paths: PathsConfig {
            records_dir: if overlay.paths.records_dir != PathsConfig::default().records_dir {
                overlay.paths.records_dir
            } else {
                base.paths.records_dir
            },
        },
        bind: BindConfig {
            http_port: if overlay.bind.http_port != BindConfig::default().http_port {
                overlay.bind.http_port
            } else {
                base.bind.http_port
            },
        },
        telemetry: TelemetryConfig {
            log_level: if overlay.telemetry.log_level != TelemetryConfig::default().log_level {
                overlay.telemetry.log_level
            } else {
                base.telemetry.log_level
            },
        },
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut CaptureConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("NEUROMOTION_RECORDS_DIR") {
        config.paths.records_dir = expand_path(&v);
        sources
            .env_overrides
            .push("NEUROMOTION_RECORDS_DIR".to_string());
    }

    if let Ok(v) = env::var("NEUROMOTION_HTTP_PORT") {
        if let Ok(port) = v.parse() {
            config.bind.http_port = port;
            sources
                .env_overrides
                .push("NEUROMOTION_HTTP_PORT".to_string());
        }
    }

    if let Ok(v) = env::var("NEUROMOTION_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources
            .env_overrides
            .push("NEUROMOTION_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/test/path");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_absolute() {
        let expanded = expand_path("/absolute/path");
        assert_eq!(expanded, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
[paths]
records_dir = "/custom/records"
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.paths.records_dir, PathBuf::from("/custom/records"));
        // Other values should be defaults
        assert_eq!(config.bind.http_port, 5000);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[paths]
records_dir = "/data/sessions"

[bind]
http_port = 9000

[telemetry]
log_level = "debug"
"#;
        let config = parse_toml(toml, Path::new("test.toml")).unwrap();

        assert_eq!(config.paths.records_dir, PathBuf::from("/data/sessions"));
        assert_eq!(config.bind.http_port, 9000);
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_parse_bad_toml() {
        let err = parse_toml("not [ valid", Path::new("bad.toml"));
        assert!(err.is_err());
    }

    #[test]
    fn test_merge_overlay_wins() {
        let base = parse_toml("[bind]\nhttp_port = 9000", Path::new("a.toml")).unwrap();
        let overlay = parse_toml("[bind]\nhttp_port = 9001", Path::new("b.toml")).unwrap();
        let merged = merge_configs(base, overlay);
        assert_eq!(merged.bind.http_port, 9001);
    }

    #[test]
    fn test_merge_default_does_not_clobber() {
        let base = parse_toml("[bind]\nhttp_port = 9000", Path::new("a.toml")).unwrap();
        let overlay = parse_toml("[paths]\nrecords_dir = \"/r\"", Path::new("b.toml")).unwrap();
        let merged = merge_configs(base, overlay);
        assert_eq!(merged.bind.http_port, 9000);
        assert_eq!(merged.paths.records_dir, PathBuf::from("/r"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[bind]\nhttp_port = 8123").unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.bind.http_port, 8123);
    }
}
