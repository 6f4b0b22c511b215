//! Config file discovery, loading, and environment variable overlay.

use crate::{duration, ConfigError, XwalkConfig};
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
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/xwalk/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("xwalk/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("xwalk.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a config file into a raw TOML table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a single config file on its own (no layering, no env).
pub fn load_from_file(path: &Path) -> Result<XwalkConfig, ConfigError> {
    let table = load_table(path)?;
    from_table(table, path)
}

/// Deserialize a merged table into a config, filling defaults.
pub fn from_table(table: toml::Table, path: &Path) -> Result<XwalkConfig, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Merge `overlay` into `base`, key by key. Nested tables merge recursively;
/// any other value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
///
/// Variable names match what station processes already read, so a single
/// environment file can drive the controller and every station.
pub fn apply_env_overrides(config: &mut XwalkConfig, sources: &mut ConfigSources) {
    // Station-side endpoints
    if let Ok(v) = env::var("XWALK_INTERACTION") {
        config.infra.connect.interactions = v;
        sources.env_overrides.push("XWALK_INTERACTION".to_string());
    }
    if let Ok(v) = env::var("XWALK_CONTROLLER") {
        config.infra.connect.control = v;
        sources.env_overrides.push("XWALK_CONTROLLER".to_string());
    }
    if let Ok(v) = env::var("XWALK_HEARTBEAT") {
        config.infra.connect.heartbeats = v;
        sources.env_overrides.push("XWALK_HEARTBEAT".to_string());
    }
    if let Ok(v) = env::var("XWALK_API") {
        config.infra.connect.api = v;
        sources.env_overrides.push("XWALK_API".to_string());
    }
    if let Ok(v) = env::var("XWALK_HOSTNAME") {
        config.infra.connect.hostname = v;
        sources.env_overrides.push("XWALK_HOSTNAME".to_string());
    }

    // Telemetry
    if let Ok(v) = env::var("XWALK_OTLP_ENDPOINT") {
        config.infra.telemetry.otlp_endpoint = v;
        sources.env_overrides.push("XWALK_OTLP_ENDPOINT".to_string());
    }
    if let Ok(v) = env::var("XWALK_LOG_LEVEL") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("XWALK_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.infra.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    // Runtime seeds
    if let Ok(v) = env::var("XWALK_CATALOG") {
        config.bootstrap.catalog.path = expand_path(&v);
        sources.env_overrides.push("XWALK_CATALOG".to_string());
    }
    if let Ok(v) = env::var("XWALK_HEARTBEAT_TIMEOUT") {
        if let Ok(timeout) = duration::parse(&v) {
            config.bootstrap.liveness.heartbeat_timeout = timeout;
            sources.env_overrides.push("XWALK_HEARTBEAT_TIMEOUT".to_string());
        }
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
