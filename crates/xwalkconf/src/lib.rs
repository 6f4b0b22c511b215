//! Minimal configuration loading for the crosswalk controller and stations.
//!
//! Configuration is split into two categories:
//!
//! - **Infrastructure** (`InfraConfig`): bind and connect endpoints,
//!   telemetry, transport timing. Fixed for the life of the process.
//!
//! - **Bootstrap** (`BootstrapConfig`): values that seed runtime state,
//!   such as the catalog path and heartbeat timeout.
//!
//! The walk catalog itself (categories, weights, menu) is a separate YAML
//! document owned by the controller; this crate only knows where it lives.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/xwalk/config.toml` (system)
//! 2. `~/.config/xwalk/config.toml` (user)
//! 3. `./xwalk.toml` or the `--config` path (local override)
//! 4. Environment variables (`XWALK_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [bind]
//! interactions = "tcp://*:5556"
//! control = "tcp://*:5557"
//! heartbeats = "tcp://*:5558"
//! api = "tcp://*:5559"
//!
//! [telemetry]
//! log_level = "info"
//!
//! [liveness]
//! heartbeat_timeout = "5s"
//! expected = ["button_switch", "matrix_driver", "button_lights", "timer"]
//!
//! [catalog]
//! path = "/srv/xwalk/config.yaml"
//! ```

pub mod bootstrap;
pub mod duration;
pub mod infra;
pub mod loader;

pub use bootstrap::{BootstrapConfig, CatalogConfig, LivenessConfig};
pub use infra::{BindConfig, ConnectConfig, InfraConfig, TelemetryConfig, TransportConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
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

/// Complete crosswalk configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct XwalkConfig {
    /// Infrastructure - cannot change at runtime.
    #[serde(flatten)]
    pub infra: InfraConfig,

    /// Bootstrap - seeds runtime state.
    #[serde(flatten)]
    pub bootstrap: BootstrapConfig,
}

impl XwalkConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an optional explicit file, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over `./xwalk.toml`.
    /// System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::FileRead {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "config file does not exist",
                    ),
                });
            }
        }

        let mut merged = toml::Table::new();
        let mut last_path = PathBuf::from("<defaults>");
        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            last_path = path.clone();
            sources.files.push(path);
        }

        let mut config = loader::from_table(merged, &last_path)?;
        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Crosswalk Configuration\n\n");

        let bind = &self.infra.bind;
        output.push_str("[bind]\n");
        output.push_str(&format!("interactions = \"{}\"\n", bind.interactions));
        output.push_str(&format!("control = \"{}\"\n", bind.control));
        output.push_str(&format!("heartbeats = \"{}\"\n", bind.heartbeats));
        output.push_str(&format!("api = \"{}\"\n", bind.api));

        let connect = &self.infra.connect;
        output.push_str("\n[connect]\n");
        output.push_str(&format!("interactions = \"{}\"\n", connect.interactions));
        output.push_str(&format!("control = \"{}\"\n", connect.control));
        output.push_str(&format!("heartbeats = \"{}\"\n", connect.heartbeats));
        output.push_str(&format!("api = \"{}\"\n", connect.api));
        output.push_str(&format!("hostname = \"{}\"\n", connect.hostname));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "otlp_endpoint = \"{}\"\n",
            self.infra.telemetry.otlp_endpoint
        ));
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.infra.telemetry.log_level
        ));

        let transport = &self.infra.transport;
        output.push_str("\n[transport]\n");
        output.push_str(&format!(
            "send_timeout = \"{}\"\n",
            duration::format(transport.send_timeout)
        ));
        output.push_str(&format!(
            "reconnect_initial = \"{}\"\n",
            duration::format(transport.reconnect_initial)
        ));
        output.push_str(&format!(
            "reconnect_max = \"{}\"\n",
            duration::format(transport.reconnect_max)
        ));
        output.push_str(&format!("queue_depth = {}\n", transport.queue_depth));
        output.push_str(&format!(
            "request_timeout = \"{}\"\n",
            duration::format(transport.request_timeout)
        ));
        output.push_str(&format!("request_retries = {}\n", transport.request_retries));

        let liveness = &self.bootstrap.liveness;
        output.push_str("\n[liveness]\n");
        output.push_str(&format!(
            "heartbeat_timeout = \"{}\"\n",
            duration::format(liveness.heartbeat_timeout)
        ));
        output.push_str(&format!(
            "sweep_interval = \"{}\"\n",
            duration::format(liveness.sweep_interval)
        ));
        output.push_str("expected = [\n");
        for id in &liveness.expected {
            output.push_str(&format!("    \"{}\",\n", id));
        }
        output.push_str("]\n");

        output.push_str("\n[catalog]\n");
        output.push_str(&format!(
            "path = \"{}\"\n",
            self.bootstrap.catalog.path.display()
        ));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = XwalkConfig::default();
        assert_eq!(config.infra.bind.interactions, "tcp://*:5556");
        assert_eq!(config.infra.connect.control, "tcp://localhost:5557");
        assert_eq!(config.bootstrap.liveness.heartbeat_timeout, Duration::from_secs(5));
        assert!(config.bootstrap.liveness.expected.is_empty());
    }

    #[test]
    fn test_to_toml() {
        let config = XwalkConfig::default();
        let toml = config.to_toml();
        assert!(toml.contains("[bind]"));
        assert!(toml.contains("[transport]"));
        assert!(toml.contains("[liveness]"));
        assert!(toml.contains("heartbeat_timeout = \"5s\""));
    }

    #[test]
    fn test_to_toml_parses_back() {
        let mut config = XwalkConfig::default();
        config.bootstrap.liveness.expected = vec!["timer".to_string()];
        config.infra.transport.send_timeout = Duration::from_millis(250);

        let table: toml::Table = config.to_toml().parse().unwrap();
        let reparsed = loader::from_table(table, Path::new("printed")).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let err = XwalkConfig::load_from(Some(Path::new("/no/such/xwalk.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("station.toml");
        std::fs::write(&path, "[liveness]\nsweep_interval = \"2s\"\n").unwrap();

        let (config, sources) = XwalkConfig::load_with_sources_from(Some(&path)).unwrap();
        assert_eq!(config.bootstrap.liveness.sweep_interval, Duration::from_secs(2));
        assert_eq!(sources.files.last(), Some(&path));
    }
}
