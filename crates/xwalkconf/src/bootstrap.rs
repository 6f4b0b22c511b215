//! Bootstrap configuration - seeds runtime state, then runtime owns it.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Heartbeat classification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// A component with no heartbeat for longer than this is STALE.
    /// Default: 5s
    #[serde(default = "LivenessConfig::default_heartbeat_timeout", with = "crate::duration")]
    pub heartbeat_timeout: Duration,

    /// How often the controller sweeps for newly stale components.
    /// Default: 1s
    #[serde(default = "LivenessConfig::default_sweep_interval", with = "crate::duration")]
    pub sweep_interval: Duration,

    /// Component ids registered at startup so they report UNKNOWN
    /// until their first heartbeat instead of being absent.
    #[serde(default)]
    pub expected: Vec<String>,
}

impl LivenessConfig {
    fn default_heartbeat_timeout() -> Duration {
        Duration::from_secs(5)
    }

    fn default_sweep_interval() -> Duration {
        Duration::from_secs(1)
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Self::default_heartbeat_timeout(),
            sweep_interval: Self::default_sweep_interval(),
            expected: Vec::new(),
        }
    }
}

/// Where the walk catalog document lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the catalog YAML (categories, walks, weights, menu).
    /// Default: static/data/config.yaml
    #[serde(default = "CatalogConfig::default_path")]
    pub path: PathBuf,
}

impl CatalogConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("static/data/config.yaml")
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
        }
    }
}

/// Everything that seeds runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub liveness: LivenessConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}
