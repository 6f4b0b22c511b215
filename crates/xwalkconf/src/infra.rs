//! Infrastructure configuration - things that cannot change at runtime.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Controller-side bind addresses.
///
/// The controller owns every socket on the bus; stations connect to these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindConfig {
    /// SUB socket receiving interaction events from stations.
    /// Default: tcp://*:5556
    #[serde(default = "BindConfig::default_interactions")]
    pub interactions: String,

    /// PUB socket broadcasting control commands.
    /// Default: tcp://*:5557
    #[serde(default = "BindConfig::default_control")]
    pub control: String,

    /// SUB socket receiving heartbeats.
    /// Default: tcp://*:5558
    #[serde(default = "BindConfig::default_heartbeats")]
    pub heartbeats: String,

    /// ROUTER socket answering API requests.
    /// Default: tcp://*:5559
    #[serde(default = "BindConfig::default_api")]
    pub api: String,
}

impl BindConfig {
    fn default_interactions() -> String {
        "tcp://*:5556".to_string()
    }

    fn default_control() -> String {
        "tcp://*:5557".to_string()
    }

    fn default_heartbeats() -> String {
        "tcp://*:5558".to_string()
    }

    fn default_api() -> String {
        "tcp://*:5559".to_string()
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            interactions: Self::default_interactions(),
            control: Self::default_control(),
            heartbeats: Self::default_heartbeats(),
            api: Self::default_api(),
        }
    }
}

/// Station-side endpoints, used by anything that talks to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectConfig {
    #[serde(default = "ConnectConfig::default_interactions")]
    pub interactions: String,

    #[serde(default = "ConnectConfig::default_control")]
    pub control: String,

    #[serde(default = "ConnectConfig::default_heartbeats")]
    pub heartbeats: String,

    #[serde(default = "ConnectConfig::default_api")]
    pub api: String,

    /// Host name stamped on heartbeats and interactions.
    /// Default: crosswalk-unknown
    #[serde(default = "ConnectConfig::default_hostname")]
    pub hostname: String,
}

impl ConnectConfig {
    fn default_interactions() -> String {
        "tcp://localhost:5556".to_string()
    }

    fn default_control() -> String {
        "tcp://localhost:5557".to_string()
    }

    fn default_heartbeats() -> String {
        "tcp://localhost:5558".to_string()
    }

    fn default_api() -> String {
        "tcp://localhost:5559".to_string()
    }

    fn default_hostname() -> String {
        "crosswalk-unknown".to_string()
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            interactions: Self::default_interactions(),
            control: Self::default_control(),
            heartbeats: Self::default_heartbeats(),
            api: Self::default_api(),
            hostname: Self::default_hostname(),
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP gRPC endpoint for OpenTelemetry. Empty disables export.
    /// Default: "" (disabled)
    #[serde(default)]
    pub otlp_endpoint: String,

    /// Log level or EnvFilter directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    /// OTLP endpoint if export is enabled.
    pub fn otlp(&self) -> Option<&str> {
        let endpoint = self.otlp_endpoint.trim();
        (!endpoint.is_empty()).then_some(endpoint)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: String::new(),
            log_level: Self::default_log_level(),
        }
    }
}

/// Transport timing: send bounds, reconnect backoff, queue sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Upper bound on a single publish. A publish that exceeds it is dropped.
    /// Default: 1s
    #[serde(default = "TransportConfig::default_send_timeout", with = "crate::duration")]
    pub send_timeout: Duration,

    /// First delay before re-binding a failed socket (doubles per attempt).
    /// Default: 100ms
    #[serde(default = "TransportConfig::default_reconnect_initial", with = "crate::duration")]
    pub reconnect_initial: Duration,

    /// Cap on the re-bind delay.
    /// Default: 5s
    #[serde(default = "TransportConfig::default_reconnect_max", with = "crate::duration")]
    pub reconnect_max: Duration,

    /// Depth of the single inbound event queue.
    /// Default: 1024
    #[serde(default = "TransportConfig::default_queue_depth")]
    pub queue_depth: usize,

    /// Per-attempt timeout for API requests made by clients.
    /// Default: 5s
    #[serde(default = "TransportConfig::default_request_timeout", with = "crate::duration")]
    pub request_timeout: Duration,

    /// Retry attempts for API requests made by clients.
    /// Default: 3
    #[serde(default = "TransportConfig::default_request_retries")]
    pub request_retries: u32,
}

impl TransportConfig {
    fn default_send_timeout() -> Duration {
        Duration::from_secs(1)
    }

    fn default_reconnect_initial() -> Duration {
        Duration::from_millis(100)
    }

    fn default_reconnect_max() -> Duration {
        Duration::from_secs(5)
    }

    fn default_queue_depth() -> usize {
        1024
    }

    fn default_request_timeout() -> Duration {
        Duration::from_secs(5)
    }

    fn default_request_retries() -> u32 {
        3
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            send_timeout: Self::default_send_timeout(),
            reconnect_initial: Self::default_reconnect_initial(),
            reconnect_max: Self::default_reconnect_max(),
            queue_depth: Self::default_queue_depth(),
            request_timeout: Self::default_request_timeout(),
            request_retries: Self::default_request_retries(),
        }
    }
}

/// Complete infrastructure configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct InfraConfig {
    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub connect: ConnectConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub transport: TransportConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otlp_disabled_when_blank() {
        let mut telemetry = TelemetryConfig::default();
        assert_eq!(telemetry.otlp(), None);

        telemetry.otlp_endpoint = "  ".to_string();
        assert_eq!(telemetry.otlp(), None);

        telemetry.otlp_endpoint = "127.0.0.1:4317".to_string();
        assert_eq!(telemetry.otlp(), Some("127.0.0.1:4317"));
    }
}
