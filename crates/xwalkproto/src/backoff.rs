//! Capped exponential backoff, shared by socket re-binds and API retries.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub base: Duration,
    /// Maximum delay between retries (caps exponential growth)
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max: Duration::from_secs(5),
        }
    }
}

impl BackoffConfig {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_transport(transport: &xwalkconf::TransportConfig) -> Self {
        Self::new(transport.reconnect_initial, transport.reconnect_max)
    }

    /// Delay before attempt `attempt` (0 = first try, no delay).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
        let delay = self.base.saturating_mul(multiplier);
        std::cmp::min(delay, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let config = BackoffConfig::default();

        assert_eq!(config.backoff_for_attempt(0), Duration::ZERO);
        assert_eq!(config.backoff_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for_attempt(3), Duration::from_millis(400));

        // 6.4s capped at 5s
        assert_eq!(config.backoff_for_attempt(7), Duration::from_secs(5));
        assert_eq!(config.backoff_for_attempt(100), Duration::from_secs(5));
    }

    #[test]
    fn from_transport_uses_reconnect_bounds() {
        let transport = xwalkconf::TransportConfig::default();
        let backoff = BackoffConfig::from_transport(&transport);
        assert_eq!(backoff.base, transport.reconnect_initial);
        assert_eq!(backoff.max, transport.reconnect_max);
    }
}
