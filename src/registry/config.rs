//! Registry configuration

/// Subscriber registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Outbound buffer per push connection, in frames
    pub channel_capacity: usize,

    /// Consecutive full-buffer skips after which a subscriber is dropped
    pub max_consecutive_lags: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            max_consecutive_lags: 32,
        }
    }
}

impl RegistryConfig {
    /// Set the per-connection outbound buffer size
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Set how many consecutive skipped frames a subscriber may accumulate
    pub fn max_consecutive_lags(mut self, lags: u32) -> Self {
        self.max_consecutive_lags = lags.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.channel_capacity, 64);
        assert_eq!(config.max_consecutive_lags, 32);
    }

    #[test]
    fn test_builder_clamps_zero() {
        let config = RegistryConfig::default()
            .channel_capacity(0)
            .max_consecutive_lags(0);

        assert_eq!(config.channel_capacity, 1);
        assert_eq!(config.max_consecutive_lags, 1);
    }
}
