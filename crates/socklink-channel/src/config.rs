use std::time::Duration;

/// Tuning knobs for a channel instance.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// How long a connection attempt may wait for the transport handshake
    /// before it is abandoned and counted as a failure.
    pub connect_timeout: Duration,
    /// Delay between losing a connection and the next automatic attempt.
    pub reconnect_delay: Duration,
    /// Consecutive failed attempts tolerated before the instance stops
    /// reconnecting on its own.
    pub max_retries: u32,
    /// Maximum number of outbound payloads held while disconnected. When the
    /// queue is full the oldest payload is evicted.
    pub max_queued: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(1),
            max_retries: 2,
            max_queued: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = ChannelConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_queued, 1024);
    }
}
