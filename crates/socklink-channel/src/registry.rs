use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use socklink_transport::{Endpoint, Transport};
use tracing::debug;

use crate::config::ChannelConfig;
use crate::indicator::{IndicatorCoordinator, IndicatorSink, LogIndicator};
use crate::instance::{self, ChannelHandle, InstanceSettings};
use crate::token::TokenSource;

/// Identity of a channel instance: one logical connection per
/// `(endpoint, logicalId)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub endpoint: Endpoint,
    pub logical_id: String,
}

impl ChannelKey {
    /// Connection URL for this key.
    pub fn url(&self) -> String {
        self.endpoint.url(&self.logical_id)
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/ws/{}", self.endpoint, self.logical_id)
    }
}

/// Process-wide registry of channel instances.
///
/// One instance exists per key; concurrent lookups for the same key share it.
/// The registry is an explicit object owned by the application root rather
/// than process-global state, so hosts control its lifetime and wiring.
pub struct ChannelRegistry {
    transport: Arc<dyn Transport>,
    config: ChannelConfig,
    token_source: Option<Arc<dyn TokenSource>>,
    indicator_sink: Arc<dyn IndicatorSink>,
    channels: Mutex<HashMap<ChannelKey, ChannelHandle>>,
}

impl ChannelRegistry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: ChannelConfig::default(),
            token_source: None,
            indicator_sink: Arc::new(LogIndicator),
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    pub fn with_indicator_sink(mut self, sink: Arc<dyn IndicatorSink>) -> Self {
        self.indicator_sink = sink;
        self
    }

    /// Look up or create the instance for `(endpoint, logical_id)`.
    ///
    /// Creation starts connecting immediately. Looking up an existing
    /// instance triggers a connection health check: if its connection is not
    /// usable it reconnects with a fresh retry budget, which is also how a
    /// failed instance is resurrected. The instance map is locked for the
    /// whole operation, so interleaved calls with one key yield one instance.
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_or_connect(
        &self,
        endpoint: Endpoint,
        logical_id: &str,
        indicator_enabled: bool,
    ) -> ChannelHandle {
        let key = ChannelKey {
            endpoint,
            logical_id: logical_id.to_string(),
        };

        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match channels.entry(key) {
            Entry::Occupied(entry) => {
                debug!(key = %entry.key(), "reusing channel instance");
                let handle = entry.get().clone();
                let _ = handle.ensure_connected();
                handle
            }
            Entry::Vacant(slot) => {
                debug!(key = %slot.key(), "creating channel instance");
                let indicator = indicator_enabled
                    .then(|| IndicatorCoordinator::spawn(Arc::clone(&self.indicator_sink)));
                let handle = instance::spawn(InstanceSettings {
                    key: slot.key().clone(),
                    config: self.config.clone(),
                    transport: Arc::clone(&self.transport),
                    token_source: self.token_source.clone(),
                    indicator,
                });
                slot.insert(handle.clone());
                handle
            }
        }
    }

    /// Number of live channel instances.
    pub fn active(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use socklink_transport::{TransportError, WireSink, WireStream};

    use super::*;

    /// Transport whose connections are always refused; enough for testing
    /// registry bookkeeping.
    struct RefusingTransport;

    #[async_trait]
    impl Transport for RefusingTransport {
        async fn connect(
            &self,
            url: &str,
        ) -> socklink_transport::Result<(Box<dyn WireSink>, Box<dyn WireStream>)> {
            Err(TransportError::Connect {
                url: url.to_string(),
                reason: "refused".to_string(),
            })
        }
    }

    fn registry() -> ChannelRegistry {
        ChannelRegistry::new(Arc::new(RefusingTransport))
    }

    #[tokio::test]
    async fn same_key_yields_the_same_instance() {
        let registry = registry();
        let first = registry.get_or_connect(Endpoint::new("localhost", 9000), "tag-1", false);
        let second = registry.get_or_connect(Endpoint::new("localhost", 9000), "tag-1", false);

        assert!(first.same_instance(&second));
        assert_eq!(registry.active(), 1);
    }

    #[tokio::test]
    async fn distinct_logical_ids_get_distinct_instances() {
        let registry = registry();
        let first = registry.get_or_connect(Endpoint::new("localhost", 9000), "tag-1", false);
        let second = registry.get_or_connect(Endpoint::new("localhost", 9000), "tag-2", false);

        assert!(!first.same_instance(&second));
        assert_eq!(registry.active(), 2);
    }

    #[tokio::test]
    async fn interleaved_lookups_never_create_two_instances() {
        let registry = Arc::new(registry());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.get_or_connect(Endpoint::new("localhost", 9000), "tag-1", false)
            }));
        }

        let mut resolved = Vec::new();
        for handle in handles {
            resolved.push(handle.await.expect("lookup task should not panic"));
        }
        assert_eq!(registry.active(), 1);
        for pair in resolved.windows(2) {
            assert!(pair[0].same_instance(&pair[1]));
        }
    }

    #[test]
    fn key_display_includes_endpoint_and_id() {
        let key = ChannelKey {
            endpoint: Endpoint::new("localhost", 9000),
            logical_id: "tag-1".to_string(),
        };
        assert_eq!(key.to_string(), "localhost:9000/ws/tag-1");
    }
}
