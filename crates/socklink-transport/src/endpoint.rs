use std::fmt;

/// Network location of a channel backend.
///
/// The `secure` flag selects `wss://` over `ws://`; the original deployment
/// derives it from whether the hosting page was served over a secure origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl Endpoint {
    /// Plain-text endpoint (`ws://`).
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            secure: false,
        }
    }

    /// TLS endpoint (`wss://`).
    pub fn secure(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            secure: true,
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "wss"
        } else {
            "ws"
        }
    }

    /// Full connection URL for a logical channel id:
    /// `ws[s]://<host>:<port>/ws/<logicalId>`.
    pub fn url(&self, logical_id: &str) -> String {
        format!(
            "{}://{}:{}/ws/{}",
            self.scheme(),
            self.host,
            self.port,
            logical_id
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_endpoint_uses_ws_scheme() {
        let endpoint = Endpoint::new("localhost", 8765);
        assert_eq!(endpoint.url("tag-1"), "ws://localhost:8765/ws/tag-1");
    }

    #[test]
    fn secure_endpoint_uses_wss_scheme() {
        let endpoint = Endpoint::secure("dash.example.com", 443);
        assert_eq!(
            endpoint.url("carousel"),
            "wss://dash.example.com:443/ws/carousel"
        );
    }

    #[test]
    fn display_is_host_and_port() {
        assert_eq!(Endpoint::new("127.0.0.1", 9000).to_string(), "127.0.0.1:9000");
    }
}
