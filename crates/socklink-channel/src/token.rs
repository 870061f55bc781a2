use std::fmt;
use std::sync::Mutex;

use serde_json::Value;

/// Source of the caller-session authentication token.
///
/// The token is read at submission time and attached to the exact document
/// that is transmitted, even if the payload is queued and flushed later.
/// Absence of a token is not an error; the payload is sent without one.
pub trait TokenSource: Send + Sync {
    fn current_token(&self) -> Option<String>;
}

/// Token source holding a replaceable in-memory value.
pub struct StaticTokenSource {
    token: Mutex<Option<String>>,
}

impl StaticTokenSource {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    /// Replace the stored token. Later submissions pick up the new value;
    /// already-submitted payloads keep the token they were stamped with.
    pub fn set(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(|err| err.into_inner()) = token;
    }
}

impl TokenSource for StaticTokenSource {
    fn current_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

impl fmt::Debug for StaticTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.token.lock().unwrap_or_else(|err| err.into_inner());
        match guard.as_ref() {
            Some(token) => write!(f, "StaticTokenSource(<redacted:{} bytes>)", token.len()),
            None => f.write_str("StaticTokenSource(None)"),
        }
    }
}

/// Insert the session token into an object payload. Non-object payloads are
/// left untouched.
pub(crate) fn attach(payload: &mut Value, token: &str) {
    if let Value::Object(map) = payload {
        map.insert("token".to_string(), Value::String(token.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn attaches_token_to_object_payloads() {
        let mut payload = json!({"id": "tag-1"});
        attach(&mut payload, "secret-1");
        assert_eq!(payload, json!({"id": "tag-1", "token": "secret-1"}));
    }

    #[test]
    fn leaves_non_object_payloads_untouched() {
        let mut payload = json!([1, 2, 3]);
        attach(&mut payload, "secret-1");
        assert_eq!(payload, json!([1, 2, 3]));
    }

    #[test]
    fn static_source_returns_latest_value() {
        let source = StaticTokenSource::new(Some("first".to_string()));
        assert_eq!(source.current_token().as_deref(), Some("first"));

        source.set(Some("second".to_string()));
        assert_eq!(source.current_token().as_deref(), Some("second"));

        source.set(None);
        assert!(source.current_token().is_none());
    }

    #[test]
    fn debug_output_redacts_token() {
        let source = StaticTokenSource::new(Some("super-secret".to_string()));
        let debug = format!("{source:?}");
        assert!(debug.contains("<redacted:12 bytes>"));
        assert!(!debug.contains("super-secret"));
    }
}
