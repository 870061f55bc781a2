use std::fmt;

/// Connection lifecycle of a channel instance.
///
/// `Closed` always re-enters `Connecting` after the reconnect delay while the
/// retry budget lasts; `Failed` is terminal for automatic attempts and left
/// only through an explicit `get_or_connect` or a new submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Point-in-time snapshot of a channel instance, served by
/// [`crate::ChannelHandle::status`].
#[derive(Debug, Clone)]
pub struct ChannelStatus {
    pub state: ConnectionState,
    /// Consecutive failed connection attempts since the last successful open.
    pub retry_count: u32,
    /// Outbound payloads waiting for the next open connection.
    pub queued: usize,
    /// Registered subscribers.
    pub subscribers: usize,
    /// Current connection generation; bumped on every attempt.
    pub generation: u64,
    /// Busy-indicator visibility, if the indicator is enabled.
    pub indicator_visible: Option<bool>,
}
