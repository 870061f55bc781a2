/// Errors surfaced by the channel public API.
///
/// Connectivity failures are absorbed by the reconnection machinery and never
/// reach callers; what remains is payload serialization and the instance task
/// itself going away.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The payload could not be serialized for transmission.
    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),

    /// The channel instance task has stopped and can no longer accept work.
    #[error("channel instance is no longer running")]
    InstanceGone,
}

pub type Result<T> = std::result::Result<T, ChannelError>;
