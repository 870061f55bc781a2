/// Errors that can occur while encoding or decoding wire payloads.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A text frame did not contain valid JSON, or an outbound payload
    /// could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A binary frame did not contain valid MessagePack.
    #[error("messagepack decode error: {0}")]
    MsgPack(#[from] rmp_serde::decode::Error),

    /// The frame payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, WireError>;
