//! Resilient WebSocket channels.
//!
//! socklink keeps one logical channel per `(endpoint, logicalId)` key alive
//! across connection drops: payloads submitted while offline are queued and
//! flushed in order on reconnect, inbound messages fan out to subscribers in
//! registration order, and retry exhaustion parks the channel instead of
//! failing the process.
//!
//! # Crate Structure
//!
//! - [`wire`] — frame decoding (JSON text and MessagePack binary)
//! - [`transport`] — endpoint addressing and the WebSocket connection layer
//! - [`channel`] — registry, reconnection state machine, queueing, fan-out

/// Re-export wire types.
pub mod wire {
    pub use socklink_wire::*;
}

/// Re-export transport types.
pub mod transport {
    pub use socklink_transport::*;
}

/// Re-export channel types.
pub mod channel {
    pub use socklink_channel::*;
}
