use async_trait::async_trait;
use socklink_wire::WireFrame;

use crate::error::Result;

/// Writing half of an established connection.
#[async_trait]
pub trait WireSink: Send {
    /// Transmit one frame.
    async fn send(&mut self, frame: WireFrame) -> Result<()>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<()>;
}

/// Reading half of an established connection.
#[async_trait]
pub trait WireStream: Send {
    /// Next inbound frame. `None` means the connection is closed; `Some(Err)`
    /// means the connection failed and no further frames will arrive.
    async fn next_frame(&mut self) -> Option<Result<WireFrame>>;
}

/// Factory for connections to a channel backend.
///
/// The channel layer holds a `dyn Transport` so tests can substitute a
/// scripted implementation for the production WebSocket one.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Establish a new connection to `url`, returning its two halves.
    async fn connect(&self, url: &str) -> Result<(Box<dyn WireSink>, Box<dyn WireStream>)>;
}
