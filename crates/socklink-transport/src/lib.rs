//! WebSocket transport abstraction for socklink.
//!
//! Provides endpoint addressing and the connection traits the channel layer
//! builds on:
//!
//! - [`Endpoint`] — host/port/scheme addressing with the `/ws/<logicalId>`
//!   path convention
//! - [`Transport`], [`WireSink`], [`WireStream`] — the seam between channel
//!   logic and the underlying connection, so tests can substitute a scripted
//!   transport
//! - [`WebSocketTransport`] — the production implementation on
//!   `tokio-tungstenite`

pub mod endpoint;
pub mod error;
pub mod traits;
pub mod ws;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use traits::{Transport, WireSink, WireStream};
pub use ws::WebSocketTransport;
