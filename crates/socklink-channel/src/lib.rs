//! Resilient channel management for socklink.
//!
//! This is the core layer: a process-wide [`ChannelRegistry`] hands out one
//! [`ChannelHandle`] per `(endpoint, logicalId)` key. Each instance owns a
//! reconnecting connection with a retry budget, an outbound queue flushed in
//! FIFO order whenever the connection (re)opens, an ordered subscriber list
//! receiving every decoded inbound message, and an optional busy-indicator
//! coordinator serializing show/hide across overlapping operations.
//!
//! Connectivity failures never reach callers: transient drops are retried
//! with a fixed backoff, and after the retry budget is spent the instance
//! parks in a failed state until the next registry lookup or submission
//! revives it.

pub mod config;
pub mod error;
pub mod indicator;
pub mod instance;
pub mod registry;
pub mod state;
pub mod subscriber;
pub mod token;

pub use config::ChannelConfig;
pub use error::{ChannelError, Result};
pub use indicator::{
    IndicatorAction, IndicatorCoordinator, IndicatorSink, IndicatorSnapshot, LogIndicator,
};
pub use instance::ChannelHandle;
pub use registry::{ChannelKey, ChannelRegistry};
pub use state::{ChannelStatus, ConnectionState};
pub use subscriber::SubscriptionToken;
pub use token::{StaticTokenSource, TokenSource};
