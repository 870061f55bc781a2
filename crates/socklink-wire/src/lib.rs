//! Wire payload codec for socklink.
//!
//! Inbound frames arrive either as UTF-8 text carrying JSON or as a compact
//! MessagePack binary encoding. Both decode into the same structured document
//! type ([`serde_json::Value`]) so that everything downstream handles one
//! shape. Outbound payloads are always serialized as JSON text.

pub mod error;
pub mod frame;

pub use error::{Result, WireError};
pub use frame::{decode_frame, decode_frame_with_limit, encode_text, WireFrame, DEFAULT_MAX_PAYLOAD};
