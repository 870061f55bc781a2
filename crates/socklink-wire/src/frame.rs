use bytes::Bytes;
use serde_json::Value;

use crate::error::{Result, WireError};

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// A single message as it appears on the wire.
///
/// Text frames carry JSON; binary frames carry MessagePack. Both decode into
/// the same structured document via [`decode_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    Text(String),
    Binary(Bytes),
}

impl WireFrame {
    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        match self {
            WireFrame::Text(text) => text.len(),
            WireFrame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if this frame uses the binary encoding.
    pub fn is_binary(&self) -> bool {
        matches!(self, WireFrame::Binary(_))
    }
}

/// Decode a frame into a structured document using [`DEFAULT_MAX_PAYLOAD`].
pub fn decode_frame(frame: &WireFrame) -> Result<Value> {
    decode_frame_with_limit(frame, DEFAULT_MAX_PAYLOAD)
}

/// Decode a frame into a structured document, rejecting oversized payloads
/// before any parsing work is done.
pub fn decode_frame_with_limit(frame: &WireFrame, max_payload: usize) -> Result<Value> {
    if frame.len() > max_payload {
        return Err(WireError::PayloadTooLarge {
            size: frame.len(),
            max: max_payload,
        });
    }

    match frame {
        WireFrame::Text(text) => serde_json::from_str(text).map_err(WireError::Json),
        WireFrame::Binary(bytes) => rmp_serde::from_slice(bytes).map_err(WireError::MsgPack),
    }
}

/// Serialize an outbound document as a JSON text frame.
pub fn encode_text(value: &Value) -> Result<WireFrame> {
    let text = serde_json::to_string(value)?;
    Ok(WireFrame::Text(text))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_text_json() {
        let frame = WireFrame::Text(r#"{"id":"tag-1","boxes":[1,2]}"#.to_string());
        let value = decode_frame(&frame).expect("text frame should decode");
        assert_eq!(value, json!({"id": "tag-1", "boxes": [1, 2]}));
    }

    #[test]
    fn decodes_binary_messagepack() {
        let original = json!({"id": "tag-1", "count": 3});
        let encoded = rmp_serde::to_vec(&original).expect("value should encode");
        let frame = WireFrame::Binary(Bytes::from(encoded));

        let value = decode_frame(&frame).expect("binary frame should decode");
        assert_eq!(value, original);
    }

    #[test]
    fn both_encodings_produce_the_same_document() {
        let original = json!({"nested": {"ok": true}, "n": 7});
        let text = WireFrame::Text(original.to_string());
        let binary = WireFrame::Binary(Bytes::from(
            rmp_serde::to_vec(&original).expect("value should encode"),
        ));

        assert_eq!(
            decode_frame(&text).expect("text should decode"),
            decode_frame(&binary).expect("binary should decode"),
        );
    }

    #[test]
    fn malformed_text_is_a_json_error() {
        let frame = WireFrame::Text("{not-json".to_string());
        assert!(matches!(decode_frame(&frame), Err(WireError::Json(_))));
    }

    #[test]
    fn malformed_binary_is_a_msgpack_error() {
        let frame = WireFrame::Binary(Bytes::from_static(&[0xc1, 0xff, 0xff]));
        assert!(matches!(decode_frame(&frame), Err(WireError::MsgPack(_))));
    }

    #[test]
    fn rejects_oversized_payload_before_parsing() {
        let frame = WireFrame::Text("x".repeat(128));
        let result = decode_frame_with_limit(&frame, 64);
        assert!(matches!(
            result,
            Err(WireError::PayloadTooLarge { size: 128, max: 64 })
        ));
    }

    #[test]
    fn encodes_outbound_as_json_text() {
        let frame = encode_text(&json!({"id": "tag-9"})).expect("value should encode");
        match frame {
            WireFrame::Text(text) => assert_eq!(text, r#"{"id":"tag-9"}"#),
            WireFrame::Binary(_) => panic!("outbound encoding should be text"),
        }
    }
}
