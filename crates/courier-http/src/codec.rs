//! Body codecs
//!
//! A codec turns request `data` into body bytes and decodes response bodies
//! whose content type it recognises. [`JsonCodec`] is the default.

use crate::error::{HttpError, Result};

/// Pluggable request/response body serialization
pub trait BodyCodec: Send + Sync {
    /// Content type sent with encoded bodies
    fn content_type(&self) -> &str;

    /// Whether a response with this content type should be decoded
    fn matches(&self, content_type: &str) -> bool;

    fn encode(&self, data: &serde_json::Value) -> Result<Vec<u8>>;

    fn decode(&self, body: &[u8]) -> Result<serde_json::Value>;
}

/// JSON body codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BodyCodec for JsonCodec {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn matches(&self, content_type: &str) -> bool {
        content_type.contains("application/json")
    }

    fn encode(&self, data: &serde_json::Value) -> Result<Vec<u8>> {
        serde_json::to_vec(data).map_err(|e| HttpError::Serialization(e.to_string()))
    }

    fn decode(&self, body: &[u8]) -> Result<serde_json::Value> {
        serde_json::from_slice(body)
            .map_err(|e| HttpError::Decode(format!("Failed to parse JSON response: {e}")))
    }
}
