//! HTTP response types

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    codec::BodyCodec,
    error::{HttpError, Result},
};

/// Decoded response body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Body parsed by the client's codec
    Json(serde_json::Value),
    /// Body read as plain text
    Text(String),
}

impl Payload {
    pub fn is_json(&self) -> bool {
        matches!(self, Payload::Json(_))
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(_) => None,
        }
    }

    /// Convert into a JSON value; text becomes a JSON string
    pub fn into_value(self) -> serde_json::Value {
        match self {
            Payload::Json(value) => value,
            Payload::Text(text) => serde_json::Value::String(text),
        }
    }

    /// Deserialize into a caller type
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.into_value())
            .map_err(|e| HttpError::Decode(format!("Failed to convert response: {e}")))
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Json(value) => write!(f, "{value}"),
            Payload::Text(text) => f.write_str(text),
        }
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

enum Body {
    Stream(reqwest::Response),
    Buffered(Vec<u8>),
}

/// Raw HTTP response with status, headers and one-shot body access
pub struct RawResponse {
    status: u16,
    headers: HeaderMap,
    body: Body,
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl RawResponse {
    /// Wrap a reqwest response without reading its body
    pub(crate) fn from_reqwest(response: reqwest::Response) -> Self {
        Self {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
            body: Body::Stream(response),
        }
    }

    /// Build a response from already-read parts
    pub fn from_parts(status: u16, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: Body::Buffered(body.into()),
        }
    }

    /// Build a response with a `text/plain` body
    pub fn text_response(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        Self::from_parts(status, headers, body.into().into_bytes())
    }

    /// Build a response with an `application/json` body
    pub fn json_response(status: u16, body: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self::from_parts(status, headers, body.to_string().into_bytes())
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Check if the response status is a success (2xx)
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a header value; non-UTF-8 values are treated as absent
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> &str {
        self.header(CONTENT_TYPE.as_str()).unwrap_or_default()
    }

    /// Get the response body as bytes
    pub async fn bytes(self) -> Result<Vec<u8>> {
        match self.body {
            Body::Stream(response) => Ok(response.bytes().await?.to_vec()),
            Body::Buffered(bytes) => Ok(bytes),
        }
    }

    /// Get the response body as text
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Get the response body as JSON
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| HttpError::Decode(format!("Failed to parse JSON response: {e}")))
    }

    /// Decode the body with `codec` when the content type matches, else as text
    pub async fn payload(self, codec: &dyn BodyCodec) -> Result<Payload> {
        if codec.matches(self.content_type()) {
            let bytes = self.bytes().await?;
            codec.decode(&bytes).map(Payload::Json)
        } else {
            self.text().await.map(Payload::Text)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::JsonCodec;

    #[tokio::test]
    async fn test_json_content_type_decodes_json() {
        let response = RawResponse::json_response(200, &json!({"id": 1}));
        assert!(response.ok());
        let payload = response.payload(&JsonCodec).await.unwrap();
        assert_eq!(payload, Payload::Json(json!({"id": 1})));
    }

    #[tokio::test]
    async fn test_other_content_type_reads_text() {
        let response = RawResponse::text_response(200, "{\"id\": 1}");
        let payload = response.payload(&JsonCodec).await.unwrap();
        assert_eq!(payload, Payload::Text("{\"id\": 1}".to_string()));
    }

    #[tokio::test]
    async fn test_missing_content_type_reads_text() {
        let response = RawResponse::from_parts(204, HeaderMap::new(), Vec::new());
        assert_eq!(response.content_type(), "");
        let payload = response.payload(&JsonCodec).await.unwrap();
        assert_eq!(payload, Payload::Text(String::new()));
    }

    #[tokio::test]
    async fn test_malformed_json_reports_parser_message() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        let response = RawResponse::from_parts(200, headers, b"{invalid json".to_vec());

        let parser_message = serde_json::from_str::<serde_json::Value>("{invalid json")
            .unwrap_err()
            .to_string();
        let err = response.payload(&JsonCodec).await.unwrap_err();
        match err {
            HttpError::Decode(msg) => {
                assert!(msg.starts_with("Failed to parse JSON response: "));
                assert!(msg.contains(&parser_message));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_status_classification() {
        assert!(RawResponse::text_response(201, "").ok());
        assert!(!RawResponse::text_response(404, "").ok());
        assert!(!RawResponse::text_response(500, "").ok());
    }

    #[test]
    fn test_payload_deserialize_text_as_string() {
        let text: String = Payload::Text("hello".to_string()).deserialize().unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_payload_deserialize_mismatch_is_decode_error() {
        let result: Result<Vec<u32>> = Payload::Json(json!({"a": 1})).deserialize();
        assert!(matches!(result, Err(HttpError::Decode(_))));
    }
}
