//! Outbound request primitive
//!
//! The pipeline hands a fully assembled [`OutgoingRequest`] to a [`Transport`]
//! and gets a [`RawResponse`] back once headers have arrived. Cancellation is
//! cooperative: when a timeout or abort fires, the pipeline drops the pending
//! `send` future, which tears down the in-flight I/O.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::{
    config::ClientConfig,
    error::{HttpError, Result},
    request::HttpMethod,
    response::RawResponse,
};

/// A request ready to go on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub method: HttpMethod,
    /// Final URL, query string included
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

/// Mockable request primitive
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and resolve once the response head is available
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse>;
}

/// Production transport backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a reqwest client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(if config.max_redirects > 0 {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| HttpError::BuildError(e.to_string()))?;

        Ok(Self { inner })
    }

    /// Wrap an existing reqwest client
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }

    /// Get underlying reqwest client (for advanced usage)
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse> {
        let url = request
            .url
            .parse::<url::Url>()
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {e}", request.url)))?;
        let headers = header_map(&request.headers)?;

        debug!(method = %request.method, url = %url, "dispatching request");
        let mut builder = self
            .inner
            .request(request.method.into(), url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        Ok(RawResponse::from_reqwest(response))
    }
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HttpError::InvalidHeader(format!("{name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
