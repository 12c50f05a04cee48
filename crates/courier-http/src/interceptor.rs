//! Interceptor hooks
//!
//! A client holds at most one interceptor per hook; setting a hook replaces
//! the previous one. Hooks are optional and an empty slot passes values
//! through unchanged.
//!
//! - [`RequestInterceptor`] receives the merged [`RequestConfig`] and returns
//!   the config that is actually dispatched.
//! - [`ResponseInterceptor`] receives the decoded [`Payload`] of a successful
//!   response.
//! - [`ErrorInterceptor`] receives non-2xx statuses, transport failures and
//!   response-interceptor errors, and may recover by returning a payload.
//! - [`RawResponseInterceptor`] receives the undecoded [`RawResponse`] of the
//!   Fetch-style `request_raw` path.
//!
//! Plain closures implement the matching trait. The closure's return type
//! has to be spelled out since it cannot be inferred through the blanket impl:
//!
//! ```ignore
//! client.set_request_interceptor(|config: RequestConfig| -> Result<RequestConfig> {
//!     Ok(config.with_header("Authorization", "Bearer token"))
//! });
//! client.set_response_error_interceptor(|_err: HttpError| -> Result<Payload> {
//!     Ok(Payload::Json(serde_json::json!({"fallback": true})))
//! });
//! ```

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{HttpError, Result},
    request::RequestConfig,
    response::{Payload, RawResponse},
};

/// Transforms a request config before dispatch
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn on_request(&self, config: RequestConfig) -> Result<RequestConfig>;
}

/// Transforms the decoded body of a successful response
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn on_response(&self, payload: Payload) -> Result<Payload>;
}

/// Recovers from (or rewrites) a failed request
#[async_trait]
pub trait ErrorInterceptor: Send + Sync {
    async fn on_error(&self, error: HttpError) -> Result<Payload>;
}

/// Transforms the raw response returned by `request_raw`
#[async_trait]
pub trait RawResponseInterceptor: Send + Sync {
    async fn on_raw_response(&self, response: RawResponse) -> Result<RawResponse>;
}

#[async_trait]
impl<F> RequestInterceptor for F
where
    F: Fn(RequestConfig) -> Result<RequestConfig> + Send + Sync,
{
    async fn on_request(&self, config: RequestConfig) -> Result<RequestConfig> {
        self(config)
    }
}

#[async_trait]
impl<F> ResponseInterceptor for F
where
    F: Fn(Payload) -> Result<Payload> + Send + Sync,
{
    async fn on_response(&self, payload: Payload) -> Result<Payload> {
        self(payload)
    }
}

#[async_trait]
impl<F> ErrorInterceptor for F
where
    F: Fn(HttpError) -> Result<Payload> + Send + Sync,
{
    async fn on_error(&self, error: HttpError) -> Result<Payload> {
        self(error)
    }
}

#[async_trait]
impl<F> RawResponseInterceptor for F
where
    F: Fn(RawResponse) -> Result<RawResponse> + Send + Sync,
{
    async fn on_raw_response(&self, response: RawResponse) -> Result<RawResponse> {
        self(response)
    }
}

/// One optional interceptor per hook
#[derive(Clone, Default)]
pub struct Interceptors {
    pub(crate) request: Option<Arc<dyn RequestInterceptor>>,
    pub(crate) response: Option<Arc<dyn ResponseInterceptor>>,
    pub(crate) response_error: Option<Arc<dyn ErrorInterceptor>>,
    pub(crate) raw_response: Option<Arc<dyn RawResponseInterceptor>>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one value for every hook
    pub fn all<T>(interceptor: T) -> Self
    where
        T: RequestInterceptor
            + ResponseInterceptor
            + ErrorInterceptor
            + RawResponseInterceptor
            + 'static,
    {
        let shared = Arc::new(interceptor);
        Self {
            request: Some(shared.clone()),
            response: Some(shared.clone()),
            response_error: Some(shared.clone()),
            raw_response: Some(shared),
        }
    }

    pub fn with_request(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request = Some(Arc::new(interceptor));
        self
    }

    pub fn with_response(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.response = Some(Arc::new(interceptor));
        self
    }

    pub fn with_response_error(mut self, interceptor: impl ErrorInterceptor + 'static) -> Self {
        self.response_error = Some(Arc::new(interceptor));
        self
    }

    pub fn with_raw_response(mut self, interceptor: impl RawResponseInterceptor + 'static) -> Self {
        self.raw_response = Some(Arc::new(interceptor));
        self
    }

    pub fn has_request(&self) -> bool {
        self.request.is_some()
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    pub fn has_response_error(&self) -> bool {
        self.response_error.is_some()
    }

    pub fn has_raw_response(&self) -> bool {
        self.raw_response.is_some()
    }
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors")
            .field("request", &self.has_request())
            .field("response", &self.has_response())
            .field("response_error", &self.has_response_error())
            .field("raw_response", &self.has_raw_response())
            .finish()
    }
}

/// Interceptor that traces every hook through `tracing` and changes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl RequestInterceptor for LoggingInterceptor {
    async fn on_request(&self, config: RequestConfig) -> Result<RequestConfig> {
        debug!(target: "courier::http", method = %config.method, url = %config.url, "request intercepted");
        Ok(config)
    }
}

#[async_trait]
impl ResponseInterceptor for LoggingInterceptor {
    async fn on_response(&self, payload: Payload) -> Result<Payload> {
        debug!(target: "courier::http", json = payload.is_json(), "response intercepted");
        Ok(payload)
    }
}

#[async_trait]
impl ErrorInterceptor for LoggingInterceptor {
    async fn on_error(&self, error: HttpError) -> Result<Payload> {
        debug!(target: "courier::http", status = ?error.status(), err = %error, "request error");
        Err(error)
    }
}

#[async_trait]
impl RawResponseInterceptor for LoggingInterceptor {
    async fn on_raw_response(&self, response: RawResponse) -> Result<RawResponse> {
        debug!(target: "courier::http", status = response.status(), "raw response intercepted");
        Ok(response)
    }
}
