//! Fetch-style HTTP client for Courier
//!
//! Wraps a pluggable transport with client-level request defaults, one
//! interceptor per hook, per-request timeouts and a client-wide abort switch.
//!
//! ## Features
//!
//! - **Defaults**: Headers, params, body and timeout merged into every call
//! - **Interceptors**: Request, response, error and raw-response hooks, closures welcome
//! - **Timeouts**: Per-request deadline racing the dispatch
//! - **Abort**: Cancel all in-flight requests, then keep using the client
//! - **Events**: Observe pipeline milestones without touching the result
//! - **Testing support**: Mockable `Transport`, easy mocking with wiremock
//!
//! ```no_run
//! use courier_http::{HttpClient, ClientConfig, RequestOptions, Result};
//! use serde_json::Value;
//!
//! # async fn run() -> Result<()> {
//! let client = HttpClient::new(ClientConfig::fetch_style())?;
//! client.set_defaults(RequestOptions::new().with_header("Authorization", "Bearer token"));
//!
//! let post: Value = client
//!     .get("https://jsonplaceholder.typicode.com/posts/1", None)
//!     .await?;
//! println!("{}", post["title"]);
//! # Ok(())
//! # }
//! ```

pub mod abort;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod interceptor;
pub mod request;
pub mod response;
pub mod transport;

pub use abort::{AbortController, AbortSignal};
pub use client::{shared_client, HttpClient, HttpClientBuilder};
pub use codec::{BodyCodec, JsonCodec};
pub use config::ClientConfig;
pub use error::{HttpError, Result};
pub use events::{ClientEvent, EventBus, EventKind, ListenerId, ListenerResult};
pub use interceptor::{
    ErrorInterceptor, Interceptors, LoggingInterceptor, RawResponseInterceptor, RequestInterceptor,
    ResponseInterceptor,
};
pub use request::{build_url, merge_options, HttpMethod, ParamValue, RequestConfig, RequestOptions};
pub use response::{Payload, RawResponse};
pub use transport::{OutgoingRequest, ReqwestTransport, Transport};

/// Re-export commonly used types
pub use reqwest::{header, StatusCode};
