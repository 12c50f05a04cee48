//! HTTP client implementation
//!
//! [`HttpClient`] runs every call through the same pipeline:
//!
//! 1. merge client defaults with the per-call options (shallow, per field)
//! 2. hand the merged config to the request interceptor, if any
//! 3. append query parameters to the URL
//! 4. encode `data` as the body for POST, PUT and PATCH
//! 5. dispatch, racing the optional timeout and the client abort signal
//! 6. decode the body according to its content type
//! 7. route non-2xx responses to the error interceptor, or fail
//! 8. hand successful payloads to the response interceptor, whose errors are
//!    routed to the error interceptor as well
//!
//! [`HttpClient::request_raw`] stops after step 5, hands the raw response to
//! the raw-response interceptor if one is set, and returns it without looking
//! at its status.

use std::{
    future::Future,
    sync::{Arc, RwLock},
    time::Duration,
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::{
    abort::{AbortController, AbortSignal},
    codec::{BodyCodec, JsonCodec},
    config::ClientConfig,
    error::{HttpError, Result},
    events::{ClientEvent, EventBus, EventKind, ListenerId, ListenerResult},
    interceptor::{
        ErrorInterceptor, Interceptors, RawResponseInterceptor, RequestInterceptor,
        ResponseInterceptor,
    },
    request::{find_header, merge_options, HttpMethod, RequestConfig, RequestOptions},
    response::{Payload, RawResponse},
    transport::{OutgoingRequest, ReqwestTransport, Transport},
};

/// Production HTTP client
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn BodyCodec>,
    defaults: RwLock<RequestOptions>,
    interceptors: RwLock<Interceptors>,
    abort: AbortController,
    events: EventBus,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("defaults", &self.defaults())
            .field("interceptors", &self.interceptors())
            .field("abort_generation", &self.abort_generation())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Create a new HTTP client with configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Create HTTP client with default configuration
    pub fn with_default_config() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    // === Default-config store ===

    /// Snapshot of the current request defaults
    pub fn defaults(&self) -> RequestOptions {
        self.defaults
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Shallow-merge `partial` into the stored defaults
    pub fn set_defaults(&self, partial: RequestOptions) {
        let mut defaults = self.defaults.write().unwrap_or_else(|e| e.into_inner());
        *defaults = merge_options(&defaults, &partial);
    }

    /// Overwrite the stored defaults
    pub fn replace_defaults(&self, defaults: RequestOptions) {
        *self.defaults.write().unwrap_or_else(|e| e.into_inner()) = defaults;
    }

    // === Interceptors ===

    /// Snapshot of the active interceptors
    pub fn interceptors(&self) -> Interceptors {
        self.interceptors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_request_interceptor(&self, interceptor: impl RequestInterceptor + 'static) {
        self.update_interceptors(|set| set.request = Some(Arc::new(interceptor)));
    }

    pub fn set_response_interceptor(&self, interceptor: impl ResponseInterceptor + 'static) {
        self.update_interceptors(|set| set.response = Some(Arc::new(interceptor)));
    }

    pub fn set_response_error_interceptor(&self, interceptor: impl ErrorInterceptor + 'static) {
        self.update_interceptors(|set| set.response_error = Some(Arc::new(interceptor)));
    }

    /// Hook applied to responses of the `*_raw` helpers and `request_raw`
    pub fn set_raw_response_interceptor(&self, interceptor: impl RawResponseInterceptor + 'static) {
        self.update_interceptors(|set| set.raw_response = Some(Arc::new(interceptor)));
    }

    /// Replace every hook at once; hooks missing from `interceptors` are cleared
    pub fn set_interceptors(&self, interceptors: Interceptors) {
        self.update_interceptors(|set| *set = interceptors);
    }

    pub fn clear_interceptors(&self) {
        self.set_interceptors(Interceptors::default());
    }

    fn update_interceptors(&self, update: impl FnOnce(&mut Interceptors)) {
        let mut set = self.interceptors.write().unwrap_or_else(|e| e.into_inner());
        update(&mut set);
    }

    // === Abort control ===

    /// Abort every request currently in flight on this client.
    ///
    /// The client re-arms immediately, so requests issued afterwards are not
    /// affected. Returns `false` if the abort controller could not be used.
    pub fn abort(&self, reason: Option<&str>) -> bool {
        self.abort.abort(reason)
    }

    /// Number of times `abort` has fired on this client
    pub fn abort_generation(&self) -> u64 {
        self.abort.generation()
    }

    /// Signal that requests issued now would be bound to
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.signal()
    }

    // === Events ===

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&ClientEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.events.on(kind, listener)
    }

    pub fn off(&self, kind: EventKind, id: Option<ListenerId>) -> usize {
        self.events.off(kind, id)
    }

    pub fn emit(&self, event: &ClientEvent) -> usize {
        self.events.emit(event)
    }

    fn notify(&self, kind: EventKind, event: impl FnOnce() -> ClientEvent) {
        if self.events.listener_count(kind) > 0 {
            self.events.emit(&event());
        }
    }

    // === Pipeline ===

    /// Run the full pipeline and deserialize the final payload into `T`
    pub async fn request<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<T> {
        self.request_payload(config).await?.deserialize()
    }

    /// Run the full pipeline and return the final decoded payload
    pub async fn request_payload(&self, config: RequestConfig) -> Result<Payload> {
        let interceptors = self.interceptors();
        let signal = self.abort.signal();
        let config = self.prepare(config, &interceptors).await?;
        let outgoing = self.outgoing(&config)?;
        let url = outgoing.url.clone();

        let response = match self.dispatch(&config, outgoing, &signal).await {
            Ok(response) => response,
            Err(e) => return recover(&interceptors, e).await,
        };

        let status = response.status();
        let payload = match self.decode(config.method, &url, response, &signal).await {
            Ok(payload) => payload,
            Err(e) if e.is_transport() => return recover(&interceptors, e).await,
            Err(e) => return Err(e),
        };

        if !(200..300).contains(&status) {
            debug!(method = %config.method, url = %url, status, "non-success status");
            return recover(&interceptors, HttpError::Status { status, body: payload }).await;
        }

        let Some(interceptor) = &interceptors.response else {
            return Ok(payload);
        };
        match interceptor.on_response(payload).await {
            Ok(payload) => {
                self.notify(EventKind::ResponseIntercepted, || ClientEvent::ResponseIntercepted {
                    method: config.method,
                    url,
                });
                Ok(payload)
            }
            Err(e) => recover(&interceptors, e).await,
        }
    }

    /// Run merge, interception and dispatch, returning the raw response.
    ///
    /// Non-success statuses are not errors here; inspect [`RawResponse::ok`].
    /// The raw-response interceptor, if set, sees the response before the
    /// caller does. Its errors are returned as-is.
    pub async fn request_raw(&self, config: RequestConfig) -> Result<RawResponse> {
        let interceptors = self.interceptors();
        let signal = self.abort.signal();
        let config = self.prepare(config, &interceptors).await?;
        let outgoing = self.outgoing(&config)?;
        let url = outgoing.url.clone();
        let response = self.dispatch(&config, outgoing, &signal).await?;

        let Some(interceptor) = &interceptors.raw_response else {
            return Ok(response);
        };
        let response = interceptor.on_raw_response(response).await?;
        self.notify(EventKind::ResponseIntercepted, || ClientEvent::ResponseIntercepted {
            method: config.method,
            url,
        });
        Ok(response)
    }

    /// Merge defaults and apply the request interceptor
    async fn prepare(&self, config: RequestConfig, interceptors: &Interceptors) -> Result<RequestConfig> {
        let defaults = self.defaults();
        let merged = RequestConfig {
            options: merge_options(&defaults, &config.options),
            ..config
        };
        self.notify(EventKind::OptionsAssembled, || ClientEvent::OptionsAssembled {
            config: merged.clone(),
        });

        let Some(interceptor) = &interceptors.request else {
            return Ok(merged);
        };
        let intercepted = interceptor.on_request(merged).await?;
        self.notify(EventKind::RequestIntercepted, || ClientEvent::RequestIntercepted {
            config: intercepted.clone(),
        });
        Ok(intercepted)
    }

    /// Assemble the final URL, headers and body
    fn outgoing(&self, config: &RequestConfig) -> Result<OutgoingRequest> {
        let mut headers = config.options.headers.clone().unwrap_or_default();
        let body = match config.body_data() {
            Some(data) => {
                let bytes = self.codec.encode(data)?;
                if find_header(&headers, "content-type").is_none() {
                    headers.insert(
                        "Content-Type".to_string(),
                        self.codec.content_type().to_string(),
                    );
                }
                Some(bytes)
            }
            None => None,
        };

        Ok(OutgoingRequest {
            method: config.method,
            url: config.full_url(),
            headers,
            body,
        })
    }

    async fn dispatch(
        &self,
        config: &RequestConfig,
        request: OutgoingRequest,
        signal: &AbortSignal,
    ) -> Result<RawResponse> {
        debug!("HTTP {}: {}", request.method, request.url);
        let url = request.url.clone();
        let send = self.transport.send(request);

        let result = tokio::select! {
            biased;
            _ = signal.aborted() => Err(HttpError::Aborted { reason: signal.reason() }),
            result = race_timeout(config.effective_timeout(), send) => result,
        };

        match result {
            Ok(response) => {
                self.notify(EventKind::ResponseReceived, || ClientEvent::ResponseReceived {
                    method: config.method,
                    url,
                    status: response.status(),
                });
                Ok(response)
            }
            Err(e) => {
                self.report_failure(config.method, &url, &e);
                Err(e)
            }
        }
    }

    /// Read and decode the body; only the abort signal bounds this step
    async fn decode(
        &self,
        method: HttpMethod,
        url: &str,
        response: RawResponse,
        signal: &AbortSignal,
    ) -> Result<Payload> {
        let result = tokio::select! {
            biased;
            _ = signal.aborted() => Err(HttpError::Aborted { reason: signal.reason() }),
            payload = response.payload(self.codec.as_ref()) => payload,
        };

        if let Err(e) = &result {
            if e.is_transport() {
                self.report_failure(method, url, e);
            }
        }
        result
    }

    fn report_failure(&self, method: HttpMethod, url: &str, e: &HttpError) {
        error!(method = %method, url = %url, "Request failed: {e}");
        self.notify(EventKind::RequestFailed, || ClientEvent::RequestFailed {
            method,
            url: url.to_string(),
            error: e.to_string(),
        });
    }

    // === Verb facade ===

    /// GET request, decoded into `T`
    pub async fn get<T: DeserializeOwned>(&self, url: &str, options: Option<RequestOptions>) -> Result<T> {
        self.request(config(HttpMethod::Get, url, options)).await
    }

    /// POST request with `data` as the body, decoded into `T`
    pub async fn post<B, T>(&self, url: &str, data: &B, options: Option<RequestOptions>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(config_with_data(HttpMethod::Post, url, data, options)?)
            .await
    }

    /// PUT request with `data` as the body, decoded into `T`
    pub async fn put<B, T>(&self, url: &str, data: &B, options: Option<RequestOptions>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(config_with_data(HttpMethod::Put, url, data, options)?)
            .await
    }

    /// PATCH request with `data` as the body, decoded into `T`
    pub async fn patch<B, T>(&self, url: &str, data: &B, options: Option<RequestOptions>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(config_with_data(HttpMethod::Patch, url, data, options)?)
            .await
    }

    /// DELETE request, decoded into `T`
    pub async fn delete<T: DeserializeOwned>(&self, url: &str, options: Option<RequestOptions>) -> Result<T> {
        self.request(config(HttpMethod::Delete, url, options)).await
    }

    /// HEAD request; the body is always empty
    pub async fn head(&self, url: &str, options: Option<RequestOptions>) -> Result<RawResponse> {
        self.request_raw(config(HttpMethod::Head, url, options)).await
    }

    /// OPTIONS request, decoded into `T`
    pub async fn options<T: DeserializeOwned>(&self, url: &str, options: Option<RequestOptions>) -> Result<T> {
        self.request(config(HttpMethod::Options, url, options)).await
    }

    // === Raw verb facade ===

    pub async fn get_raw(&self, url: &str, options: Option<RequestOptions>) -> Result<RawResponse> {
        self.request_raw(config(HttpMethod::Get, url, options)).await
    }

    pub async fn post_raw<B>(&self, url: &str, data: &B, options: Option<RequestOptions>) -> Result<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        self.request_raw(config_with_data(HttpMethod::Post, url, data, options)?)
            .await
    }

    pub async fn put_raw<B>(&self, url: &str, data: &B, options: Option<RequestOptions>) -> Result<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        self.request_raw(config_with_data(HttpMethod::Put, url, data, options)?)
            .await
    }

    pub async fn patch_raw<B>(&self, url: &str, data: &B, options: Option<RequestOptions>) -> Result<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        self.request_raw(config_with_data(HttpMethod::Patch, url, data, options)?)
            .await
    }

    pub async fn delete_raw(&self, url: &str, options: Option<RequestOptions>) -> Result<RawResponse> {
        self.request_raw(config(HttpMethod::Delete, url, options)).await
    }
}

fn config(method: HttpMethod, url: &str, options: Option<RequestOptions>) -> RequestConfig {
    RequestConfig::new(method, url).with_options(options.unwrap_or_default())
}

// A body serializing to `null` (for example `()` or `None`) counts as no data
fn config_with_data<B>(method: HttpMethod, url: &str, data: &B, options: Option<RequestOptions>) -> Result<RequestConfig>
where
    B: Serialize + ?Sized,
{
    let mut config = config(method, url, options);
    let data = serde_json::to_value(data).map_err(|e| HttpError::Serialization(e.to_string()))?;
    if !data.is_null() {
        config.options.data = Some(data);
    }
    Ok(config)
}

async fn recover(interceptors: &Interceptors, error: HttpError) -> Result<Payload> {
    match &interceptors.response_error {
        Some(interceptor) => interceptor.on_error(error).await,
        None => Err(error),
    }
}

async fn race_timeout<F>(timeout: Option<Duration>, send: F) -> Result<RawResponse>
where
    F: Future<Output = Result<RawResponse>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, send)
            .await
            .map_err(|_| HttpError::Timeout(limit))?,
        None => send.await,
    }
}

/// Builder for [`HttpClient`]
#[derive(Default)]
pub struct HttpClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    codec: Option<Arc<dyn BodyCodec>>,
}

impl HttpClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom transport instead of reqwest
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom body codec instead of JSON
    pub fn codec(mut self, codec: Arc<dyn BodyCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };

        Ok(HttpClient {
            transport,
            codec: self.codec.unwrap_or_else(|| Arc::new(JsonCodec)),
            defaults: RwLock::new(self.config.defaults),
            interceptors: RwLock::new(Interceptors::default()),
            abort: AbortController::new(),
            events: EventBus::new(),
        })
    }
}

/// Create a shared HTTP client (Arc-wrapped for cloning)
pub fn shared_client(config: ClientConfig) -> Result<Arc<HttpClient>> {
    Ok(Arc::new(HttpClient::new(config)?))
}
