//! Default transport: hyper-util over rustls, composed with tower layers.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client as HyperClient, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use minfetch_core::headers::CONTENT_TYPE;
use minfetch_core::{ContentType, HeaderMap, is_buffer_view, to_form};
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};
use tower_service::Service;
use url::Url;

use crate::config::TransportConfig;
use crate::connector::https_connector;
use crate::middleware::{LoggingLayer, RedirectLayer};
use crate::{Error, RawResponse, RequestBody, Result, Transport, TransportRequest};

/// Type-erased transport service, the unit layers compose over.
pub type BoxedService = BoxCloneService<TransportRequest, RawResponse, Error>;

/// Future returned by the transport services.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'static>>;

/// Makes a [`BoxedService`] shareable across threads.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: TransportRequest) -> ServiceFuture {
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.oneshot(request).await })
    }
}

/// Single hop over the network, no redirect handling.
#[derive(Clone)]
struct RawHyperTransport {
    inner: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl RawHyperTransport {
    fn new(config: &TransportConfig) -> Self {
        let inner = HyperClient::builder(TokioExecutor::new()).build(https_connector(config.connect_timeout));
        Self { inner }
    }

    fn build_hyper_request(request: &TransportRequest) -> Result<http::Request<Full<Bytes>>> {
        let url = Url::parse(&request.url)?;
        if request.body.is_some() && request.method.is_bodyless() {
            return Err(Error::invalid_request(format!(
                "{} request cannot have a body",
                request.method
            )));
        }

        let (body, default_content_type) = encode_body(request.body.as_ref())?;

        let mut builder = http::Request::builder()
            .method(http::Method::from(request.method))
            .uri(url.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(content_type) = default_content_type
            && !has_header(&request.headers, CONTENT_TYPE)
        {
            builder = builder.header(CONTENT_TYPE, content_type);
        }

        if let Some(referrer) = request.passthrough.referrer.as_deref()
            && Url::parse(referrer).is_ok()
            && !has_header(&request.headers, "Referer")
        {
            builder = builder.header("Referer", referrer);
        }

        builder
            .body(Full::new(body))
            .map_err(|e| Error::invalid_request(e.to_string()))
    }

    fn extract_headers(headers: &http::HeaderMap) -> HeaderMap {
        let mut extracted = HeaderMap::new();
        for (name, value) in headers {
            let Ok(value) = value.to_str() else { continue };
            extracted
                .entry(name.to_string())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
        extracted
    }

    async fn execute(&self, request: TransportRequest) -> Result<RawResponse> {
        let hyper_request = Self::build_hyper_request(&request)?;

        let response = self.inner.request(hyper_request).await.map_err(Self::map_hyper_error)?;

        let status = response.status();
        let headers = Self::extract_headers(response.headers());
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        let mut raw = RawResponse::new(status.as_u16(), body).with_url(request.url);
        raw.headers = headers;
        Ok(raw)
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Service<TransportRequest> for RawHyperTransport {
    type Response = RawResponse;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: TransportRequest) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.execute(request).await })
    }
}

fn has_header(headers: &HeaderMap, name: &str) -> bool {
    headers.keys().any(|key| key.eq_ignore_ascii_case(name))
}

/// Wire bytes of a body, with the content type to send when none is set.
fn encode_body(body: Option<&RequestBody>) -> Result<(Bytes, Option<String>)> {
    match body {
        None => Ok((Bytes::new(), None)),
        Some(RequestBody::Text(text)) => Ok((
            Bytes::from(text.clone()),
            Some("text/plain;charset=UTF-8".to_string()),
        )),
        Some(RequestBody::Bytes(bytes)) => Ok((bytes.clone(), None)),
        Some(RequestBody::UrlEncoded(pairs)) => Ok((
            to_form(pairs)?,
            Some(format!("{};charset=UTF-8", ContentType::FormUrlEncoded)),
        )),
        Some(RequestBody::Multipart(form)) => Ok((form.encode(), Some(form.content_type()))),
        Some(RequestBody::Json(value)) if is_buffer_view(value) => Ok((buffer_view_bytes(value)?, None)),
        Some(RequestBody::Json(_)) => Err(Error::invalid_request(
            "structured body needs an application/json content type to be sent",
        )),
    }
}

/// Bytes addressed by a `{ buffer, byteOffset, byteLength }` view.
fn buffer_view_bytes(view: &serde_json::Value) -> Result<Bytes> {
    let invalid = || Error::invalid_request("malformed buffer view body");

    let buffer = view
        .get("buffer")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(invalid)?
        .iter()
        .map(|byte| byte.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(invalid)?;
    let number = |key: &str| {
        view.get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(invalid)
    };
    let offset = number("byteOffset")?;
    let length = number("byteLength")?;

    let end = offset.checked_add(length).ok_or_else(invalid)?;
    buffer
        .get(offset..end)
        .map(Bytes::copy_from_slice)
        .ok_or_else(invalid)
}

/// Network transport built on hyper-util with rustls TLS.
///
/// Every request goes through the redirect layer, then through any layers
/// added on the builder. The abort signal and the optional timeout bound the
/// whole exchange, redirects included.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use minfetch::HyperTransport;
///
/// let transport = HyperTransport::builder()
///     .timeout(Duration::from_secs(30))
///     .max_redirects(5)
///     .with_logging()
///     .build();
/// assert_eq!(transport.config().max_redirects, 5);
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    service: SyncService,
    config: TransportConfig,
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Transport with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Transport with a custom configuration and no extra layers.
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        HyperTransportBuilder {
            config,
            layers: Vec::new(),
        }
        .build()
    }

    /// Create a new transport builder.
    #[must_use]
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// Get the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn fetch(&self, request: TransportRequest) -> BoxFuture<'static, Result<RawResponse>> {
        let service = self.service.clone();
        let timeout = self.config.timeout;

        async move {
            let signal = request.signal.clone();
            if signal.as_ref().is_some_and(minfetch_core::AbortSignal::is_aborted) {
                return Err(Error::Aborted);
            }

            let call = bounded(service.call(request), timeout);
            match signal {
                Some(signal) => {
                    tokio::select! {
                        biased;
                        () = signal.cancelled() => Err(Error::Aborted),
                        result = call => result,
                    }
                }
                None => call.await,
            }
        }
        .boxed()
    }
}

async fn bounded(call: ServiceFuture, timeout: Option<Duration>) -> Result<RawResponse> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| Error::Timeout)?,
        None => call.await,
    }
}

/// Builder for [`HyperTransport`].
#[derive(Default)]
pub struct HyperTransportBuilder {
    config: TransportConfig,
    layers: Vec<Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>>,
}

impl fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl HyperTransportBuilder {
    /// Bound each request, redirects included.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Bound the TCP handshake.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Maximum redirects followed in `follow` mode.
    #[must_use]
    pub const fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Add a tower layer around the transport.
    ///
    /// First added is outermost.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<TransportRequest, Response = RawResponse, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<TransportRequest>>::Future: Send,
    {
        self.layers
            .push(Arc::new(move |service| BoxCloneService::new(layer.layer(service))));
        self
    }

    /// Log every request with `tracing`.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Log every request with headers, at debug level.
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    /// Build the transport.
    #[must_use]
    pub fn build(self) -> HyperTransport {
        let raw = RawHyperTransport::new(&self.config);
        let mut service: BoxedService =
            BoxCloneService::new(RedirectLayer::new(self.config.max_redirects).layer(raw));

        // Reverse order: the first added layer ends up outermost.
        for layer_fn in self.layers.into_iter().rev() {
            service = layer_fn(service);
        }

        HyperTransport {
            service: SyncService::new(service),
            config: self.config,
        }
    }
}
