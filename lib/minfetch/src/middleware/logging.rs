//! Request/response logging with `tracing`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{Instrument, Level, debug, info, span, warn};

use crate::{Error, RawResponse, Result, TransportRequest};

/// Layer that logs every request and its outcome.
///
/// # Example
///
/// ```
/// use minfetch::HyperTransport;
/// use minfetch::middleware::LoggingLayer;
///
/// let transport = HyperTransport::builder().layer(LoggingLayer::debug()).build();
/// # let _ = transport;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

/// Verbosity of [`LoggingLayer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Also log request headers, at debug level.
    Debug,
    /// Method, URL, status and timing only.
    #[default]
    Info,
}

impl LoggingLayer {
    /// Summary logging.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Detailed logging.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Configured verbosity.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

/// Service produced by [`LoggingLayer`].
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    level: LogLevel,
}

impl<S> Service<TransportRequest> for Logging<S>
where
    S: Service<TransportRequest, Response = RawResponse, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = RawResponse;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: TransportRequest) -> Self::Future {
        let method = request.method;
        let url = request.url.clone();
        let level = self.level;
        let span = span!(Level::INFO, "fetch", %method, %url);

        let mut inner = self.inner.clone();
        Box::pin(
            async move {
                let start = Instant::now();

                if level == LogLevel::Debug {
                    debug!(
                        headers = ?request.headers,
                        redirect = %request.redirect(),
                        "sending request"
                    );
                } else {
                    info!("sending request");
                }

                let result = inner.call(request).await;
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) if (200..400).contains(&response.status) => {
                        info!(
                            status = response.status,
                            redirected = response.redirected,
                            elapsed_ms,
                            "request completed"
                        );
                    }
                    Ok(response) => {
                        warn!(status = response.status, elapsed_ms, "request completed with HTTP error");
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use minfetch_core::{Method, PreparedOptions, finalize_options};

    use super::*;

    #[derive(Clone)]
    struct Fixed(u16);

    impl Service<TransportRequest> for Fixed {
        type Response = RawResponse;
        type Error = Error;
        type Future = Pin<Box<dyn Future<Output = Result<RawResponse>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: TransportRequest) -> Self::Future {
            let status = self.0;
            Box::pin(async move { Ok(RawResponse::new(status, "").with_url(request.url)) })
        }
    }

    #[test]
    fn level_defaults_to_info() {
        check!(LoggingLayer::new().level() == LogLevel::Info);
        check!(LoggingLayer::debug().level() == LogLevel::Debug);
    }

    #[tokio::test]
    async fn logging_passes_response_through() {
        let mut service = LoggingLayer::debug().layer(Fixed(503));
        let_assert!(
            Ok(request) = finalize_options(&PreparedOptions::new("http://localhost/health", Method::Get))
        );

        let_assert!(Ok(response) = service.call(request).await);
        check!(response.status == 503);
        check!(response.url == "http://localhost/health");
    }
}
