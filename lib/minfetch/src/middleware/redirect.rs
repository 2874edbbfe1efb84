//! Redirect handling driven by each request's `redirect` mode.
//!
//! - `follow`: chase `Location` up to a maximum, flag the final response as
//!   redirected and record its URL.
//! - `error`: any redirect fails the request.
//! - `manual`: the redirect response is returned as an `opaqueredirect`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use minfetch_core::headers::{AUTHORIZATION, CONTENT_TYPE};
use tower::{Layer, Service, ServiceExt};
use url::Url;

use crate::config::DEFAULT_MAX_REDIRECTS;
use crate::{Error, Method, RawResponse, RequestRedirect, ResponseType, Result, TransportRequest};

/// Layer that applies the redirect mode of each request.
#[derive(Debug, Clone, Copy)]
pub struct RedirectLayer {
    max_redirects: usize,
}

impl Default for RedirectLayer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REDIRECTS)
    }
}

impl RedirectLayer {
    /// Follow at most `max_redirects` hops.
    #[must_use]
    pub const fn new(max_redirects: usize) -> Self {
        Self { max_redirects }
    }

    /// Configured hop limit.
    #[must_use]
    pub const fn max_redirects(&self) -> usize {
        self.max_redirects
    }
}

impl<S> Layer<S> for RedirectLayer {
    type Service = Redirect<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Redirect {
            inner,
            max_redirects: self.max_redirects,
        }
    }
}

/// Service produced by [`RedirectLayer`].
#[derive(Debug, Clone)]
pub struct Redirect<S> {
    inner: S,
    max_redirects: usize,
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// 303 turns everything but HEAD into GET; 301 and 302 only rewrite POST.
fn redirect_method(status: u16, method: Method) -> Method {
    match (status, method) {
        (303, Method::Head) => Method::Head,
        (303, _) | (301 | 302, Method::Post) => Method::Get,
        _ => method,
    }
}

fn location(response: &RawResponse) -> Option<&str> {
    response
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("location"))
        .map(|(_, value)| value.as_str())
}

fn same_origin(left: &Url, right: &Url) -> bool {
    left.origin() == right.origin()
}

/// Request for the next hop.
fn follow(request: &TransportRequest, status: u16, target: &Url) -> Result<TransportRequest> {
    let current = Url::parse(&request.url)?;
    let method = redirect_method(status, request.method);
    let mut next = request.clone();
    next.url = target.to_string();

    if method != request.method {
        next.method = method;
        next.body = None;
        next.headers.retain(|name, _| !name.eq_ignore_ascii_case(CONTENT_TYPE));
    }

    if !same_origin(&current, target) {
        next.headers.retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));
    }

    Ok(next)
}

impl<S> Service<TransportRequest> for Redirect<S>
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
        let mut inner = self.inner.clone();
        let max_redirects = self.max_redirects;

        Box::pin(async move {
            let mode = request.redirect();
            let mut current = request;
            let mut hops = 0;

            loop {
                let response = inner.ready().await?.call(current.clone()).await?;
                if !is_redirect(response.status) {
                    return Ok(response.with_url(current.url).with_redirected(hops > 0));
                }

                match mode {
                    RequestRedirect::Manual => {
                        return Ok(response
                            .with_url(current.url)
                            .with_response_type(ResponseType::OpaqueRedirect));
                    }
                    RequestRedirect::Error => {
                        return Err(Error::InvalidRedirect(format!(
                            "{} redirected with status {} while redirect mode is 'error'",
                            current.url, response.status
                        )));
                    }
                    RequestRedirect::Follow => {}
                }

                if hops >= max_redirects {
                    return Err(Error::TooManyRedirects {
                        count: hops,
                        max: max_redirects,
                    });
                }

                let location = location(&response).ok_or_else(|| {
                    Error::InvalidRedirect("redirect response missing Location header".into())
                })?;
                let target = Url::parse(&current.url)?.join(location)?;
                tracing::debug!(status = response.status, from = %current.url, to = %target, "following redirect");

                current = follow(&current, response.status, &target)?;
                hops += 1;
            }
        })
    }
}
