//! The seam between a client and the network.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::{RawResponse, Result, TransportRequest};

/// Executes finalized requests.
///
/// The returned future must not perform any I/O before it is first polled:
/// clients create it eagerly at dispatch and the caller decides when to drive
/// it. Implementations should honor the request's abort signal.
///
/// # Example
///
/// ```
/// use futures_util::FutureExt;
/// use futures_util::future::BoxFuture;
/// use minfetch_core::{RawResponse, Result, Transport, TransportRequest};
///
/// struct Echo;
///
/// impl Transport for Echo {
///     fn fetch(&self, request: TransportRequest) -> BoxFuture<'static, Result<RawResponse>> {
///         async move { Ok(RawResponse::new(200, request.url.clone()).with_url(request.url)) }.boxed()
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Start executing `request`.
    fn fetch(&self, request: TransportRequest) -> BoxFuture<'static, Result<RawResponse>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn fetch(&self, request: TransportRequest) -> BoxFuture<'static, Result<RawResponse>> {
        (**self).fetch(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn fetch(&self, request: TransportRequest) -> BoxFuture<'static, Result<RawResponse>> {
        (**self).fetch(request)
    }
}
