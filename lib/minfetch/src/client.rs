//! The chainable request builder.

use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use minfetch_core::headers::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use minfetch_core::{finalize_options, merge_headers, merge_options};
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::{
    AbortSignal, HeaderBag, HyperTransport, Method, Parser, Query, Registry, RequestBody,
    RequestOptions, Transport,
};

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Appended verbatim to the client base URL.
    Path(String),
    /// Used as-is, ignoring the base URL.
    Url(Url),
}

impl From<&str> for Target {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for Target {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<&String> for Target {
    fn from(path: &String) -> Self {
        Self::Path(path.clone())
    }
}

impl From<Url> for Target {
    fn from(url: Url) -> Self {
        Self::Url(url)
    }
}

impl From<&Url> for Target {
    fn from(url: &Url) -> Self {
        Self::Url(url.clone())
    }
}

/// Base URL, default options and response parsers shared by many requests.
///
/// Mutators return `&mut Self` for chaining; [`Client::url`] and
/// [`Client::copy`] derive new, independent clients. Each dispatch hands a
/// snapshot of the parsers to the returned [`Query`], so later changes to the
/// client never affect requests already made.
///
/// # Example
///
/// ```no_run
/// use minfetch::{Client, Outcome, parser};
///
/// # async fn run() -> minfetch::Result<()> {
/// let mut api = Client::with_base_url("https://api.example.com");
/// api.auth("Bearer secret")
///     .accepts("application/json")
///     .status(404, parser(|_| async { Ok(serde_json::Value::Null) }));
///
/// let users = api.url("/users", false);
/// match users.get("/42", None).json().await? {
///     Outcome::Parsed(user) => println!("{user}"),
///     Outcome::Response(response) => println!("unexpected {}", response.code()),
/// }
/// # Ok(())
/// # }
/// ```
pub struct Client<T = Value> {
    url: String,
    options: RequestOptions,
    registry: Registry<T>,
    transport: Arc<dyn Transport>,
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url)
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl Client {
    /// Client without base URL over the default transport.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Client prefixing every path with `url`.
    #[must_use]
    pub fn with_base_url(url: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::builder().base_url(url).build())
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Client<T> {
    /// Client from a full configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig<T>) -> Self {
        let transport = config
            .transport
            .unwrap_or_else(|| Arc::new(HyperTransport::new()));

        Self {
            url: config.base_url,
            options: config.request_options,
            registry: config.registry,
            transport,
        }
    }

    /// Default abort signal for dispatched requests.
    ///
    /// Takes an [`AbortSignal`] or an [`AbortController`](minfetch_core::AbortController);
    /// `None` clears it.
    pub fn abort(&mut self, signal: impl Into<Option<AbortSignal>>) -> &mut Self {
        self.options.signal = signal.into();
        self
    }

    /// Set the `Authorization` header.
    pub fn auth(&mut self, value: impl Into<String>) -> &mut Self {
        self.options.headers.insert(AUTHORIZATION.to_string(), Some(value.into()));
        self
    }

    /// Set the `Accept` header.
    pub fn accepts(&mut self, value: impl Into<String>) -> &mut Self {
        self.options.headers.insert(ACCEPT.to_string(), Some(value.into()));
        self
    }

    /// Set the `Content-Type` header.
    pub fn content(&mut self, value: impl Into<String>) -> &mut Self {
        self.options.headers.insert(CONTENT_TYPE.to_string(), Some(value.into()));
        self
    }

    /// Merge `options` into the stored defaults.
    pub fn apply_options(&mut self, options: RequestOptions) -> &mut Self {
        self.options.apply(options);
        self
    }

    /// Merge `headers` into the stored default headers.
    pub fn apply_headers(&mut self, headers: HeaderBag) -> &mut Self {
        self.options.headers = merge_headers(&self.options.headers, &headers);
        self
    }

    /// Register `parser` for responses with status `code`.
    pub fn status(&mut self, code: u16, parser: Parser<T>) -> &mut Self {
        self.registry.set(code, parser);
        self
    }

    /// Base URL.
    #[must_use]
    pub fn get_url(&self) -> &str {
        &self.url
    }

    /// Stored default options.
    #[must_use]
    pub const fn get_options(&self) -> &RequestOptions {
        &self.options
    }

    /// Stored default headers.
    #[must_use]
    pub const fn get_headers(&self) -> &HeaderBag {
        &self.options.headers
    }

    /// Registered parsers.
    #[must_use]
    pub const fn registry(&self) -> &Registry<T> {
        &self.registry
    }

    /// New client whose URL is `url` when `override_url` is set, else the
    /// current URL followed by `url`.
    ///
    /// No separator is inserted or removed.
    #[must_use]
    pub fn url(&self, url: &str, override_url: bool) -> Self {
        let mut derived = self.copy();
        derived.url = if override_url {
            url.to_string()
        } else {
            format!("{}{url}", self.url)
        };
        derived
    }

    /// Independent client with the same URL, options, parsers and transport.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            url: self.url.clone(),
            options: self.options.clone(),
            registry: self.registry.copy(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Send + 'static> Client<T> {
    /// Same client with every parser's output passed through `f`.
    #[must_use]
    pub fn map_output<U, F>(&self, f: F) -> Client<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Client {
            url: self.url.clone(),
            options: self.options.clone(),
            registry: self.registry.map_output(f),
            transport: Arc::clone(&self.transport),
        }
    }

    /// Dispatch a request.
    ///
    /// Stored options are merged with `options`; `method` and the target URL
    /// always win. The transport call is created now and runs when the
    /// returned query is first awaited.
    pub fn fetch(&self, method: Method, target: impl Into<Target>, options: RequestOptions) -> Query<T> {
        let url = match target.into() {
            Target::Path(path) => format!("{}{path}", self.url),
            Target::Url(url) => url.to_string(),
        };

        let prepared = Arc::new(merge_options(url, method, &options, &self.options));
        tracing::debug!(%method, url = %prepared.url, "dispatching request");

        let pending = match finalize_options(&prepared) {
            Ok(request) => self.transport.fetch(request),
            Err(err) => futures_util::future::ready(Err(err)).boxed(),
        };

        Query::new(pending, prepared, self.registry.copy())
    }

    /// `GET` request.
    pub fn get(&self, target: impl Into<Target>, options: impl Into<Option<RequestOptions>>) -> Query<T> {
        self.fetch(Method::Get, target, options.into().unwrap_or_default())
    }

    /// `HEAD` request.
    pub fn head(&self, target: impl Into<Target>, options: impl Into<Option<RequestOptions>>) -> Query<T> {
        self.fetch(Method::Head, target, options.into().unwrap_or_default())
    }

    /// `OPTIONS` request.
    pub fn options(&self, target: impl Into<Target>, options: impl Into<Option<RequestOptions>>) -> Query<T> {
        self.fetch(Method::Options, target, options.into().unwrap_or_default())
    }

    /// `DELETE` request.
    pub fn delete(&self, target: impl Into<Target>, options: impl Into<Option<RequestOptions>>) -> Query<T> {
        self.fetch(Method::Delete, target, options.into().unwrap_or_default())
    }

    /// `POST` request with `body`.
    pub fn post(
        &self,
        target: impl Into<Target>,
        body: impl Into<RequestBody>,
        options: impl Into<Option<RequestOptions>>,
    ) -> Query<T> {
        self.fetch(Method::Post, target, with_body(options.into(), body.into()))
    }

    /// `PUT` request with `body`.
    pub fn put(
        &self,
        target: impl Into<Target>,
        body: impl Into<RequestBody>,
        options: impl Into<Option<RequestOptions>>,
    ) -> Query<T> {
        self.fetch(Method::Put, target, with_body(options.into(), body.into()))
    }

    /// `PATCH` request with `body`.
    pub fn patch(
        &self,
        target: impl Into<Target>,
        body: impl Into<RequestBody>,
        options: impl Into<Option<RequestOptions>>,
    ) -> Query<T> {
        self.fetch(Method::Patch, target, with_body(options.into(), body.into()))
    }
}

fn with_body(options: Option<RequestOptions>, body: RequestBody) -> RequestOptions {
    let mut options = options.unwrap_or_default();
    options.body = Some(body);
    options
}
