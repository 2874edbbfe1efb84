//! Pending requests and their response handling.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde_json::Value;

use crate::{
    Error, FetchResponse, HeaderBag, Outcome, Parser, PreparedOptions, RawResponse, Registry,
    Result, parser,
};

/// Turns a response's JSON body into a `T`, with the response at hand.
pub type JsonTransformer<T> = Arc<dyn Fn(Value, &FetchResponse) -> Result<T> + Send + Sync>;

/// A dispatched request and the parsers that will handle its response.
///
/// The underlying call is shared: resolving the query several times, or
/// resolving copies of it, drives a single transport request. Awaiting yields
/// [`Outcome::Parsed`] when a parser matched the status code and
/// [`Outcome::Response`] otherwise. Transport and parser failures surface as
/// `Err`.
///
/// # Example
///
/// ```no_run
/// use minfetch::{Client, Outcome};
///
/// # async fn run() -> minfetch::Result<()> {
/// let client = Client::with_base_url("https://api.example.com");
/// let query = client
///     .get("/users/1", None)
///     .json_status(404, |_| Ok(serde_json::Value::Null))
///     .json();
///
/// let first = query.resolve().await?;
/// let again = (&query).await?;
/// assert_eq!(first.is_parsed(), again.is_parsed());
/// # Ok(())
/// # }
/// ```
pub struct Query<T = Value> {
    pending: Shared<BoxFuture<'static, Result<RawResponse>>>,
    options: Arc<PreparedOptions>,
    registry: Registry<T>,
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl<T> Query<T> {
    /// Wrap a pending transport call.
    #[must_use]
    pub fn new(
        pending: BoxFuture<'static, Result<RawResponse>>,
        options: Arc<PreparedOptions>,
        registry: Registry<T>,
    ) -> Self {
        Self {
            pending: pending.shared(),
            options,
            registry,
        }
    }

    /// Register `parser` for status `code` on this query only.
    #[must_use]
    pub fn status(mut self, code: u16, parser: Parser<T>) -> Self {
        self.registry.set(code, parser);
        self
    }

    /// Options the request was dispatched with.
    #[must_use]
    pub fn get_options(&self) -> &PreparedOptions {
        &self.options
    }

    /// Headers the request was dispatched with.
    #[must_use]
    pub fn get_headers(&self) -> &HeaderBag {
        &self.options.headers
    }

    /// Request URL.
    #[must_use]
    pub fn get_url(&self) -> &str {
        &self.options.url
    }

    /// Parsers of this query.
    #[must_use]
    pub const fn registry(&self) -> &Registry<T> {
        &self.registry
    }

    /// Same pending call and options, independent parsers.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            pending: self.pending.clone(),
            options: Arc::clone(&self.options),
            registry: self.registry.copy(),
        }
    }
}

impl<T: Send + 'static> Query<T> {
    /// Parse every response body as JSON, whatever the status.
    #[must_use]
    pub fn json_with(mut self, transformer: impl Fn(Value) -> Result<T> + Send + Sync + 'static) -> Self {
        self.registry
            .set_global(json_parser(Arc::new(move |value, _: &FetchResponse| transformer(value))));
        self
    }

    /// Parse the body of `code` responses as JSON.
    #[must_use]
    pub fn json_status(
        mut self,
        code: u16,
        transformer: impl Fn(Value) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.registry
            .set(code, json_parser(Arc::new(move |value, _: &FetchResponse| transformer(value))));
        self
    }

    /// Start the request, if not started yet, and handle its response.
    pub fn resolve(&self) -> BoxFuture<'static, Result<Outcome<T>>> {
        let pending = self.pending.clone();
        let options = Arc::clone(&self.options);
        let registry = self.registry.copy();

        async move {
            let raw = pending.await?;
            registry.apply(FetchResponse::new(raw, options)).await
        }
        .boxed()
    }

    /// Resolve, then continue with `f`.
    pub async fn then<U, F, Fut>(self, f: F) -> Result<U>
    where
        F: FnOnce(Outcome<T>) -> Fut,
        Fut: Future<Output = Result<U>>,
    {
        f(self.resolve().await?).await
    }

    /// Resolve, recovering from failure with `f`.
    pub async fn catch<F, Fut>(self, f: F) -> Result<Outcome<T>>
    where
        F: FnOnce(Error) -> Fut,
        Fut: Future<Output = Result<Outcome<T>>>,
    {
        match self.resolve().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => f(err).await,
        }
    }

    /// Same query with every parser's output passed through `f`.
    #[must_use]
    pub fn map_output<U, F>(self, f: F) -> Query<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        Query {
            registry: self.registry.map_output(f),
            pending: self.pending,
            options: self.options,
        }
    }
}

impl<T: From<Value> + Send + 'static> Query<T> {
    /// Parse every response body as JSON, whatever the status.
    #[must_use]
    pub fn json(self) -> Self {
        self.json_with(|value| Ok(T::from(value)))
    }

    /// General form of the JSON helpers.
    ///
    /// The transformer also sees the [`FetchResponse`]:
    /// - no code: global parser, with `transformer` or the identity;
    /// - a code and a transformer: parser for that code;
    /// - a code alone: [`Error::NoJsonTransformer`], raised immediately.
    pub fn try_json(mut self, code: Option<u16>, transformer: Option<JsonTransformer<T>>) -> Result<Self> {
        match (code, transformer) {
            (Some(_), None) => return Err(Error::NoJsonTransformer),
            (Some(code), Some(transformer)) => {
                self.registry.set(code, json_parser(transformer));
            }
            (None, Some(transformer)) => {
                self.registry.set_global(json_parser(transformer));
            }
            (None, None) => return Ok(self.json()),
        }
        Ok(self)
    }
}

fn json_parser<T: Send + 'static>(transformer: JsonTransformer<T>) -> Parser<T> {
    parser(move |response| {
        let transformer = Arc::clone(&transformer);
        async move {
            let value = response.json()?;
            transformer(value, &response)
        }
    })
}

impl<T: Send + 'static> IntoFuture for Query<T> {
    type Output = Result<Outcome<T>>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.resolve()
    }
}

impl<T: Send + 'static> IntoFuture for &Query<T> {
    type Output = Result<Outcome<T>>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.resolve()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};
    use minfetch_core::Method;
    use serde_json::json;

    use super::*;

    fn query(status: u16, body: &'static str, calls: Arc<AtomicUsize>) -> Query {
        let pending = async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(RawResponse::new(status, body))
        }
        .boxed();
        Query::new(
            pending,
            Arc::new(PreparedOptions::new("http://x/", Method::Get)),
            Registry::new(),
        )
    }

    #[tokio::test]
    async fn resolves_once_for_many_waiters() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = query(200, "{}", calls.clone());
        let copy = query.copy();

        let_assert!(Ok(_) = query.resolve().await);
        let_assert!(Ok(_) = (&query).await);
        let_assert!(Ok(_) = copy.await);
        check!(calls.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn pending_call_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let query = query(200, "{}", calls.clone());

        check!(calls.load(Ordering::SeqCst) == 0);
        drop(query.resolve());
        check!(calls.load(Ordering::SeqCst) == 0);
    }

    #[tokio::test]
    async fn json_parses_any_status() {
        let query = query(500, r#"{"error":"boom"}"#, Arc::default()).json();

        let_assert!(Ok(Outcome::Parsed(value)) = query.await);
        check!(value["error"] == "boom");
    }

    #[tokio::test]
    async fn json_status_only_matches_its_code() {
        let query = query(200, "{}", Arc::default()).json_status(404, |_| Ok(Value::Null));

        let_assert!(Ok(Outcome::Response(response)) = query.await);
        check!(response.code() == 200);
    }

    #[test]
    fn try_json_requires_transformer_with_code() {
        let_assert!(Err(Error::NoJsonTransformer) = query(200, "{}", Arc::default()).try_json(Some(404), None));
    }

    #[tokio::test]
    async fn try_json_with_code_and_transformer() {
        let transformer: JsonTransformer<Value> =
            Arc::new(|value: Value, response: &FetchResponse| Ok(json!([value["id"].clone(), response.code()])));
        let_assert!(Ok(query) = query(404, r#"{"id":3}"#, Arc::default()).try_json(Some(404), Some(transformer)));

        let_assert!(Ok(Outcome::Parsed(pair)) = query.await);
        check!(pair == json!([3, 404]));
    }

    #[tokio::test]
    async fn try_json_global_transformer_sees_response() {
        let transformer: JsonTransformer<Value> =
            Arc::new(|value: Value, response: &FetchResponse| Ok(json!({ "code": response.code(), "body": value })));
        let_assert!(Ok(query) = query(503, r#"{"retry":true}"#, Arc::default()).try_json(None, Some(transformer)));

        check!(query.registry().global().is_some());
        check!(query.registry().codes().is_empty());
        let_assert!(Ok(Outcome::Parsed(parsed)) = query.await);
        check!(parsed == json!({ "code": 503, "body": { "retry": true } }));
    }

    #[tokio::test]
    async fn invalid_json_is_an_error() {
        let query = query(200, "<html>", Arc::default()).json();

        let_assert!(Err(err) = query.await);
        check!(err.is_parse());
    }

    #[tokio::test]
    async fn transport_errors_reach_every_waiter() {
        let query: Query = Query::new(
            async { Err(Error::connection("refused")) }.boxed(),
            Arc::new(PreparedOptions::new("http://x/", Method::Get)),
            Registry::new(),
        );

        let_assert!(Err(first) = (&query).await);
        let_assert!(Err(second) = query.await);
        check!(first == second);
        check!(first.is_connection());
    }

    #[tokio::test]
    async fn then_and_catch() {
        let code = query(201, "", Arc::default())
            .then(|outcome| async move { Ok(outcome.response().map(FetchResponse::code)) })
            .await;
        check!(code == Ok(Some(201)));

        let failing = query(200, "nope", Arc::default()).json();
        let_assert!(
            Ok(Outcome::Parsed(Value::Null)) = failing.catch(|_| async { Ok(Outcome::Parsed(Value::Null)) }).await
        );
    }

    #[tokio::test]
    async fn parsers_added_to_a_copy_stay_there() {
        let original = query(200, "{}", Arc::default());
        let parsed = original.copy().json();

        check!(original.registry().is_empty());
        let_assert!(Ok(Outcome::Parsed(_)) = parsed.await);
        let_assert!(Ok(Outcome::Response(_)) = original.await);
    }
}
