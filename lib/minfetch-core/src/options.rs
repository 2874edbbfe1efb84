//! Request options and the merge rules applied on dispatch.
//!
//! Three stages:
//! - [`RequestOptions`]: partial options stored on a client or given per call,
//! - [`PreparedOptions`]: stored and call options merged for one request,
//! - [`TransportRequest`]: prepared options finalized for the transport.
//!
//! Precedence, low to high: stored defaults, per-call options, the dispatch
//! URL and method. Headers merge key by key through [`merge_headers`]; every
//! other field set by the higher layer replaces the lower one wholesale.

use derive_more::Display;
use serde_json::Value;

use crate::headers::{CONTENT_TYPE, HeaderBag, HeaderMap, merge_headers, remove_unset};
use crate::{AbortSignal, ContentType, Method, RequestBody, Result, should_become_json};

/// CORS mode of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RequestMode {
    /// `cors`
    #[display("cors")]
    Cors,
    /// `no-cors`
    #[display("no-cors")]
    NoCors,
    /// `same-origin`
    #[display("same-origin")]
    SameOrigin,
    /// `navigate`
    #[display("navigate")]
    Navigate,
}

/// Cache interaction of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RequestCache {
    /// `default`
    #[display("default")]
    Default,
    /// `no-store`
    #[display("no-store")]
    NoStore,
    /// `reload`
    #[display("reload")]
    Reload,
    /// `no-cache`
    #[display("no-cache")]
    NoCache,
    /// `force-cache`
    #[display("force-cache")]
    ForceCache,
    /// `only-if-cached`
    #[display("only-if-cached")]
    OnlyIfCached,
}

/// Whether credentials accompany a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RequestCredentials {
    /// `omit`
    #[display("omit")]
    Omit,
    /// `same-origin`
    #[display("same-origin")]
    SameOrigin,
    /// `include`
    #[display("include")]
    Include,
}

/// Redirect handling of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum RequestRedirect {
    /// Follow redirects transparently.
    #[default]
    #[display("follow")]
    Follow,
    /// Fail on redirect.
    #[display("error")]
    Error,
    /// Hand the redirect response back to the caller.
    #[display("manual")]
    Manual,
}

/// Referrer policy of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ReferrerPolicy {
    /// `no-referrer`
    #[display("no-referrer")]
    NoReferrer,
    /// `no-referrer-when-downgrade`
    #[display("no-referrer-when-downgrade")]
    NoReferrerWhenDowngrade,
    /// `origin`
    #[display("origin")]
    Origin,
    /// `origin-when-cross-origin`
    #[display("origin-when-cross-origin")]
    OriginWhenCrossOrigin,
    /// `same-origin`
    #[display("same-origin")]
    SameOrigin,
    /// `strict-origin`
    #[display("strict-origin")]
    StrictOrigin,
    /// `strict-origin-when-cross-origin`
    #[display("strict-origin-when-cross-origin")]
    StrictOriginWhenCrossOrigin,
    /// `unsafe-url`
    #[display("unsafe-url")]
    UnsafeUrl,
}

/// Options handed through to the transport untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Passthrough {
    /// CORS mode.
    pub mode: Option<RequestMode>,
    /// Cache mode.
    pub cache: Option<RequestCache>,
    /// Credentials mode.
    pub credentials: Option<RequestCredentials>,
    /// Redirect mode.
    pub redirect: Option<RequestRedirect>,
    /// Referrer URL.
    pub referrer: Option<String>,
    /// Referrer policy.
    pub referrer_policy: Option<ReferrerPolicy>,
    /// Subresource integrity metadata.
    pub integrity: Option<String>,
    /// Keep the request alive beyond its initiator.
    pub keepalive: Option<bool>,
}

impl Passthrough {
    /// Field by field: a value set in `overrides` replaces ours.
    #[must_use]
    pub fn merged_with(&self, overrides: &Self) -> Self {
        Self {
            mode: overrides.mode.or(self.mode),
            cache: overrides.cache.or(self.cache),
            credentials: overrides.credentials.or(self.credentials),
            redirect: overrides.redirect.or(self.redirect),
            referrer: overrides.referrer.clone().or_else(|| self.referrer.clone()),
            referrer_policy: overrides.referrer_policy.or(self.referrer_policy),
            integrity: overrides
                .integrity
                .clone()
                .or_else(|| self.integrity.clone()),
            keepalive: overrides.keepalive.or(self.keepalive),
        }
    }
}

/// Partial request options.
///
/// # Example
///
/// ```
/// use minfetch_core::{RequestCache, RequestMode, RequestOptions};
///
/// let options = RequestOptions::new()
///     .with_mode(RequestMode::Cors)
///     .with_cache(RequestCache::NoCache)
///     .with_header("X-Trace", "1");
///
/// assert_eq!(options.passthrough.mode, Some(RequestMode::Cors));
/// assert_eq!(options.headers.get("X-Trace"), Some(&Some("1".to_string())));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Option<Method>,
    /// Request body.
    pub body: Option<RequestBody>,
    /// Headers; a `None` value removes the header.
    pub headers: HeaderBag,
    /// Cancellation signal.
    pub signal: Option<AbortSignal>,
    /// Transport passthrough fields.
    pub passthrough: Passthrough,
}

impl RequestOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), Some(value.into()));
        self
    }

    /// Mark a header for removal.
    #[must_use]
    pub fn without_header(mut self, name: impl Into<String>) -> Self {
        self.headers.insert(name.into(), None);
        self
    }

    /// Set the cancellation signal.
    #[must_use]
    pub fn with_signal(mut self, signal: impl Into<AbortSignal>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    /// Set the CORS mode.
    #[must_use]
    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.passthrough.mode = Some(mode);
        self
    }

    /// Set the cache mode.
    #[must_use]
    pub fn with_cache(mut self, cache: RequestCache) -> Self {
        self.passthrough.cache = Some(cache);
        self
    }

    /// Set the credentials mode.
    #[must_use]
    pub fn with_credentials(mut self, credentials: RequestCredentials) -> Self {
        self.passthrough.credentials = Some(credentials);
        self
    }

    /// Set the redirect mode.
    #[must_use]
    pub fn with_redirect(mut self, redirect: RequestRedirect) -> Self {
        self.passthrough.redirect = Some(redirect);
        self
    }

    /// Set the referrer.
    #[must_use]
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.passthrough.referrer = Some(referrer.into());
        self
    }

    /// Set the referrer policy.
    #[must_use]
    pub fn with_referrer_policy(mut self, policy: ReferrerPolicy) -> Self {
        self.passthrough.referrer_policy = Some(policy);
        self
    }

    /// Set the integrity metadata.
    #[must_use]
    pub fn with_integrity(mut self, integrity: impl Into<String>) -> Self {
        self.passthrough.integrity = Some(integrity.into());
        self
    }

    /// Set keepalive.
    #[must_use]
    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.passthrough.keepalive = Some(keepalive);
        self
    }

    /// Merge `partial` into these options in place.
    ///
    /// Headers merge key by key; any other field set in `partial` replaces ours.
    pub fn apply(&mut self, partial: Self) {
        self.headers = merge_headers(&self.headers, &partial.headers);
        self.passthrough = self.passthrough.merged_with(&partial.passthrough);
        if partial.method.is_some() {
            self.method = partial.method;
        }
        if partial.body.is_some() {
            self.body = partial.body;
        }
        if partial.signal.is_some() {
            self.signal = partial.signal;
        }
    }
}

/// Options for one dispatched request.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedOptions {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Request body.
    pub body: Option<RequestBody>,
    /// Merged headers.
    pub headers: HeaderBag,
    /// Cancellation signal.
    pub signal: Option<AbortSignal>,
    /// Transport passthrough fields.
    pub passthrough: Passthrough,
}

impl PreparedOptions {
    /// Bare options for `method` on `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, method: Method) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            headers: HeaderBag::new(),
            signal: None,
            passthrough: Passthrough::default(),
        }
    }
}

/// Merge stored and per-call options for one request.
///
/// ```
/// use minfetch_core::{Method, RequestOptions, merge_options};
///
/// let stored = RequestOptions::new().with_header("Accept", "*/*");
/// let call = RequestOptions::new()
///     .with_method(Method::Delete)
///     .with_header("Accept", "application/json");
///
/// let prepared = merge_options("http://x/users", Method::Get, &call, &stored);
/// assert_eq!(prepared.method, Method::Get);
/// assert_eq!(prepared.headers.get("Accept"), Some(&Some("application/json".to_string())));
/// ```
#[must_use]
pub fn merge_options(
    url: impl Into<String>,
    method: Method,
    call: &RequestOptions,
    stored: &RequestOptions,
) -> PreparedOptions {
    PreparedOptions {
        url: url.into(),
        method,
        body: call.body.clone().or_else(|| stored.body.clone()),
        headers: merge_headers(&stored.headers, &call.headers),
        signal: call.signal.clone().or_else(|| stored.signal.clone()),
        passthrough: stored.passthrough.merged_with(&call.passthrough),
    }
}

/// Options as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Request body, JSON encoded when required.
    pub body: Option<RequestBody>,
    /// Final headers.
    pub headers: HeaderMap,
    /// Cancellation signal.
    pub signal: Option<AbortSignal>,
    /// Transport passthrough fields.
    pub passthrough: Passthrough,
}

impl TransportRequest {
    /// Single header value by exact name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Effective redirect mode.
    #[must_use]
    pub fn redirect(&self) -> RequestRedirect {
        self.passthrough.redirect.unwrap_or_default()
    }
}

/// Last transformation before the transport.
///
/// 1. A `Content-Type` of exactly `multipart/form-data` is removed, so the
///    transport can emit one carrying the boundary.
/// 2. A structured body under `application/json` is JSON encoded, unless it is
///    shaped like a buffer view.
/// 3. Unset headers are dropped.
///
/// A JSON `null` body counts as no body.
pub fn finalize_options(prepared: &PreparedOptions) -> Result<TransportRequest> {
    let mut headers = prepared.headers.clone();
    if matches!(headers.get(CONTENT_TYPE), Some(Some(value)) if value == ContentType::Multipart.as_str())
    {
        headers.remove(CONTENT_TYPE);
    }

    let content_type = prepared.headers.get(CONTENT_TYPE).and_then(Option::as_deref);
    let body = match &prepared.body {
        Some(RequestBody::Json(Value::Null)) => None,
        Some(RequestBody::Json(value)) if should_become_json(prepared.body.as_ref(), content_type) => {
            Some(RequestBody::Text(serde_json::to_string(value)?))
        }
        other => other.clone(),
    };

    Ok(TransportRequest {
        url: prepared.url.clone(),
        method: prepared.method,
        body,
        headers: remove_unset(&headers),
        signal: prepared.signal.clone(),
        passthrough: prepared.passthrough.clone(),
    })
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde_json::json;

    use super::*;

    fn prepared(headers: HeaderBag, body: Option<RequestBody>) -> PreparedOptions {
        PreparedOptions {
            url: "http://example.com".to_string(),
            method: Method::Get,
            body,
            headers,
            signal: None,
            passthrough: Passthrough::default(),
        }
    }

    #[test]
    fn apply_replaces_scalars_and_merges_headers() {
        let mut options = RequestOptions::new()
            .with_mode(RequestMode::Cors)
            .with_cache(RequestCache::Default)
            .with_header("X-KEPT", "Kept")
            .with_header("X-OVERRIDE", "Not overriden");

        options.apply(
            RequestOptions::new()
                .with_cache(RequestCache::NoCache)
                .with_header("X-OVERRIDE", "Overriden"),
        );

        let expected = RequestOptions::new()
            .with_mode(RequestMode::Cors)
            .with_cache(RequestCache::NoCache)
            .with_header("X-KEPT", "Kept")
            .with_header("X-OVERRIDE", "Overriden");
        check!(options == expected);
    }

    #[test]
    fn merge_call_options_win_over_stored() {
        let signal = AbortSignal::new();
        let stored = RequestOptions::new()
            .with_credentials(RequestCredentials::Include)
            .with_keepalive(true)
            .with_header("Authorization", "Bearer token");
        let call = RequestOptions::new()
            .with_keepalive(false)
            .with_signal(signal.clone())
            .without_header("Authorization")
            .with_body("payload");

        let prepared = merge_options("http://x//200", Method::Post, &call, &stored);

        check!(prepared.url == "http://x//200");
        check!(prepared.method == Method::Post);
        check!(prepared.passthrough.credentials == Some(RequestCredentials::Include));
        check!(prepared.passthrough.keepalive == Some(false));
        check!(prepared.signal == Some(signal));
        check!(!prepared.headers.contains_key("Authorization"));
        check!(prepared.body == Some(RequestBody::Text("payload".to_string())));
    }

    #[test]
    fn merge_url_and_method_always_win() {
        let stored = RequestOptions::new().with_method(Method::Put);
        let call = RequestOptions::new().with_method(Method::Patch);

        let prepared = merge_options("http://x/a", Method::Head, &call, &stored);

        check!(prepared.method == Method::Head);
    }

    #[test]
    fn finalize_removes_multipart_content_type() {
        let headers = HeaderBag::from([
            (CONTENT_TYPE.to_string(), Some("multipart/form-data".to_string())),
            ("Accept".to_string(), Some("*/*".to_string())),
        ]);

        let_assert!(Ok(request) = finalize_options(&prepared(headers, None)));

        check!(request.header(CONTENT_TYPE).is_none());
        check!(request.header("Accept") == Some("*/*"));
    }

    #[test]
    fn finalize_encodes_json_body() {
        let headers = HeaderBag::from([(CONTENT_TYPE.to_string(), Some("application/json".to_string()))]);
        let body = RequestBody::Json(json!({ "foo": "bar" }));

        let_assert!(Ok(request) = finalize_options(&prepared(headers, Some(body))));

        check!(request.body == Some(RequestBody::Text(r#"{"foo":"bar"}"#.to_string())));
    }

    #[test]
    fn finalize_encodes_scalar_json_bodies() {
        let headers = HeaderBag::from([(CONTENT_TYPE.to_string(), Some("application/json".to_string()))]);

        let_assert!(Ok(number) = finalize_options(&prepared(headers.clone(), Some(RequestBody::Json(json!(42))))));
        let_assert!(Ok(text) = finalize_options(&prepared(headers.clone(), Some(RequestBody::Json(json!("hi"))))));
        let_assert!(Ok(null) = finalize_options(&prepared(headers, Some(RequestBody::Json(Value::Null)))));

        check!(number.body == Some(RequestBody::Text("42".to_string())));
        check!(text.body == Some(RequestBody::Text(r#""hi""#.to_string())));
        check!(null.body.is_none());
    }

    #[test]
    fn finalize_keeps_buffer_view_body() {
        let headers = HeaderBag::from([(CONTENT_TYPE.to_string(), Some("application/json".to_string()))]);
        let view = json!({ "buffer": [0, 0, 0, 0], "byteLength": 4, "byteOffset": 0 });

        let_assert!(
            Ok(request) = finalize_options(&prepared(headers, Some(RequestBody::Json(view.clone()))))
        );

        check!(request.body == Some(RequestBody::Json(view)));
    }

    #[test]
    fn finalize_drops_unset_headers() {
        let headers = HeaderBag::from([
            ("Authorization".to_string(), None),
            ("Accept".to_string(), Some("text/plain".to_string())),
        ]);

        let_assert!(Ok(request) = finalize_options(&prepared(headers, None)));

        check!(request.headers == HeaderMap::from([("Accept".to_string(), "text/plain".to_string())]));
    }

    #[test]
    fn redirect_defaults_to_follow() {
        let_assert!(Ok(request) = finalize_options(&prepared(HeaderBag::new(), None)));
        check!(request.redirect() == RequestRedirect::Follow);
    }

    #[test]
    fn passthrough_display_values() {
        check!(RequestMode::NoCors.to_string() == "no-cors");
        check!(RequestCache::OnlyIfCached.to_string() == "only-if-cached");
        check!(ReferrerPolicy::StrictOriginWhenCrossOrigin.to_string() == "strict-origin-when-cross-origin");
    }
}
