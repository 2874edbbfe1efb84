//! Transport responses and the read-only facade handed to parsers.
//!
//! The transport produces a [`RawResponse`] with a fully buffered body.
//! Parsers and callers only ever see it through [`FetchResponse`], which pairs
//! it with the [`PreparedOptions`] that produced it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use minfetch_core::{FetchResponse, Method, PreparedOptions, RawResponse};
//!
//! let raw = RawResponse::new(200, r#"{"id":1}"#)
//!     .with_header("content-type", "application/json");
//! let request = PreparedOptions {
//!     url: "http://api.example.com/users/1".to_string(),
//!     method: Method::Get,
//!     body: None,
//!     headers: Default::default(),
//!     signal: None,
//!     passthrough: Default::default(),
//! };
//!
//! let response = FetchResponse::new(raw, Arc::new(request));
//! assert_eq!(response.code(), 200);
//! assert_eq!(response.header("Content-Type"), Some("application/json"));
//! assert_eq!(response.json().expect("json")["id"], 1);
//! ```

use std::sync::Arc;

use bytes::Bytes;
use derive_more::Display;
use serde_json::Value;

use crate::headers::{CONTENT_TYPE, HeaderMap};
use crate::{ContentType, Error, FormData, PreparedOptions, Result, from_json};

/// How a response relates to the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum ResponseType {
    /// Same-origin response.
    #[default]
    #[display("basic")]
    Basic,
    /// Valid cross-origin response.
    #[display("cors")]
    Cors,
    /// Response without a more specific classification.
    #[display("default")]
    Default,
    /// Network error.
    #[display("error")]
    Error,
    /// Opaque cross-origin response.
    #[display("opaque")]
    Opaque,
    /// Redirect returned as-is because redirects are handled manually.
    #[display("opaqueredirect")]
    OpaqueRedirect,
}

/// Response as returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Status code.
    pub status: u16,
    /// Status reason phrase.
    pub status_text: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Final URL after redirects.
    pub url: String,
    /// Whether at least one redirect was followed.
    pub redirected: bool,
    /// Response classification.
    pub response_type: ResponseType,
    /// Buffered body.
    pub body: Bytes,
}

impl RawResponse {
    /// A response with the given status and body.
    ///
    /// The status text defaults to the canonical reason phrase.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        let status_text = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();

        Self {
            status,
            status_text,
            headers: HeaderMap::new(),
            url: String::new(),
            redirected: false,
            response_type: ResponseType::default(),
            body: body.into(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the final URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Mark the response as redirected.
    #[must_use]
    pub fn with_redirected(mut self, redirected: bool) -> Self {
        self.redirected = redirected;
        self
    }

    /// Set the response type.
    #[must_use]
    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }
}

/// Binary body with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Raw bytes.
    pub bytes: Bytes,
    /// Value of the `Content-Type` header, empty when absent.
    pub content_type: String,
}

impl Blob {
    /// Body size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Read-only view over a response and the request that produced it.
///
/// Body accessors may be called any number of times; each one reads the
/// buffered body afresh.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    raw: RawResponse,
    request: Arc<PreparedOptions>,
}

impl FetchResponse {
    /// Wrap a raw response.
    #[must_use]
    pub fn new(raw: RawResponse, request: Arc<PreparedOptions>) -> Self {
        Self { raw, request }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.raw.status
    }

    /// Status reason phrase.
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.raw.status_text
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.raw.status >= 200 && self.raw.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.raw.status >= 300 && self.raw.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.raw.status >= 400 && self.raw.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.raw.status >= 500 && self.raw.status < 600
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.raw.headers
    }

    /// Single header value, name compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Final URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.raw.url
    }

    /// Whether a redirect was followed.
    #[must_use]
    pub const fn redirected(&self) -> bool {
        self.raw.redirected
    }

    /// Response classification.
    #[must_use]
    pub const fn response_type(&self) -> ResponseType {
        self.raw.response_type
    }

    /// Options the request was dispatched with.
    #[must_use]
    pub fn request(&self) -> &PreparedOptions {
        &self.request
    }

    /// Underlying transport response.
    #[must_use]
    pub const fn raw(&self) -> &RawResponse {
        &self.raw
    }

    /// Body parsed as an untyped JSON value.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the body is not valid JSON.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.raw.body).map_err(|err| Error::parse(err.to_string()))
    }

    /// Body deserialized into `D`, with the failing path on error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonDeserialization`] if the body does not match `D`.
    pub fn json_as<D: serde::de::DeserializeOwned>(&self) -> Result<D> {
        from_json(&self.raw.body)
    }

    /// Body as text.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.raw.body.to_vec()).map_err(|err| Error::parse(err.to_string()))
    }

    /// Body as bytes tagged with the response content type.
    #[must_use]
    pub fn blob(&self) -> Blob {
        Blob {
            bytes: self.raw.body.clone(),
            content_type: self.header(CONTENT_TYPE).unwrap_or_default().to_string(),
        }
    }

    /// Body as raw bytes.
    #[must_use]
    pub fn array_buffer(&self) -> Bytes {
        self.raw.body.clone()
    }

    /// Body decoded as form data.
    ///
    /// Accepts `application/x-www-form-urlencoded` and `multipart/form-data`
    /// bodies.
    ///
    /// # Errors
    ///
    /// Returns a parse error for any other content type or a malformed body.
    pub fn form_data(&self) -> Result<FormData> {
        let content_type = self.header(CONTENT_TYPE).unwrap_or_default();

        if ContentType::FormUrlEncoded.matches(content_type) {
            return FormData::from_url_encoded(&self.raw.body);
        }

        if ContentType::Multipart.matches(content_type) {
            let boundary = content_type
                .split(';')
                .filter_map(|param| param.trim().strip_prefix("boundary="))
                .map(|boundary| boundary.trim_matches('"'))
                .next()
                .ok_or_else(|| Error::parse("multipart body without boundary"))?;
            return FormData::from_multipart(&self.raw.body, boundary);
        }

        Err(Error::parse(format!(
            "cannot read form data from content type '{content_type}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::{Method, Passthrough};

    fn response(raw: RawResponse) -> FetchResponse {
        let request = PreparedOptions {
            url: "http://example.com/items".to_string(),
            method: Method::Get,
            body: None,
            headers: crate::HeaderBag::new(),
            signal: None,
            passthrough: Passthrough::default(),
        };
        FetchResponse::new(raw, Arc::new(request))
    }

    #[test]
    fn facade_exposes_status_and_metadata() {
        let raw = RawResponse::new(404, "")
            .with_url("http://example.com/final")
            .with_redirected(true)
            .with_response_type(ResponseType::Cors);

        let response = response(raw);

        check!(response.code() == 404);
        check!(response.status_text() == "Not Found");
        check!(response.is_client_error());
        check!(!response.is_success());
        check!(response.url() == "http://example.com/final");
        check!(response.redirected());
        check!(response.response_type() == ResponseType::Cors);
        check!(response.request().url == "http://example.com/items");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = response(RawResponse::new(200, "").with_header("X-Request-Id", "abc"));

        check!(response.header("x-request-id") == Some("abc"));
        check!(response.header("X-REQUEST-ID") == Some("abc"));
        check!(response.header("x-missing").is_none());
    }

    #[test]
    fn body_can_be_read_repeatedly() {
        let response = response(RawResponse::new(200, r#"{"name":"test"}"#));

        let_assert!(Ok(first) = response.json());
        let_assert!(Ok(second) = response.text());
        check!(first["name"] == "test");
        check!(second == r#"{"name":"test"}"#);
        check!(response.array_buffer().len() == 15);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let response = response(RawResponse::new(200, "not json"));

        let_assert!(Err(err) = response.json());
        check!(err.is_parse());
    }

    #[test]
    fn typed_json_reports_path() {
        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            id: u64,
        }

        let response = response(RawResponse::new(200, r#"{"id":"one"}"#));

        let_assert!(Err(Error::JsonDeserialization { path, .. }) = response.json_as::<User>());
        check!(path == "id");
    }

    #[test]
    fn blob_carries_content_type() {
        let response = response(
            RawResponse::new(200, vec![0_u8, 1, 2]).with_header("content-type", "image/png"),
        );

        let blob = response.blob();
        check!(blob.size() == 3);
        check!(blob.content_type == "image/png");
    }

    #[test]
    fn url_encoded_form_data() {
        let response = response(
            RawResponse::new(200, "name=alice&tag=a&tag=b")
                .with_header("Content-Type", "application/x-www-form-urlencoded"),
        );

        let_assert!(Ok(form) = response.form_data());
        check!(form.get("name").and_then(|value| value.as_text()) == Some("alice"));
        check!(form.get_all("tag").count() == 2);
    }

    #[test]
    fn form_data_rejects_other_content_types() {
        let response =
            response(RawResponse::new(200, "{}").with_header("Content-Type", "application/json"));

        let_assert!(Err(err) = response.form_data());
        check!(err.is_parse());
    }

    #[test]
    fn multipart_form_data_round_trip() {
        let form = FormData::with_boundary("XyZ").text("field", "value");
        let response = response(
            RawResponse::new(200, form.encode()).with_header("Content-Type", form.content_type()),
        );

        let_assert!(Ok(decoded) = response.form_data());
        check!(decoded == form);
    }
}
