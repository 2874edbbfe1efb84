//! Request bodies and serialization helpers.

use bytes::Bytes;
use serde_json::Value;

use crate::{Error, FormData, Result};

/// Well known content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Multipart form content type (`multipart/form-data`).
    Multipart,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::Multipart => "multipart/form-data",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }

    /// Returns `true` if `value` names this content type, ignoring parameters.
    ///
    /// ```
    /// use minfetch_core::ContentType;
    ///
    /// assert!(ContentType::Json.matches("application/json; charset=utf-8"));
    /// assert!(!ContentType::Json.matches("text/plain"));
    /// ```
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        value
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(self.as_str()))
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ContentType> for String {
    fn from(content_type: ContentType) -> Self {
        content_type.as_str().to_string()
    }
}

/// Body of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Text sent as-is.
    Text(String),
    /// Binary buffer sent as-is.
    Bytes(Bytes),
    /// Structured value, JSON encoded when the content type is `application/json`.
    Json(Value),
    /// URL-encoded search parameters.
    UrlEncoded(Vec<(String, String)>),
    /// Multipart form data.
    Multipart(FormData),
}

impl RequestBody {
    /// Build a structured body from any serializable value.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    /// Build a URL-encoded body from a serializable value.
    ///
    /// ```
    /// use minfetch_core::RequestBody;
    ///
    /// #[derive(serde::Serialize)]
    /// struct Login { username: String }
    ///
    /// let body = RequestBody::form(&Login { username: "alice".into() }).expect("form");
    /// assert_eq!(
    ///     body,
    ///     RequestBody::UrlEncoded(vec![("username".into(), "alice".into())])
    /// );
    /// ```
    pub fn form<T: serde::Serialize>(value: &T) -> Result<Self> {
        let encoded = serde_html_form::to_string(value)?;
        let pairs = serde_html_form::from_str(&encoded).map_err(|e| Error::parse(e.to_string()))?;
        Ok(Self::UrlEncoded(pairs))
    }

    /// Returns `true` for a structured value that has not been serialized.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<FormData> for RequestBody {
    fn from(value: FormData) -> Self {
        Self::Multipart(value)
    }
}

/// Returns `true` for values shaped like a typed-array view over a buffer.
///
/// Such values carry binary data and must never be JSON encoded, even under a
/// JSON content type.
#[must_use]
pub fn is_buffer_view(value: &Value) -> bool {
    value.as_object().is_some_and(|object| {
        ["buffer", "byteLength", "byteOffset"]
            .iter()
            .all(|key| object.contains_key(*key))
    })
}

/// Whether `body` must be JSON encoded before reaching the transport.
#[must_use]
pub fn should_become_json(body: Option<&RequestBody>, content_type: Option<&str>) -> bool {
    if content_type != Some(ContentType::Json.as_str()) {
        return false;
    }

    match body {
        Some(RequestBody::Json(value)) => !is_buffer_view(value),
        _ => false,
    }
}

/// Serialize a value to JSON bytes.
///
/// # Example
///
/// ```
/// use minfetch_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Encode URL-encoded pairs.
pub fn to_form(pairs: &[(String, String)]) -> Result<Bytes> {
    serde_html_form::to_string(pairs)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Example
///
/// ```
/// use minfetch_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let user: User = from_json(br#"{"name":"Alice"}"#).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

#[cfg(test)]
mod tests {
    use assert2::check;
    use serde_json::json;

    use super::*;

    #[test]
    fn content_type_as_str() {
        check!(ContentType::Json.as_str() == "application/json");
        check!(ContentType::Multipart.as_str() == "multipart/form-data");
        check!(ContentType::FormUrlEncoded.to_string() == "application/x-www-form-urlencoded");
    }

    #[test]
    fn content_type_matches_with_parameters() {
        check!(ContentType::Multipart.matches("multipart/form-data; boundary=abc"));
        check!(ContentType::Json.matches("Application/JSON"));
    }

    #[test]
    fn plain_object_becomes_json() {
        let body = RequestBody::Json(json!({ "foo": "bar" }));
        check!(should_become_json(Some(&body), Some("application/json")));
    }

    #[test]
    fn scalars_become_json() {
        for value in [json!(42), json!(true), json!("hi")] {
            check!(should_become_json(Some(&RequestBody::Json(value)), Some("application/json")));
        }
    }

    #[test]
    fn other_content_type_is_left_alone() {
        let body = RequestBody::Json(json!({ "foo": "bar" }));
        check!(!should_become_json(Some(&body), Some("text/plain")));
        check!(!should_become_json(Some(&body), None));
    }

    #[test]
    fn buffer_view_is_not_json() {
        let body = RequestBody::Json(json!({
            "buffer": [0, 0, 0, 0, 0, 0, 0, 0],
            "byteLength": 8,
            "byteOffset": 0
        }));
        check!(!should_become_json(Some(&body), Some("application/json")));
    }

    #[test]
    fn text_and_bytes_are_not_json() {
        let text = RequestBody::from("{\"foo\":1}");
        let bytes = RequestBody::from(vec![1_u8, 2, 3]);
        check!(!should_become_json(Some(&text), Some("application/json")));
        check!(!should_become_json(Some(&bytes), Some("application/json")));
        check!(!should_become_json(None, Some("application/json")));
    }

    #[test]
    fn form_body_from_struct() {
        #[derive(serde::Serialize)]
        struct Tagged {
            name: String,
            tags: Vec<String>,
        }

        let body = RequestBody::form(&Tagged {
            name: "test".to_string(),
            tags: vec!["rust".to_string(), "http".to_string()],
        })
        .expect("form");

        let RequestBody::UrlEncoded(pairs) = body else {
            panic!("expected url-encoded body");
        };
        check!(pairs.contains(&("name".to_string(), "test".to_string())));
        check!(pairs.contains(&("tags".to_string(), "rust".to_string())));
        check!(pairs.contains(&("tags".to_string(), "http".to_string())));
    }

    #[test]
    fn to_form_encodes_pairs() {
        let pairs = vec![
            ("q".to_string(), "rust lang".to_string()),
            ("page".to_string(), "1".to_string()),
        ];
        let bytes = to_form(&pairs).expect("encode");
        check!(bytes.as_ref() == b"q=rust+lang&page=1");
    }

    #[test]
    fn from_json_missing_field_error_with_path() {
        #[derive(Debug, serde::Deserialize)]
        struct Address {
            #[allow(dead_code)]
            city: String,
        }

        #[derive(Debug, serde::Deserialize)]
        struct User {
            #[allow(dead_code)]
            address: Address,
        }

        let err = from_json::<User>(br#"{"address":{}}"#).expect_err("should fail");
        let msg = err.to_string();
        check!(msg.contains("address"));
        check!(msg.contains("city"));
    }
}
