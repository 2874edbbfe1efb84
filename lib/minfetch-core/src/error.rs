//! Error types for minfetch.
//!
//! Every failure of a dispatched request surfaces through [`Error`]; nothing is
//! recovered locally. The type is `Clone` because a pending request may be
//! awaited from several places and each waiter receives the same failure.

use derive_more::{Display, Error, From};

/// Main error type for minfetch operations.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum Error {
    /// `json` was given a status code but no transformer.
    #[display("no JSON transformer was defined")]
    #[from(skip)]
    NoJsonTransformer,

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Transport timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The request was cancelled through its abort signal.
    #[display("request aborted")]
    #[from(skip)]
    Aborted,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from(skip)]
    JsonSerialization(#[error(not(source))] String),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// A response body could not be read in the requested format.
    #[display("parse error: {_0}")]
    #[from(skip)]
    Parse(#[error(not(source))] String),

    /// Failure raised by a user supplied parser.
    #[display("parser error: {_0}")]
    #[from(skip)]
    Parser(#[error(not(source))] String),

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from(skip)]
    FormSerialization(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Too many redirects.
    #[display("too many redirects ({count} exceeded max of {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Number of redirects followed.
        count: usize,
        /// Maximum allowed redirects.
        max: usize,
    },

    /// Invalid redirect response, or a redirect while `redirect` is `error`.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonSerialization(err.to_string())
    }
}

impl From<serde_html_form::ser::Error> for Error {
    fn from(err: serde_html_form::ser::Error) -> Self {
        Self::FormSerialization(err.to_string())
    }
}

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a body parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Create an error from inside a response parser.
    ///
    /// ```
    /// use minfetch_core::Error;
    ///
    /// let err = Error::parser("missing user id");
    /// assert_eq!(err.to_string(), "parser error: missing user id");
    /// ```
    #[must_use]
    pub fn parser(message: impl std::fmt::Display) -> Self {
        Self::Parser(message.to_string())
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if the request was aborted.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the error comes from the transport layer.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Tls(_)
                | Self::Timeout
                | Self::Aborted
                | Self::TooManyRedirects { .. }
                | Self::InvalidRedirect(_)
        )
    }

    /// Returns `true` if a response body failed to parse.
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::JsonDeserialization { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            Error::NoJsonTransformer.to_string(),
            "no JSON transformer was defined"
        );
        assert_eq!(Error::Timeout.to_string(), "request timeout");
        assert_eq!(Error::Aborted.to_string(), "request aborted");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");

        let err = Error::json_deserialization("user.address.city", "missing field `city`");
        assert_eq!(
            err.to_string(),
            "JSON deserialization error at 'user.address.city': missing field `city`"
        );
    }

    #[test]
    fn error_classification() {
        assert!(Error::Timeout.is_timeout());
        assert!(Error::Aborted.is_aborted());
        assert!(Error::Aborted.is_transport());
        assert!(Error::connection("failed").is_connection());
        assert!(Error::connection("failed").is_transport());
        assert!(!Error::NoJsonTransformer.is_transport());
        assert!(Error::parse("bad").is_parse());
        assert!(Error::json_deserialization("", "eof").is_parse());
        assert!(!Error::parser("boom").is_parse());
    }

    #[test]
    fn error_from_serde_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        let err = Error::from(err);
        assert!(matches!(err, Error::JsonSerialization(_)));
    }

    #[test]
    fn error_is_clone() {
        let err = Error::parser("boom");
        assert_eq!(err.clone(), err);
    }
}
