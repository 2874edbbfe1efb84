//! HTTP method types.

use derive_more::Display;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Method {
    /// GET method - retrieve a resource.
    #[display("GET")]
    Get,
    /// POST method - create a resource.
    #[display("POST")]
    Post,
    /// PUT method - replace a resource.
    #[display("PUT")]
    Put,
    /// PATCH method - partially update a resource.
    #[display("PATCH")]
    Patch,
    /// DELETE method - remove a resource.
    #[display("DELETE")]
    Delete,
    /// TRACE method - message loop-back test.
    #[display("TRACE")]
    Trace,
    /// OPTIONS method - retrieve allowed methods.
    #[display("OPTIONS")]
    Options,
    /// HEAD method - retrieve headers only.
    #[display("HEAD")]
    Head,
    /// CONNECT method - establish a tunnel.
    #[display("CONNECT")]
    Connect,
}

impl Method {
    /// Returns `true` if a request with this method is sent without a body.
    #[must_use]
    pub const fn is_bodyless(&self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
            Method::Trace => Self::TRACE,
            Method::Options => Self::OPTIONS,
            Method::Head => Self::HEAD,
            Method::Connect => Self::CONNECT,
        }
    }
}

impl TryFrom<http::Method> for Method {
    type Error = crate::Error;

    fn try_from(method: http::Method) -> Result<Self, Self::Error> {
        match method {
            http::Method::GET => Ok(Self::Get),
            http::Method::POST => Ok(Self::Post),
            http::Method::PUT => Ok(Self::Put),
            http::Method::PATCH => Ok(Self::Patch),
            http::Method::DELETE => Ok(Self::Delete),
            http::Method::TRACE => Ok(Self::Trace),
            http::Method::OPTIONS => Ok(Self::Options),
            http::Method::HEAD => Ok(Self::Head),
            http::Method::CONNECT => Ok(Self::Connect),
            other => Err(crate::Error::InvalidRequest(format!(
                "unsupported HTTP method: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Post.to_string(), "POST");
        assert_eq!(Method::Put.to_string(), "PUT");
        assert_eq!(Method::Patch.to_string(), "PATCH");
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert_eq!(Method::Trace.to_string(), "TRACE");
        assert_eq!(Method::Options.to_string(), "OPTIONS");
        assert_eq!(Method::Head.to_string(), "HEAD");
        assert_eq!(Method::Connect.to_string(), "CONNECT");
    }

    #[test]
    fn only_get_and_head_are_bodyless() {
        assert!(Method::Get.is_bodyless());
        assert!(Method::Head.is_bodyless());
        assert!(!Method::Options.is_bodyless());
        assert!(!Method::Post.is_bodyless());
        assert!(!Method::Delete.is_bodyless());
    }

    #[test]
    fn method_http_conversions() {
        assert_eq!(http::Method::from(Method::Trace), http::Method::TRACE);
        assert_eq!(
            Method::try_from(http::Method::CONNECT).expect("CONNECT"),
            Method::Connect
        );
        let custom = http::Method::from_bytes(b"PURGE").expect("custom method");
        assert!(Method::try_from(custom).is_err());
    }
}
