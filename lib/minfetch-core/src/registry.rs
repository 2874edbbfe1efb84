//! Response parsers keyed by status code.
//!
//! A [`Registry`] maps status codes to [`Parser`]s and may hold one global
//! parser used when no code-specific one exists. When neither applies the
//! response is handed back untouched as [`Outcome::Response`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::{FetchResponse, Result};

/// Async transformation of a response into a `T`.
pub type Parser<T> = Arc<dyn Fn(FetchResponse) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Turn an async closure into a [`Parser`].
///
/// ```
/// use minfetch_core::{Error, Parser, parser};
///
/// let user_id: Parser<u64> = parser(|response| async move {
///     let body = response.json()?;
///     body["id"].as_u64().ok_or_else(|| Error::parser("missing id"))
/// });
/// # let _ = user_id;
/// ```
pub fn parser<T, F, Fut>(f: F) -> Parser<T>
where
    F: Fn(FetchResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move |response| f(response).boxed())
}

/// Result of resolving a request.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// A registered parser produced a value.
    Parsed(T),
    /// No parser applied to the status code.
    Response(FetchResponse),
}

impl<T> Outcome<T> {
    /// Whether a parser ran.
    #[must_use]
    pub const fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    /// The parsed value, if any.
    #[must_use]
    pub const fn parsed(&self) -> Option<&T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Response(_) => None,
        }
    }

    /// The unparsed response, if any.
    #[must_use]
    pub const fn response(&self) -> Option<&FetchResponse> {
        match self {
            Self::Parsed(_) => None,
            Self::Response(response) => Some(response),
        }
    }

    /// Consume into the parsed value.
    pub fn into_parsed(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Response(_) => None,
        }
    }

    /// Consume into the unparsed response.
    pub fn into_response(self) -> Option<FetchResponse> {
        match self {
            Self::Parsed(_) => None,
            Self::Response(response) => Some(response),
        }
    }

    /// Map the parsed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Parsed(value) => Outcome::Parsed(f(value)),
            Self::Response(response) => Outcome::Response(response),
        }
    }
}

/// What a registry will do with a response of a given status.
pub enum Handler<T> {
    /// Run this parser.
    Parser(Parser<T>),
    /// Return the response as-is.
    Identity,
}

impl<T: Send + 'static> Handler<T> {
    /// Apply the handler to `response`.
    pub fn run(self, response: FetchResponse) -> BoxFuture<'static, Result<Outcome<T>>> {
        match self {
            Self::Parser(parser) => parser(response).map(|result| result.map(Outcome::Parsed)).boxed(),
            Self::Identity => futures_util::future::ready(Ok(Outcome::Response(response))).boxed(),
        }
    }

    /// Returns `true` for the identity handler.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }
}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parser(_) => f.write_str("Handler::Parser"),
            Self::Identity => f.write_str("Handler::Identity"),
        }
    }
}

/// Status code to parser mapping, plus an optional global parser.
pub struct Registry<T> {
    parsers: HashMap<u16, Parser<T>>,
    global: Option<Parser<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            parsers: HashMap::new(),
            global: None,
        }
    }
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            parsers: self.parsers.clone(),
            global: self.global.clone(),
        }
    }
}

impl<T> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.parsers.keys().collect();
        codes.sort_unstable();
        f.debug_struct("Registry")
            .field("codes", &codes)
            .field("global", &self.global.is_some())
            .finish()
    }
}

impl<T> Registry<T> {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `parser` for `code`, replacing any previous one.
    pub fn set(&mut self, code: u16, parser: Parser<T>) -> &mut Self {
        self.parsers.insert(code, parser);
        self
    }

    /// Register the global parser, replacing any previous one.
    pub fn set_global(&mut self, parser: Parser<T>) -> &mut Self {
        self.global = Some(parser);
        self
    }

    /// Parser registered for `code`.
    #[must_use]
    pub fn get(&self, code: u16) -> Option<&Parser<T>> {
        self.parsers.get(&code)
    }

    /// The global parser.
    #[must_use]
    pub fn global(&self) -> Option<&Parser<T>> {
        self.global.as_ref()
    }

    /// Registered status codes, ascending.
    #[must_use]
    pub fn codes(&self) -> Vec<u16> {
        let mut codes: Vec<_> = self.parsers.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    /// Number of code-specific parsers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    /// No parser at all, global included.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty() && self.global.is_none()
    }

    /// Code-specific parser, else the global one, else identity.
    #[must_use]
    pub fn resolve(&self, code: u16) -> Handler<T> {
        self.parsers
            .get(&code)
            .or(self.global.as_ref())
            .map_or(Handler::Identity, |parser| Handler::Parser(Arc::clone(parser)))
    }

    /// Independent mapping sharing the same parsers.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

impl<T: Send + 'static> Registry<T> {
    /// Resolve and run the handler for `response`.
    pub fn apply(&self, response: FetchResponse) -> BoxFuture<'static, Result<Outcome<T>>> {
        let handler = self.resolve(response.code());
        tracing::trace!(code = response.code(), identity = handler.is_identity(), "applying handler");
        handler.run(response)
    }

    /// Wrap every parser so it yields `U`.
    pub fn map_output<U, F>(&self, f: F) -> Registry<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let wrap = |inner: &Parser<T>| -> Parser<U> {
            let inner = Arc::clone(inner);
            let f = Arc::clone(&f);
            Arc::new(move |response| {
                let f = Arc::clone(&f);
                inner(response).map(move |result| result.map(|value| f(value))).boxed()
            })
        };

        Registry {
            parsers: self.parsers.iter().map(|(code, parser)| (*code, wrap(parser))).collect(),
            global: self.global.as_ref().map(wrap),
        }
    }
}
