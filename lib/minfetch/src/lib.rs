//! Chainable fetch wrapper with per-status response parsers.
//!
//! A [`Client`] carries a base URL, default options and a registry of
//! response parsers keyed by status code. Dispatching a request returns a
//! [`Query`]; awaiting it runs the parser registered for the response status
//! (or the global one), or hands back the raw [`FetchResponse`].
//!
//! # Example
//!
//! ```no_run
//! use minfetch::prelude::*;
//!
//! # async fn run() -> minfetch::Result<()> {
//! let mut api = Client::with_base_url("https://api.example.com");
//! api.accepts("application/json");
//!
//! let created = api
//!     .post("/users", serde_json::json!({ "name": "Ada" }), None)
//!     .json_status(201, Ok)
//!     .await?;
//!
//! if let Outcome::Parsed(user) = created {
//!     println!("created {user}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Requests go through the [`Transport`] trait; [`HyperTransport`] is the
//! default and accepts tower [`middleware`].

mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;
mod query;
mod transport;

pub use client::{Client, Target};
pub use config::{
    ClientConfig, ClientConfigBuilder, DEFAULT_MAX_REDIRECTS, TransportConfig,
    TransportConfigBuilder,
};
pub use query::{JsonTransformer, Query};
pub use transport::{BoxedService, HyperTransport, HyperTransportBuilder, ServiceFuture};

// Re-export tower for middleware composition
pub use tower;

pub use minfetch_core::{
    AbortController, AbortSignal, Blob, ContentType, Error, FetchResponse, FormData, FormFile,
    FormValue, Handler, HeaderBag, HeaderMap, Method, Outcome, Parser, Passthrough,
    PreparedOptions, RawResponse, ReferrerPolicy, Registry, RequestBody, RequestCache,
    RequestCredentials, RequestMode, RequestOptions, RequestRedirect, ResponseType, Result,
    Transport, TransportRequest, finalize_options, header_bag, headers, merge_headers,
    merge_options, parser, remove_unset,
};
