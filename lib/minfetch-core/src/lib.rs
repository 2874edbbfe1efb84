//! Core types for the minfetch client.
//!
//! This crate holds everything that does not depend on a concrete transport:
//! - [`RequestOptions`] and the merge helpers [`merge_options`], [`merge_headers`]
//!   and [`finalize_options`]
//! - [`RequestBody`], [`FormData`] and JSON helpers
//! - [`AbortController`] / [`AbortSignal`]
//! - [`RawResponse`] and the [`FetchResponse`] facade
//! - [`Registry`] of status code parsers
//! - the [`Transport`] trait
//! - [`Error`] and [`Result`]

mod body;
mod error;
mod form_data;
pub mod headers;
mod method;
mod options;
pub mod prelude;
mod registry;
mod response;
mod signal;
mod transport;

pub use body::{ContentType, RequestBody, from_json, is_buffer_view, should_become_json, to_form, to_json};
pub use error::{Error, Result};
pub use form_data::{FormData, FormFile, FormValue};
pub use headers::{HeaderBag, HeaderMap, header_bag, merge_headers, remove_unset};
pub use method::Method;
pub use options::{
    Passthrough, PreparedOptions, ReferrerPolicy, RequestCache, RequestCredentials, RequestMode,
    RequestOptions, RequestRedirect, TransportRequest, finalize_options, merge_options,
};
pub use registry::{Handler, Outcome, Parser, Registry, parser};
pub use response::{Blob, FetchResponse, RawResponse, ResponseType};
pub use signal::{AbortController, AbortSignal};
pub use transport::Transport;
