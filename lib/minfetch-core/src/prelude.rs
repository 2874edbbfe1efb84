//! Common imports.
//!
//! ```
//! use minfetch_core::prelude::*;
//! ```

pub use crate::{
    AbortController, AbortSignal, ContentType, Error, FetchResponse, FormData, Method, Outcome,
    Parser, RequestBody, RequestOptions, Result, Transport, parser,
};
