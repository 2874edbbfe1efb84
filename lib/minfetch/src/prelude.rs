//! Common imports.
//!
//! ```
//! use minfetch::prelude::*;
//! ```

pub use crate::{
    AbortController, Client, ClientConfig, Error, FetchResponse, Method, Outcome, Parser, Query,
    RequestBody, RequestOptions, Result, parser,
};
