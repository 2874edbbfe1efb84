//! Tower layers for [`crate::HyperTransport`].
//!
//! Layers wrap a service from [`TransportRequest`](crate::TransportRequest) to
//! [`RawResponse`](crate::RawResponse). The transport always installs
//! [`RedirectLayer`] closest to the network; layers added on the builder wrap
//! it, first added outermost.
//!
//! ```
//! use minfetch::HyperTransport;
//! use minfetch::middleware::{ConcurrencyLimitLayer, LoggingLayer};
//!
//! let transport = HyperTransport::builder()
//!     .layer(LoggingLayer::new())
//!     .layer(ConcurrencyLimitLayer::new(8))
//!     .build();
//! # let _ = transport;
//! ```

mod logging;
mod redirect;

pub use logging::{LogLevel, Logging, LoggingLayer};
pub use redirect::{Redirect, RedirectLayer};

pub use tower::limit::ConcurrencyLimitLayer;
pub use tower::{Layer, ServiceBuilder};
