//! Client and transport configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use minfetch_core::{Registry, RequestOptions, Transport};
use serde_json::Value;

/// Redirects followed before giving up, as browsers do.
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

/// Configuration for [`crate::HyperTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Overall deadline for one request, redirects included. `None` waits forever.
    pub timeout: Option<Duration>,
    /// TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Maximum redirects followed in `follow` mode.
    pub max_redirects: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl TransportConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

/// Builder for [`TransportConfig`].
#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    max_redirects: Option<usize>,
}

impl TransportConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of redirects.
    #[must_use]
    pub const fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = Some(max);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            max_redirects: self.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
        }
    }
}

/// Everything a [`crate::Client`] starts from.
pub struct ClientConfig<T = Value> {
    /// Prefix of every dispatched path.
    pub base_url: String,
    /// Default options for every request.
    pub request_options: RequestOptions,
    /// Initial parsers.
    pub registry: Registry<T>,
    /// Transport; the hyper transport when unset.
    pub transport: Option<Arc<dyn Transport>>,
}

impl<T> Default for ClientConfig<T> {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            request_options: RequestOptions::default(),
            registry: Registry::default(),
            transport: None,
        }
    }
}

impl<T> fmt::Debug for ClientConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("request_options", &self.request_options)
            .field("registry", &self.registry)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
///
/// # Example
///
/// ```
/// use minfetch::{ClientConfig, RequestOptions};
///
/// let config = ClientConfig::builder()
///     .base_url("https://api.example.com")
///     .request_options(RequestOptions::new().with_header("Accept", "application/json"))
///     .build();
///
/// assert_eq!(config.base_url, "https://api.example.com");
/// ```
pub struct ClientConfigBuilder<T = Value> {
    config: ClientConfig<T>,
}

impl<T> Default for ClientConfigBuilder<T> {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }
}

impl<T> fmt::Debug for ClientConfigBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl<T> ClientConfigBuilder<T> {
    /// Set the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the default request options.
    #[must_use]
    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.config.request_options = options;
        self
    }

    /// Set the initial parsers; this fixes the client output type.
    #[must_use]
    pub fn registry<U>(self, registry: Registry<U>) -> ClientConfigBuilder<U> {
        let ClientConfig {
            base_url,
            request_options,
            transport,
            ..
        } = self.config;

        ClientConfigBuilder {
            config: ClientConfig {
                base_url,
                request_options,
                registry,
                transport,
            },
        }
    }

    /// Use a custom transport.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.config.transport = Some(Arc::new(transport));
        self
    }

    /// Use a shared transport.
    #[must_use]
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.config.transport = Some(transport);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig<T> {
        self.config
    }
}
