//! Client construction settings
//!
//! Transport-level knobs for the reqwest client plus the request defaults a
//! new [`HttpClient`](crate::HttpClient) starts with.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::request::RequestOptions;

/// Settings applied when an `HttpClient` is built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Upper bound for establishing a connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Value of the `User-Agent` header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Redirect hops to follow; 0 disables redirects
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Initial request defaults merged under every call
    #[serde(default)]
    pub defaults: RequestOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
            defaults: RequestOptions::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new client config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Config whose defaults send `Content-Type: application/json`
    pub fn fetch_style() -> Self {
        Self {
            defaults: RequestOptions::new().with_header("Content-Type", "application/json"),
            ..Default::default()
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set redirect limit
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Set initial request defaults
    pub fn with_defaults(mut self, defaults: RequestOptions) -> Self {
        self.defaults = defaults;
        self
    }
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    format!("Courier/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_redirects() -> usize {
    10
}
