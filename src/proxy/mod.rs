//! Same-origin relay in front of the diagnosis backend.
//!
//! Requests under the prefix (default `/api/backend`) are forwarded to the
//! configured backend with method, content type, authorization and body
//! intact. The upstream status and body come back verbatim, tagged with
//! `X-Proxied-From`. An unreachable backend is reported as a structured
//! 503 instead of a transport failure.

pub mod error;
pub mod router;
pub mod server;

pub use error::ProxyError;
pub use router::proxy_router;
pub use server::{start_proxy_server, ProxyServer};

use crate::config::DEFAULT_PROXY_PREFIX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub backend_url: String,
    pub prefix: String,
}

impl ProxyConfig {
    pub fn new(backend_url: &str) -> Self {
        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            prefix: DEFAULT_PROXY_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Prefix with exactly one leading slash and no trailing slash.
    pub(crate) fn normalized_prefix(&self) -> Result<String, ProxyError> {
        let trimmed = self.prefix.trim().trim_matches('/');
        if trimmed.is_empty() || trimmed.contains(['*', ':', '?', '#']) {
            return Err(ProxyError::InvalidPrefix(self.prefix.clone()));
        }
        Ok(format!("/{trimmed}"))
    }
}
