use std::time::Duration;

use cas_auth::DEFAULT_API_BASE;

use crate::retry::{DEFAULT_AUTH_RETRIES, DEFAULT_TRANSPORT_RETRIES};

/// `User-Agent` sent with completion calls.
pub const COMPLETION_USER_AGENT: &str = "GPT-Academic/1.0";
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport configuration for completion requests.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Gateway base URL; `chat/completions` is appended to it.
    pub base_url: String,
    /// Bound on waiting for response headers and on every body read.
    pub read_timeout: Duration,
    /// Extra attempts allowed after a timed-out one.
    pub max_transport_retries: u32,
    /// Re-authentications allowed after a 401/403.
    pub auth_retries: u32,
    /// Minimum spacing between streaming notifications. Zero pushes every delta.
    pub min_refresh_interval: Duration,
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_transport_retries: DEFAULT_TRANSPORT_RETRIES,
            auth_retries: DEFAULT_AUTH_RETRIES,
            min_refresh_interval: Duration::ZERO,
            proxy: None,
            user_agent: COMPLETION_USER_AGENT.to_string(),
        }
    }
}

impl CompletionConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_max_transport_retries(mut self, retries: u32) -> Self {
        self.max_transport_retries = retries;
        self
    }

    pub fn with_auth_retries(mut self, retries: u32) -> Self {
        self.auth_retries = retries;
        self
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        self.proxy = (!proxy.trim().is_empty()).then(|| proxy.trim().to_string());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
