use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Proxy};
use session_store::LOGIN_INTERVAL_SECS;

use crate::cookies::FlatCookieJar;
use crate::endpoints::DEFAULT_API_BASE;
use crate::error::AuthError;

/// Cookie the CAS gateway sets once a form login succeeds.
pub const SESSION_COOKIE: &str = "__Secure-Login-State-cas";

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Gateway settings shared by the authenticator and the session manager.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base URL; endpoint paths such as `cas/login` are appended to it.
    pub base_url: String,
    /// Timeout for every login request.
    pub timeout: Duration,
    /// Timeout for the lightweight validation probe.
    pub validation_timeout: Duration,
    pub user_agent: String,
    /// Optional proxy applied to every gateway request.
    pub proxy: Option<String>,
    /// Cookie whose presence proves a successful CAS form login.
    pub session_cookie: String,
    /// Seconds before a session must be re-established.
    pub login_interval: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            validation_timeout: DEFAULT_VALIDATION_TIMEOUT,
            user_agent: BROWSER_USER_AGENT.to_string(),
            proxy: None,
            session_cookie: SESSION_COOKIE.to_string(),
            login_interval: LOGIN_INTERVAL_SECS,
        }
    }
}

impl AuthConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        self.proxy = (!proxy.trim().is_empty()).then(|| proxy.trim().to_string());
        self
    }

    pub fn with_session_cookie(mut self, name: impl Into<String>) -> Self {
        self.session_cookie = name.into();
        self
    }

    pub fn with_login_interval(mut self, seconds: i64) -> Self {
        self.login_interval = seconds;
        self
    }

    /// Builds a client for gateway calls, optionally backed by `jar`.
    pub(crate) fn http_client(&self, jar: Option<Arc<FlatCookieJar>>) -> Result<Client, AuthError> {
        let mut builder = Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout);
        if let Some(jar) = jar {
            builder = builder.cookie_provider(jar);
        }
        if let Some(proxy) = &self.proxy {
            let proxy = Proxy::all(proxy).map_err(|source| AuthError::InvalidProxy {
                url: proxy.clone(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }
        builder.build().map_err(AuthError::Client)
    }
}
