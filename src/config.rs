//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use cas_auth::{
    AuthConfig, Credentials, CredentialsProvider, EnvCredentials, StaticCredentials,
    DEFAULT_API_BASE,
};
use chat_contract::DEFAULT_MODEL;
use completion_api::retry::DEFAULT_TRANSPORT_RETRIES;
use completion_api::CompletionConfig;
use session_store::{CredentialStore, DEFAULT_CACHE_DIR};

pub const API_BASE_ENV: &str = "DEEPSEEK_NWAFU_API_BASE";
pub const TIMEOUT_ENV: &str = "CAMPUS_LLM_TIMEOUT_SECONDS";
pub const MAX_RETRY_ENV: &str = "CAMPUS_LLM_MAX_RETRY";
pub const PROXY_ENV: &str = "CAMPUS_LLM_PROXY";
pub const CACHE_DIR_ENV: &str = "CAMPUS_LLM_CACHE_DIR";
pub const MODEL_ENV: &str = "CAMPUS_LLM_MODEL";
pub const API_KEY_ENV: &str = "CAMPUS_LLM_API_KEY";

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub api_base: String,
    /// Gateway login, when both username and password are set.
    pub credentials: Option<Credentials>,
    /// Request timeout, also the per-read bound while streaming.
    pub timeout: Duration,
    /// Extra attempts after a timed-out completion request.
    pub max_retry: u32,
    pub proxy: Option<String>,
    pub cache_dir: PathBuf,
    pub model: String,
    pub api_key: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            api_base: env_string_opt(API_BASE_ENV).unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            credentials: EnvCredentials::default().fetch(),
            timeout: Duration::from_secs(env_parse(TIMEOUT_ENV, DEFAULT_TIMEOUT_SECONDS)),
            max_retry: env_parse(MAX_RETRY_ENV, DEFAULT_TRANSPORT_RETRIES),
            proxy: env_string_opt(PROXY_ENV),
            cache_dir: env_string_opt(CACHE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            model: env_string_opt(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: env_string_opt(API_KEY_ENV),
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        let config = AuthConfig::new(&self.api_base).with_timeout(self.timeout);
        match &self.proxy {
            Some(proxy) => config.with_proxy(proxy),
            None => config,
        }
    }

    pub fn completion_config(&self) -> CompletionConfig {
        let config = CompletionConfig::new(&self.api_base)
            .with_read_timeout(self.timeout)
            .with_max_transport_retries(self.max_retry);
        match &self.proxy {
            Some(proxy) => config.with_proxy(proxy),
            None => config,
        }
    }

    pub fn credentials_provider(&self) -> Arc<dyn CredentialsProvider> {
        match &self.credentials {
            Some(credentials) => Arc::new(StaticCredentials::new(
                credentials.username.clone(),
                credentials.password.clone(),
            )),
            None => Arc::new(StaticCredentials::anonymous()),
        }
    }

    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::in_cache_dir(&self.cache_dir)
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env_string_opt(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "ignoring unparsable environment value");
            default
        }),
    }
}
