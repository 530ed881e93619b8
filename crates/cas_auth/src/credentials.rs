use std::env;
use std::fmt;

pub const USERNAME_ENV: &str = "DEEPSEEK_NWAFU_USERNAME";
pub const PASSWORD_ENV: &str = "DEEPSEEK_NWAFU_PASSWORD";

/// Username/password pair for the CAS gateway.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields are present and non-blank.
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of gateway credentials. `None` means "log in anonymously".
pub trait CredentialsProvider: Send + Sync {
    fn fetch(&self) -> Option<Credentials>;
}

/// Reads credentials from two environment variables on every fetch.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    username_var: String,
    password_var: String,
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(USERNAME_ENV, PASSWORD_ENV)
    }
}

impl EnvCredentials {
    pub fn new(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            username_var: username_var.into(),
            password_var: password_var.into(),
        }
    }
}

impl CredentialsProvider for EnvCredentials {
    fn fetch(&self) -> Option<Credentials> {
        let username = env::var(&self.username_var).ok()?;
        let password = env::var(&self.password_var).ok()?;
        Some(Credentials::new(username, password)).filter(Credentials::is_complete)
    }
}

/// Fixed credentials, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<Credentials>);

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(Some(Credentials::new(username, password)))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl CredentialsProvider for StaticCredentials {
    fn fetch(&self) -> Option<Credentials> {
        self.0.clone().filter(Credentials::is_complete)
    }
}
