//! CAS single-sign-on login and long-lived session management.
//!
//! [`CasAuthenticator`] runs one login: the CAS form flow first, then the
//! simplified JSON login, then an anonymous probe. [`SessionManager`] owns
//! the cached [`Session`], revalidates it before use, re-runs the login under
//! a bounded retry policy when needed, and persists every fresh session
//! through a [`CredentialStore`].

pub mod authenticator;
pub mod config;
pub mod cookies;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod extractor;
pub mod manager;
pub mod retry;

pub use authenticator::{CasAuthenticator, LoginFlow, LoginOutcome, LoginStrategy};
pub use config::AuthConfig;
pub use cookies::FlatCookieJar;
pub use credentials::{Credentials, CredentialsProvider, EnvCredentials, StaticCredentials};
pub use endpoints::{endpoint, normalize_base_url, DEFAULT_API_BASE};
pub use error::{AuthError, LoginStage};
pub use extractor::{FormTokenExtractor, FormTokens, RegexFormTokenExtractor};
pub use manager::SessionManager;
pub use retry::LoginRetryPolicy;
pub use session_store::{CredentialStore, Session};
