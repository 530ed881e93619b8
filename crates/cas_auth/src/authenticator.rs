use std::fmt;
use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use session_store::Session;

use crate::config::AuthConfig;
use crate::cookies::FlatCookieJar;
use crate::credentials::{Credentials, CredentialsProvider};
use crate::endpoints::{endpoint, AUTH_LOGIN_PATH, CAS_LOGIN_PATH, MODELS_PATH};
use crate::error::{AuthError, LoginStage};
use crate::extractor::{FormTokenExtractor, FormTokens, RegexFormTokenExtractor};

/// Which strategy produced a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStrategy {
    Cas,
    Simplified,
    Anonymous,
}

impl fmt::Display for LoginStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cas => "cas",
            Self::Simplified => "simplified",
            Self::Anonymous => "anonymous",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub session: Session,
    pub strategy: LoginStrategy,
}

/// Runs the gateway login state machine.
///
/// ```text
/// START -> FETCH_LOGIN_FORM -> SUBMIT_CREDENTIALS -> VERIFY
///       -> { SUCCESS | FALLBACK_SIMPLE } -> { SUCCESS | FALLBACK_ANONYMOUS }
///       -> { SUCCESS | FAILURE }
/// ```
pub struct CasAuthenticator {
    config: AuthConfig,
    credentials: Arc<dyn CredentialsProvider>,
    extractor: Arc<dyn FormTokenExtractor>,
}

impl fmt::Debug for CasAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CasAuthenticator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CasAuthenticator {
    pub fn new(config: AuthConfig, credentials: Arc<dyn CredentialsProvider>) -> Self {
        Self {
            config,
            credentials,
            extractor: Arc::new(RegexFormTokenExtractor),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn FormTokenExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Starts a login run with an empty cookie jar.
    pub fn begin(&self) -> Result<LoginFlow<'_>, AuthError> {
        let jar = Arc::new(FlatCookieJar::new());
        let http = self.config.http_client(Some(Arc::clone(&jar)))?;
        Ok(LoginFlow {
            config: &self.config,
            extractor: self.extractor.as_ref(),
            http,
            jar,
        })
    }

    /// Runs the whole state machine once.
    ///
    /// Fails only when every strategy, including the anonymous probe, failed.
    pub async fn login(&self) -> Result<LoginOutcome, AuthError> {
        let flow = self.begin()?;

        let Some(credentials) = self.credentials.fetch() else {
            tracing::warn!("no gateway credentials configured, trying anonymous access");
            return flow.fallback_anonymous().await;
        };

        match flow.cas_login(&credentials).await {
            Ok(outcome) => return Ok(outcome),
            Err(error) => tracing::warn!(%error, "CAS login failed, trying simplified login"),
        }

        match flow.fallback_simple(&credentials).await {
            Ok(outcome) => return Ok(outcome),
            Err(error) => tracing::warn!(%error, "simplified login failed, trying anonymous access"),
        }

        flow.fallback_anonymous().await
    }

    /// Anonymous probe on a fresh cookie jar.
    pub async fn fallback_anonymous(&self) -> Result<LoginOutcome, AuthError> {
        self.begin()?.fallback_anonymous().await
    }
}

/// One login run: a client bound to its own cookie jar.
pub struct LoginFlow<'a> {
    config: &'a AuthConfig,
    extractor: &'a dyn FormTokenExtractor,
    http: Client,
    jar: Arc<FlatCookieJar>,
}

#[derive(Serialize)]
struct CasLoginForm<'a> {
    username: &'a str,
    password: &'a str,
    lt: &'a str,
    execution: &'a str,
    #[serde(rename = "_eventId")]
    event_id: &'a str,
}

#[derive(Serialize)]
struct SimplifiedLoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

impl LoginFlow<'_> {
    /// Cookies collected so far in this run.
    pub fn jar(&self) -> &FlatCookieJar {
        &self.jar
    }

    /// `GET cas/login` and extract the hidden form tokens.
    pub async fn fetch_login_form(&self) -> Result<FormTokens, AuthError> {
        let stage = LoginStage::FetchLoginForm;
        let response = self
            .http
            .get(endpoint(&self.config.base_url, CAS_LOGIN_PATH))
            .send()
            .await
            .map_err(|source| AuthError::transport(stage, source))?;
        let html = response
            .text()
            .await
            .map_err(|source| AuthError::transport(stage, source))?;

        self.extractor
            .extract(&html)
            .ok_or(AuthError::MissingFormTokens)
    }

    /// `POST cas/login` with the completed form.
    ///
    /// Succeeds on HTTP 200 or 302 when the session cookie is in the jar
    /// afterwards.
    pub async fn submit(
        &self,
        tokens: &FormTokens,
        credentials: &Credentials,
    ) -> Result<LoginOutcome, AuthError> {
        let form = CasLoginForm {
            username: &credentials.username,
            password: &credentials.password,
            lt: &tokens.lt,
            execution: &tokens.execution,
            event_id: "submit",
        };
        let response = self
            .http
            .post(endpoint(&self.config.base_url, CAS_LOGIN_PATH))
            .form(&form)
            .send()
            .await
            .map_err(|source| AuthError::transport(LoginStage::SubmitCredentials, source))?;

        let status = response.status();
        if !matches!(status, StatusCode::OK | StatusCode::FOUND) {
            return Err(AuthError::Rejected {
                stage: LoginStage::SubmitCredentials,
                status,
            });
        }
        if !self.jar.contains(&self.config.session_cookie) {
            return Err(AuthError::MissingSessionCookie {
                status,
                cookie: self.config.session_cookie.clone(),
            });
        }

        let outcome = self.outcome(LoginStrategy::Cas);
        tracing::info!(
            cookies = ?outcome.session.cookies().keys().collect::<Vec<_>>(),
            "CAS login succeeded"
        );
        Ok(outcome)
    }

    /// Form fetch followed by submit.
    pub async fn cas_login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError> {
        let tokens = self.fetch_login_form().await?;
        self.submit(&tokens, credentials).await
    }

    /// `POST auth/login` with JSON credentials; succeeds on HTTP 200.
    pub async fn fallback_simple(
        &self,
        credentials: &Credentials,
    ) -> Result<LoginOutcome, AuthError> {
        let stage = LoginStage::SimplifiedLogin;
        let response = self
            .http
            .post(endpoint(&self.config.base_url, AUTH_LOGIN_PATH))
            .json(&SimplifiedLoginBody {
                username: &credentials.username,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(|source| AuthError::transport(stage, source))?;

        self.expect_ok(stage, &response)?;
        tracing::info!("simplified login succeeded");
        Ok(self.outcome(LoginStrategy::Simplified))
    }

    /// `GET models`; any 200 yields a session, possibly without cookies.
    pub async fn fallback_anonymous(&self) -> Result<LoginOutcome, AuthError> {
        let stage = LoginStage::AnonymousProbe;
        let response = self
            .http
            .get(endpoint(&self.config.base_url, MODELS_PATH))
            .send()
            .await
            .map_err(|source| AuthError::transport(stage, source))?;

        self.expect_ok(stage, &response)?;
        let outcome = self.outcome(LoginStrategy::Anonymous);
        tracing::info!(
            cookie_count = outcome.session.cookies().len(),
            "anonymous access succeeded"
        );
        Ok(outcome)
    }

    fn expect_ok(&self, stage: LoginStage, response: &Response) -> Result<(), AuthError> {
        let status = response.status();
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(AuthError::Rejected { stage, status })
        }
    }

    fn outcome(&self, strategy: LoginStrategy) -> LoginOutcome {
        LoginOutcome {
            session: Session::issued_now(self.jar.snapshot()),
            strategy,
        }
    }
}
