use reqwest::header::{HeaderValue, COOKIE};
use reqwest::{Client, StatusCode};
use session_store::{CredentialStore, Session};
use tokio::sync::{Mutex, RwLock};

use crate::authenticator::{CasAuthenticator, LoginOutcome};
use crate::endpoints::{endpoint, MODELS_PATH};
use crate::error::{AuthError, LoginStage};
use crate::retry::LoginRetryPolicy;

/// Owns the shared gateway session.
///
/// One instance is shared by `Arc` across concurrent callers. Reads go
/// through the cache lock; every refresh or invalidation holds the refresh
/// mutex, so only one login runs at a time.
#[derive(Debug)]
pub struct SessionManager {
    authenticator: CasAuthenticator,
    store: CredentialStore,
    retry: LoginRetryPolicy,
    http: Client,
    cached: RwLock<Option<Session>>,
    refresh: Mutex<()>,
}

impl SessionManager {
    /// Builds a manager primed with whatever valid session the store holds.
    pub fn new(authenticator: CasAuthenticator, store: CredentialStore) -> Result<Self, AuthError> {
        let http = authenticator.config().http_client(None)?;
        let cached = store.load();
        Ok(Self {
            authenticator,
            store,
            retry: LoginRetryPolicy::default(),
            http,
            cached: RwLock::new(cached),
            refresh: Mutex::new(()),
        })
    }

    pub fn with_retry_policy(mut self, retry: LoginRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cached_session(self, session: Option<Session>) -> Self {
        Self {
            cached: RwLock::new(session),
            ..self
        }
    }

    pub fn authenticator(&self) -> &CasAuthenticator {
        &self.authenticator
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub async fn cached_session(&self) -> Option<Session> {
        self.cached.read().await.clone()
    }

    /// Returns a usable session, logging in again when the cached one is
    /// missing, expired, or rejected by the validation probe.
    ///
    /// Never fails: when every strategy is exhausted the caller gets a
    /// degraded cookie-less session that is not cached.
    pub async fn get_session(&self) -> Session {
        let observed = self.cached_session().await;
        if let Some(session) = &observed {
            if self.is_usable(session).await {
                return session.clone();
            }
        }

        let _guard = self.refresh.lock().await;

        let current = self.cached_session().await;
        if let Some(session) = &current {
            let replaced = observed
                .as_ref()
                .map_or(true, |seen| seen.checksum() != session.checksum());
            if replaced && !self.is_expired(session) {
                tracing::debug!("reusing session refreshed by a concurrent caller");
                return session.clone();
            }
        }

        self.relogin().await
    }

    /// Drops the cached session if it is still `rejected`, so the next
    /// `get_session` logs in again.
    ///
    /// A session another caller installed after `rejected` was handed out is
    /// kept.
    pub async fn force_invalidate(&self, rejected: &Session) {
        let _guard = self.refresh.lock().await;
        let mut cached = self.cached.write().await;
        match cached.as_ref() {
            Some(current) if current.checksum() == rejected.checksum() => {
                *cached = None;
                tracing::info!("cached session invalidated");
            }
            Some(_) => tracing::debug!("rejected session already replaced, keeping the newer one"),
            None => {}
        }
    }

    /// Probes `GET models` with the session cookies.
    pub async fn validate(&self, session: &Session) -> Result<(), AuthError> {
        let stage = LoginStage::Validation;
        let mut request = self
            .http
            .get(endpoint(&self.authenticator.config().base_url, MODELS_PATH))
            .timeout(self.authenticator.config().validation_timeout);
        if let Some(cookie) = session
            .cookie_header()
            .and_then(|cookie| HeaderValue::from_str(&cookie).ok())
        {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|source| AuthError::transport(stage, source))?;
        let status = response.status();
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(AuthError::Rejected { stage, status })
        }
    }

    /// Runs the login under the retry policy and installs the result.
    ///
    /// Callers must hold the refresh mutex.
    async fn relogin(&self) -> Session {
        let outcome = match self
            .retry
            .run(|attempt| {
                tracing::info!(attempt, "logging in to the gateway");
                self.authenticator.login()
            })
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(error) => {
                tracing::error!(
                    attempts = self.retry.max_attempts.max(1),
                    %error,
                    "gateway authentication exhausted, trying anonymous access"
                );
                match self.authenticator.fallback_anonymous().await {
                    Ok(outcome) => Some(outcome),
                    Err(error) => {
                        tracing::error!(%error, "anonymous access failed, continuing without a session");
                        None
                    }
                }
            }
        };

        match outcome {
            Some(LoginOutcome { session, strategy }) => {
                tracing::info!(%strategy, "gateway session established");
                self.store.save(&session);
                *self.cached.write().await = Some(session.clone());
                session
            }
            None => {
                *self.cached.write().await = None;
                Session::degraded()
            }
        }
    }

    async fn is_usable(&self, session: &Session) -> bool {
        if self.is_expired(session) {
            tracing::info!("cached session expired");
            return false;
        }
        match self.validate(session).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "cached session failed validation");
                false
            }
        }
    }

    fn is_expired(&self, session: &Session) -> bool {
        session.is_expired_at(
            session_store::now_epoch_seconds(),
            self.authenticator.config().login_interval,
        )
    }
}
