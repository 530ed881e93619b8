//! Wiring from [`EnvConfig`] to a ready completion client.

use std::sync::Arc;

use cas_auth::{AuthError, CasAuthenticator, SessionManager};
use chat_contract::{ChatLogRecorder, CompletionRequest, CompletionRequestBuilder};
use completion_api::{CompletionError, StreamingCompletionClient};
use thiserror::Error;

use crate::config::EnvConfig;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Session manager primed from the on-disk cookie cache.
pub fn session_manager(config: &EnvConfig) -> Result<SessionManager, SetupError> {
    let authenticator = CasAuthenticator::new(config.auth_config(), config.credentials_provider());
    Ok(SessionManager::new(authenticator, config.credential_store())?)
}

/// Completion client sharing `sessions` and recording into `chat_log`.
pub fn completion_client(
    config: &EnvConfig,
    sessions: Arc<SessionManager>,
    chat_log: Arc<dyn ChatLogRecorder>,
) -> Result<StreamingCompletionClient, SetupError> {
    Ok(StreamingCompletionClient::new(config.completion_config(), sessions)?.with_chat_log(chat_log))
}

/// Request builder preset with the configured model and API key.
pub fn request_builder(config: &EnvConfig, input: impl Into<String>) -> CompletionRequestBuilder {
    let builder = CompletionRequest::builder(input).model(config.model.clone());
    match &config.api_key {
        Some(api_key) => builder.api_key(api_key.clone()),
        None => builder,
    }
}
