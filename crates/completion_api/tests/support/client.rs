use std::sync::Arc;
use std::time::Duration;

use cas_auth::{
    AuthConfig, CasAuthenticator, CredentialStore, LoginRetryPolicy, SessionManager,
    StaticCredentials,
};
use chat_contract::MemoryChatLog;
use completion_api::{CompletionConfig, StreamingCompletionClient};
use session_store::Session;
use tempfile::TempDir;

use super::{Reply, ScriptedServer};

pub const CHAT_PATH: &str = "/api/chat/completions";
pub const SESSION_COOKIE: &str = "__Secure-Login-State-cas";

const LOGIN_PAGE: &str = r#"<input type="hidden" name="lt" value="LT-1" />
<input type="hidden" name="execution" value="e1s1" />"#;

/// `data:` line carrying one text delta.
pub fn delta(text: &str) -> String {
    format!(
        "data: {}",
        serde_json::json!({"choices": [{"index": 0, "delta": {"content": text}}]})
    )
}

pub struct Harness {
    pub server: ScriptedServer,
    pub client: StreamingCompletionClient,
    pub chat_log: Arc<MemoryChatLog>,
    _cache: TempDir,
}

impl Harness {
    /// Gateway answering CAS logins and validation probes, plus `chat`
    /// replies for `chat/completions`.
    pub async fn new(chat: Vec<Reply>) -> Self {
        Self::with_config(chat, |config| config).await
    }

    pub async fn with_config(
        chat: Vec<Reply>,
        configure: impl FnOnce(CompletionConfig) -> CompletionConfig,
    ) -> Self {
        Self::build(chat, configure, None).await
    }

    /// Like [`Harness::new`], with `session` already cached in the manager.
    pub async fn with_session(chat: Vec<Reply>, session: Session) -> Self {
        Self::build(chat, |config| config, Some(session)).await
    }

    async fn build(
        chat: Vec<Reply>,
        configure: impl FnOnce(CompletionConfig) -> CompletionConfig,
        cached: Option<Session>,
    ) -> Self {
        let server = ScriptedServer::new(vec![
            ("GET", "/api/cas/login", vec![Reply::html(200, LOGIN_PAGE)]),
            (
                "POST",
                "/api/cas/login",
                vec![Reply::html(200, "ok").with_cookie(SESSION_COOKIE, "tgt")],
            ),
            ("GET", "/api/models", vec![Reply::json(200, r#"{"data":[]}"#)]),
            ("POST", CHAT_PATH, chat),
        ])
        .await;

        let cache = TempDir::new().expect("tempdir");
        let authenticator = CasAuthenticator::new(
            AuthConfig::new(&server.base_url),
            Arc::new(StaticCredentials::new("alice", "s3cret")),
        );
        let sessions = SessionManager::new(authenticator, CredentialStore::in_cache_dir(cache.path()))
            .expect("session manager")
            .with_retry_policy(LoginRetryPolicy::new(3, Duration::from_millis(10)))
            .with_cached_session(cached);

        let config = configure(
            CompletionConfig::new(&server.base_url).with_read_timeout(Duration::from_secs(5)),
        );
        let chat_log = Arc::new(MemoryChatLog::default());
        let client = StreamingCompletionClient::new(config, Arc::new(sessions))
            .expect("completion client")
            .with_chat_log(chat_log.clone());

        Self {
            server,
            client,
            chat_log,
            _cache: cache,
        }
    }

    pub fn chat_requests(&self) -> usize {
        self.server.count("POST", CHAT_PATH)
    }

    pub fn logins(&self) -> usize {
        self.server.count("POST", "/api/cas/login")
    }
}
