use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, USER_AGENT,
};
use session_store::Session;

use crate::config::CompletionConfig;
use crate::error::CompletionError;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const ACCEPT_EVENT_STREAM: &str = "text/event-stream";

/// Headers for one `chat/completions` attempt.
///
/// The session cookies go into a `Cookie` header; `api_key`, when present,
/// becomes a bearer `Authorization` header.
pub fn build_headers(
    config: &CompletionConfig,
    session: &Session,
    api_key: Option<&str>,
    stream: bool,
) -> Result<HeaderMap, CompletionError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    if stream {
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_EVENT_STREAM));
    }
    headers.insert(USER_AGENT, header_value("user-agent", config.user_agent.trim())?);

    if let Some(cookie) = session.cookie_header() {
        headers.insert(COOKIE, header_value("cookie", &cookie)?);
    }

    if let Some(api_key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
        let mut value = header_value("authorization", &format!("Bearer {api_key}"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, CompletionError> {
    HeaderValue::from_str(value).map_err(|_| CompletionError::InvalidHeader { name })
}
