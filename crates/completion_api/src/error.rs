use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("failed to build completion HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid proxy URL {url}: {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },

    /// `body` is the raw response body.
    #[error("authentication failed (HTTP {status}): {}", summarize(.status, .body))]
    AuthenticationFailed { status: StatusCode, body: String },

    #[error("request timed out after {attempts} attempt(s)")]
    TransportTimeout { attempts: u32 },

    /// `body` is the raw response body.
    #[error("HTTP {status}: {}", summarize(.status, .body))]
    Protocol { status: StatusCode, body: String },

    #[error("request error: {0}")]
    Request(#[source] reqwest::Error),

    #[error("stream ended without any content")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("request was cancelled")]
    Cancelled,
}

impl CompletionError {
    /// HTTP status behind the error, when the gateway answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::AuthenticationFailed { status, .. } | Self::Protocol { status, .. } => {
                Some(*status)
            }
            Self::Request(error) => error.status(),
            _ => None,
        }
    }

    /// Short diagnostic extracted from the response body, when there is one.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::AuthenticationFailed { status, body } | Self::Protocol { status, body } => {
                Some(parse_error_message(*status, body))
            }
            _ => None,
        }
    }

    /// Whether re-issuing the whole call later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransportTimeout { .. } | Self::Request(_) | Self::EmptyResponse => true,
            Self::Protocol { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

fn summarize(status: &StatusCode, body: &str) -> String {
    parse_error_message(*status, body)
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayloadFields {
    Object { message: Option<String> },
    Text(String),
}

/// Short human-readable summary of an error response body.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    let fallback = || {
        if body.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    let Ok(parsed) = serde_json::from_str::<ErrorPayload>(body) else {
        return fallback();
    };

    let message = match parsed.error {
        Some(ErrorPayloadFields::Object { message }) => message,
        Some(ErrorPayloadFields::Text(message)) => Some(message),
        None => parsed.detail,
    };

    message
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(fallback)
}
