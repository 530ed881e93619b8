use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Step of the login state machine an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    FetchLoginForm,
    SubmitCredentials,
    SimplifiedLogin,
    AnonymousProbe,
    Validation,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FetchLoginForm => "login form fetch",
            Self::SubmitCredentials => "CAS form submit",
            Self::SimplifiedLogin => "simplified login",
            Self::AnonymousProbe => "anonymous probe",
            Self::Validation => "session validation",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to build gateway HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid proxy URL {url}: {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{stage} request failed: {source}")]
    Transport {
        stage: LoginStage,
        #[source]
        source: reqwest::Error,
    },

    #[error("login form is missing the lt/execution tokens")]
    MissingFormTokens,

    #[error("{stage} rejected with HTTP {status}")]
    Rejected { stage: LoginStage, status: StatusCode },

    #[error("CAS form submit returned HTTP {status} without the {cookie} cookie")]
    MissingSessionCookie { status: StatusCode, cookie: String },
}

impl AuthError {
    pub fn transport(stage: LoginStage, source: reqwest::Error) -> Self {
        Self::Transport { stage, source }
    }

    /// Stage that produced the error, when it came from a gateway call.
    pub fn stage(&self) -> Option<LoginStage> {
        match self {
            Self::Transport { stage, .. } | Self::Rejected { stage, .. } => Some(*stage),
            Self::MissingFormTokens => Some(LoginStage::FetchLoginForm),
            Self::MissingSessionCookie { .. } => Some(LoginStage::SubmitCredentials),
            Self::Client(_) | Self::InvalidProxy { .. } => None,
        }
    }
}
