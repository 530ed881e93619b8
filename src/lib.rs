//! Campus LLM gateway client.
//!
//! Signs in to the campus CAS gateway, keeps the cookie session alive across
//! calls, and streams chat completions from the gateway's OpenAI-compatible
//! endpoint.
//!
//! # Public API Overview
//! - Read settings from the environment with [`EnvConfig::from_env`].
//! - Install logging with [`logging::init_tracing`].
//! - Build a shared [`SessionManager`] and a [`StreamingCompletionClient`]
//!   with the [`connect`] helpers.
//! - Describe a call with [`CompletionRequest`] and consume partial results
//!   through any [`PartialResultSink`].

pub mod config;
pub mod connect;
pub mod logging;

pub use crate::config::EnvConfig;
pub use crate::connect::{completion_client, request_builder, session_manager, SetupError};

pub use cas_auth::{
    AuthConfig, AuthError, CasAuthenticator, Credentials, CredentialsProvider, EnvCredentials,
    LoginOutcome, LoginStrategy, SessionManager, StaticCredentials,
};
pub use chat_contract::{
    ChannelSink, ChatLogEntry, ChatLogRecorder, ChatMessage, CompletionRequest,
    CompletionRequestBuilder, MemoryChatLog, NoopChatLog, PartialResult, PartialResultSink,
    PartialUpdate, Role, SamplingParams, StreamStatus,
};
pub use completion_api::{
    CompletionConfig, CompletionError, StreamOutcome, StreamingCompletionClient, Termination,
};
pub use session_store::{CredentialStore, Session, SessionStoreError};
