//! Chat-completion transport for the campus gateway.
//!
//! This crate turns a [`CompletionRequest`] into a `chat/completions` call
//! carrying the shared gateway session, retries authentication failures and
//! transport timeouts under separate budgets, and folds the line-oriented
//! event stream into ordered partial results for a [`PartialResultSink`].
//! It holds no UI state.
//!
//! [`CompletionRequest`]: chat_contract::CompletionRequest
//! [`PartialResultSink`]: chat_contract::PartialResultSink

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod sse;

pub use client::{StreamOutcome, StreamingCompletionClient, Termination};
pub use config::CompletionConfig;
pub use error::CompletionError;
pub use events::StreamChunk;
pub use payload::{build_payload, ChatPayload};
pub use retry::{RetryBudgets, RetryState};
pub use sse::LineStreamParser;
