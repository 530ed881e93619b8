//! Command-line front end for the campus LLM gateway.
//!
//! Reads gateway settings from the environment (see `campus_llm::config`),
//! streams one completion to stdout, and appends every finished exchange to a
//! JSONL chat log next to the cookie cache.

pub mod app;
pub mod chat_log;
pub mod cli;
pub mod output;

pub use crate::app::{run, CliError};
pub use crate::cli::Cli;
