use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use campus_llm::{request_builder, CompletionRequest, EnvConfig};
use clap::{Args, Parser, Subcommand};

use crate::app::CliError;

#[derive(Debug, Parser)]
#[command(
    name = "campus-chat",
    about = "Chat with the campus LLM gateway through CAS single sign-on",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one prompt and print the answer as it streams
    Ask(AskArgs),
    /// Sign in (or reuse the cached session) and report the result
    Login,
    /// Delete the cached session cookies
    Logout,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Final user turn
    pub prompt: String,

    #[arg(long)]
    pub system: Option<String>,

    /// Overrides the model from the environment
    #[arg(long)]
    pub model: Option<String>,

    /// Earlier turns, alternating user and assistant, oldest first
    #[arg(long = "history", value_name = "TEXT")]
    pub history: Vec<String>,

    /// JPEG attached to the prompt; repeatable
    #[arg(long = "image", value_name = "FILE")]
    pub images: Vec<PathBuf>,

    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub top_p: Option<f64>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// JSONL chat log; defaults to chat_log.jsonl in the cache directory
    #[arg(long, value_name = "FILE")]
    pub chat_log: Option<PathBuf>,
}

impl AskArgs {
    pub fn to_request(&self, config: &EnvConfig) -> Result<CompletionRequest, CliError> {
        let mut builder = request_builder(config, self.prompt.clone())
            .history(self.history.iter().cloned())
            .stream(!self.no_stream);

        if let Some(system) = &self.system {
            builder = builder.system_prompt(system.clone());
        }
        if let Some(model) = &self.model {
            builder = builder.model(model.clone());
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(top_p) = self.top_p {
            builder = builder.top_p(top_p);
        }
        if let Some(max_tokens) = self.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        for path in &self.images {
            builder = builder.image(encode_image(path)?);
        }

        Ok(builder.build())
    }
}

/// Base64 of the file bytes, without a data-URL prefix.
pub fn encode_image(path: &Path) -> Result<String, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(STANDARD.encode(bytes))
}
