use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use campus_llm::{
    completion_client, session_manager, CompletionError, EnvConfig, SessionStoreError, SetupError,
};
use thiserror::Error;

use crate::chat_log::JsonlChatLog;
use crate::cli::{AskArgs, Cli, Command};
use crate::output::IncrementalPrinter;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Store(#[from] SessionStoreError),
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub async fn run(cli: Cli, config: EnvConfig) -> Result<(), CliError> {
    match cli.command {
        Command::Ask(args) => ask(&args, &config).await,
        Command::Login => login(&config).await,
        Command::Logout => {
            config.credential_store().clear()?;
            println!("cached session removed");
            Ok(())
        }
    }
}

async fn ask(args: &AskArgs, config: &EnvConfig) -> Result<(), CliError> {
    let request = args.to_request(config)?;
    let chat_log = match &args.chat_log {
        Some(path) => JsonlChatLog::new(path),
        None => JsonlChatLog::in_cache_dir(&config.cache_dir),
    };

    let sessions = Arc::new(session_manager(config)?);
    let client = completion_client(config, sessions, Arc::new(chat_log))?;

    let mut printer = IncrementalPrinter::new(std::io::stdout());
    let outcome = client.predict_streaming(&request, &mut printer).await?;
    tracing::debug!(
        chars = outcome.text.chars().count(),
        terminated_by = ?outcome.terminated_by,
        "completion finished"
    );
    Ok(())
}

async fn login(config: &EnvConfig) -> Result<(), CliError> {
    let sessions = session_manager(config)?;
    let session = sessions.get_session().await;

    let mut stdout = std::io::stdout().lock();
    if session.is_anonymous() {
        writeln!(stdout, "no session cookies; the gateway will be used anonymously")?;
    } else {
        let names: Vec<&str> = session.cookies().keys().map(String::as_str).collect();
        writeln!(stdout, "signed in; cookies: {}", names.join(", "))?;
        writeln!(stdout, "cache: {}", sessions.store().path().display())?;
    }
    Ok(())
}
