use std::process::ExitCode;

use campus_chat::{run, Cli};
use campus_llm::logging::init_tracing;
use campus_llm::EnvConfig;
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli, EnvConfig::from_env()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("campus-chat: {error}");
            ExitCode::FAILURE
        }
    }
}
