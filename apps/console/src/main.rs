//! kkvat operator console.

#![forbid(unsafe_code)]

mod cli;
mod commands;
mod console_config;

use clap::Parser;
use kkvat_core::AppError;

use crate::cli::Cli;
use crate::commands::Console;
use crate::console_config::{ConsoleConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = ConsoleConfig::load()?.with_api_base_url(cli.api_base_url);
    let console = Console::connect(config).await?;

    if let Err(error) = console.run(cli.command).await {
        tracing::error!(error = %error, "command failed");
        eprintln!("error: {}", error.message());
        std::process::exit(1);
    }

    Ok(())
}
