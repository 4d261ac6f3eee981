//! geoinv CLI entry point.
//!
//! Parses command-line arguments, executes the requested command, and maps
//! failures onto user-friendly error output with a non-zero exit status.

use anyhow::Result;
use clap::Parser;
use geoinv_cli::cli;
use geoinv_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
