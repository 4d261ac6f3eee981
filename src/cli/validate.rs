//! The `validate` subcommand: configuration checks without network access.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Config;

/// Load and check the configuration file, then print a summary.
#[derive(Args)]
pub struct ValidateCommand {}

impl ValidateCommand {
    /// Validate the configuration at the given (or default) path.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let config = Config::load_with_optional(config_path).await?;

        // Surfaces unreadable or empty token files before a scheduled run
        // does.
        let token = config.resolve_token().await?;

        println!("{} configuration is valid", "ok:".green().bold());
        println!("  portal:      {}", config.portal_url);
        println!("  table:       {}", config.table);
        println!("  output dir:  {}", config.output_dir.display());
        println!("  max items:   {}", config.max_items);
        println!("  concurrency: {}", config.concurrency);
        println!(
            "  auth:        {}",
            if token.is_some() { "token configured" } else { "anonymous" }
        );
        Ok(())
    }
}
