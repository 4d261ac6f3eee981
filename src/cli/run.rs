//! The `run` subcommand: one full inventory snapshot.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::catalog::{CatalogError, PortalClient};
use crate::config::Config;
use crate::core::GeoinvError;
use crate::inventory::{RunError, run_inventory};
use crate::sink::{JsonlSink, SinkError};

/// Execute a full inventory run against the configured portal.
#[derive(Args)]
pub struct RunCommand {
    /// Override the configured item cap.
    #[arg(long)]
    max_items: Option<usize>,

    /// Override the configured worker-pool size.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Override the configured destination table.
    #[arg(long)]
    table: Option<String>,

    /// Override the configured sink output directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

impl RunCommand {
    /// Load configuration, apply flag overrides, and run the snapshot.
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        let mut config = Config::load_with_optional(config_path).await?;
        if let Some(max_items) = self.max_items {
            config.max_items = max_items;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(table) = self.table {
            config.table = table;
        }
        if let Some(output_dir) = self.output_dir {
            config.output_dir = output_dir;
        }
        config.validate(std::path::Path::new("<cli overrides>"))?;

        let token = config.resolve_token().await?;
        let client = PortalClient::new(&config.portal_url, token);
        let mut sink = JsonlSink::new(&config.output_dir);

        info!("inventorying {}", config.portal_url);
        let report = run_inventory(&client, &mut sink, &config.run_options())
            .await
            .map_err(|e| classify_run_error(e, &config.portal_url))?;

        println!(
            "Inventoried {} item(s) into '{}': {} record(s), {} with processing errors",
            report.items_processed, config.table, report.records_written, report.error_records
        );
        Ok(())
    }
}

/// Map a run-level failure onto the user-facing error type.
///
/// Catalog failures mean nothing was written; persistence failures mean
/// records were collected but the destination table may be empty or stale.
/// The two read differently to an operator, so they stay distinguishable.
fn classify_run_error(error: RunError, portal_url: &str) -> anyhow::Error {
    let friendly = match error {
        RunError::Catalog(c) => match c {
            CatalogError::Transport { operation, reason } => GeoinvError::CatalogUnreachable {
                url: portal_url.to_string(),
                reason: format!("{operation}: {reason}"),
            },
            CatalogError::Request {
                operation,
                status,
                reason,
            } => GeoinvError::CatalogRequestFailed {
                operation,
                reason: format!("status {status}: {reason}"),
            },
            CatalogError::InvalidResponse { operation, reason } => {
                GeoinvError::CatalogResponseInvalid { operation, reason }
            }
        },
        RunError::Persistence { collected, source } => match source {
            SinkError::Clear { table, reason } => GeoinvError::SinkClearFailed {
                table,
                reason: format!("{reason} ({collected} record(s) were collected but not written)"),
            },
            SinkError::Insert { table, reason } => GeoinvError::SinkInsertFailed {
                table,
                reason: format!("{reason} ({collected} record(s) were collected but not written)"),
            },
        },
    };
    anyhow::Error::new(friendly)
}
