//! Command-line interface for geoinv.
//!
//! Two subcommands cover the tool's surface:
//! - `run` - execute a full inventory snapshot against the configured portal
//! - `validate` - load and check the configuration without touching the
//!   network
//!
//! Global flags control verbosity and the configuration file location. The
//! core is a library; this module only translates flags into the library
//! calls and maps run outcomes onto exit status: per-item data-quality
//! diagnostics never fail the process, while catalog and persistence
//! failures do.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod run;
mod validate;

pub use run::RunCommand;
pub use validate::ValidateCommand;

/// Top-level CLI for the geoinv inventory tool.
#[derive(Parser)]
#[command(
    name = "geoinv",
    about = "Geospatial platform inventory - normalize catalog items and their data sources",
    version,
    long_about = "geoinv takes a full snapshot of a geospatial content catalog, recursively \
                  resolves every data source each item references, and bulk-replaces the \
                  result into a reporting table."
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (equivalent to RUST_LOG=debug).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors, for scheduled runs.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default: ~/.geoinv/config.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a full inventory snapshot
    Run(RunCommand),
    /// Validate the configuration file and exit
    Validate(ValidateCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();

        match self.command {
            Commands::Run(cmd) => cmd.execute(self.config).await,
            Commands::Validate(cmd) => cmd.execute(self.config).await,
        }
    }

    /// Install the tracing subscriber according to the verbosity flags.
    ///
    /// An explicit `RUST_LOG` always wins; the flags only choose the default
    /// filter.
    fn init_logging(&self) {
        let default_filter = if self.verbose {
            "geoinv_cli=debug"
        } else if self.quiet {
            "geoinv_cli=error"
        } else {
            "geoinv_cli=info"
        };

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
