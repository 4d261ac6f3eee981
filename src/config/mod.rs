//! Run configuration for geoinv.
//!
//! Configuration lives in a TOML file, by default at `~/.geoinv/config.toml`
//! (platform-specific, see [`Config::default_path`]), overridable with the
//! CLI `--config` flag. It identifies the portal being inventoried, how to
//! authenticate against it (a pre-acquired token — session bootstrap is out
//! of scope), and where the normalized records land.
//!
//! # Example
//!
//! ```toml
//! portal_url = "https://org.maps.example.com"
//! token_file = "/secure/creds/portal-token.txt"
//! table = "InventoryDataSources"
//! output_dir = "/data/inventory"
//!
//! # Optional tuning
//! max_items = 10000
//! concurrency = 8
//! lookup_timeout_secs = 30
//! # run_timeout_secs = 3600
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CONCURRENCY, MAX_CATALOG_ITEMS};
use crate::core::GeoinvError;
use crate::inventory::RunOptions;

fn default_table() -> String {
    "InventoryDataSources".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("inventory-output")
}

fn default_max_items() -> usize {
    MAX_CATALOG_ITEMS
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_lookup_timeout_secs() -> u64 {
    30
}

/// The geoinv configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Portal base URL (the root, not the `/sharing/rest` path)
    pub portal_url: String,

    /// Pre-acquired access token, inline. Prefer `token_file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Path to a file holding the access token on its first line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,

    /// Destination table identifier in the sink
    #[serde(default = "default_table")]
    pub table: String,

    /// Directory the JSONL sink writes into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Cap on the number of items inventoried per run
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Number of items resolved concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Timeout for a single secondary catalog lookup, in seconds
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,

    /// Optional wall-clock budget for the collection phase, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_timeout_secs: Option<u64>,
}

impl Config {
    /// Default configuration file location.
    ///
    /// Unix/macOS: `~/.geoinv/config.toml`; Windows:
    /// `%LOCALAPPDATA%\geoinv\config.toml`.
    pub fn default_path() -> Result<PathBuf, GeoinvError> {
        let base = if cfg!(windows) {
            dirs::data_local_dir()
        } else {
            dirs::home_dir().map(|home| home.join(".geoinv"))
        };
        let base = base.ok_or_else(|| GeoinvError::Other {
            message: "could not determine the user configuration directory".to_string(),
        })?;
        Ok(if cfg!(windows) {
            base.join("geoinv").join("config.toml")
        } else {
            base.join("config.toml")
        })
    }

    /// Load from an explicit path, or the default location.
    ///
    /// An explicit path that does not exist is an error; that is what the
    /// user asked for. A missing file at the default location is also an
    /// error, because a run cannot proceed without a portal URL.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self, GeoinvError> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if !path.exists() {
            return Err(GeoinvError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        Self::load_from(&path).await
    }

    /// Load and parse a configuration file.
    pub async fn load_from(path: &Path) -> Result<Self, GeoinvError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GeoinvError::ConfigInvalid {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let config: Self =
            toml::from_str(&content).map_err(|e| GeoinvError::ConfigInvalid {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Check the loaded values for internal consistency.
    pub fn validate(&self, path: &Path) -> Result<(), GeoinvError> {
        let invalid = |reason: String| GeoinvError::ConfigInvalid {
            path: path.display().to_string(),
            reason,
        };

        if !self.portal_url.starts_with("http://") && !self.portal_url.starts_with("https://") {
            return Err(invalid(format!(
                "portal_url must be an http(s) URL, got '{}'",
                self.portal_url
            )));
        }
        if self.table.is_empty() {
            return Err(invalid("table must not be empty".to_string()));
        }
        if self.concurrency == 0 {
            return Err(invalid("concurrency must be at least 1".to_string()));
        }
        if self.max_items == 0 {
            return Err(invalid("max_items must be at least 1".to_string()));
        }
        if self.token.is_some() && self.token_file.is_some() {
            return Err(invalid(
                "token and token_file are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the access token, reading `token_file` when configured.
    pub async fn resolve_token(&self) -> Result<Option<String>, GeoinvError> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }
        let Some(file) = &self.token_file else {
            return Ok(None);
        };
        let content = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| GeoinvError::ConfigInvalid {
                path: file.display().to_string(),
                reason: format!("could not read token file: {e}"),
            })?;
        let token = content.lines().next().unwrap_or("").trim().to_string();
        if token.is_empty() {
            return Err(GeoinvError::ConfigInvalid {
                path: file.display().to_string(),
                reason: "token file is empty".to_string(),
            });
        }
        Ok(Some(token))
    }

    /// Translate into the aggregator's run options.
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        let mut options = RunOptions::new(&self.table);
        options.max_items = self.max_items;
        options.concurrency = self.concurrency;
        options.lookup_timeout = Duration::from_secs(self.lookup_timeout_secs);
        options.deadline = self.run_timeout_secs.map(Duration::from_secs);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_minimal_config_gets_defaults() {
        let file = write_config("portal_url = \"https://portal.example.com\"\n");
        let config = Config::load_from(file.path()).await.unwrap();

        assert_eq!(config.table, "InventoryDataSources");
        assert_eq!(config.max_items, MAX_CATALOG_ITEMS);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert!(config.run_timeout_secs.is_none());
    }

    #[tokio::test]
    async fn test_invalid_portal_url_rejected() {
        let file = write_config("portal_url = \"portal.example.com\"\n");
        let err = Config::load_from(file.path()).await.unwrap_err();
        assert!(matches!(err, GeoinvError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn test_unknown_key_rejected() {
        let file = write_config(
            "portal_url = \"https://p\"\nportal_pasword = \"oops\"\n",
        );
        assert!(Config::load_from(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_concurrency_rejected() {
        let file =
            write_config("portal_url = \"https://p\"\nconcurrency = 0\n");
        assert!(Config::load_from(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_token_and_token_file_mutually_exclusive() {
        let file = write_config(
            "portal_url = \"https://p\"\ntoken = \"t\"\ntoken_file = \"/tmp/t\"\n",
        );
        assert!(Config::load_from(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_explicit_missing_path_is_error() {
        let err = Config::load_with_optional(Some(PathBuf::from("/nonexistent/geoinv.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, GeoinvError::ConfigNotFound { .. }));
    }

    #[tokio::test]
    async fn test_token_file_first_line_wins() {
        let token_file = write_config("secret-token\nsecond line ignored\n");
        let config_body = format!(
            "portal_url = \"https://p\"\ntoken_file = \"{}\"\n",
            token_file.path().display()
        );
        let file = write_config(&config_body);

        let config = Config::load_from(file.path()).await.unwrap();
        assert_eq!(config.resolve_token().await.unwrap().as_deref(), Some("secret-token"));
    }

    #[tokio::test]
    async fn test_run_options_translation() {
        let file = write_config(
            "portal_url = \"https://p\"\ntable = \"T\"\nconcurrency = 4\nrun_timeout_secs = 60\n",
        );
        let config = Config::load_from(file.path()).await.unwrap();
        let options = config.run_options();

        assert_eq!(options.table, "T");
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.deadline, Some(Duration::from_secs(60)));
    }
}
