//! Error handling for geoinv
//!
//! The error system is built around two types:
//! - [`GeoinvError`] - strongly-typed failure cases for precise handling in code
//! - [`ErrorContext`] - wrapper adding user-facing details and suggestions for
//!   CLI display
//!
//! The taxonomy matters for exit-status semantics: malformed catalog data is
//! recovered locally and never surfaces here, per-item failures become
//! diagnostic records, and only catalog-wide or persistence failures escape
//! to `main` as a [`GeoinvError`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use geoinv_cli::core::{GeoinvError, user_friendly_error};
//!
//! fn connect() -> Result<(), GeoinvError> {
//!     Err(GeoinvError::CatalogUnreachable {
//!         url: "https://portal.example.com".to_string(),
//!         reason: "connection refused".to_string(),
//!     })
//! }
//!
//! if let Err(e) = connect() {
//!     let ctx = user_friendly_error(anyhow::Error::from(e));
//!     ctx.display(); // Colored error with a suggestion
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::constants::ERROR_MESSAGE_CAP;

/// The main error type for geoinv operations.
///
/// Each variant represents a specific failure mode with enough context to
/// tell the user what to do about it. Per-item extraction problems never
/// appear here; they are absorbed into error-form inventory records at the
/// resolver boundary.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum GeoinvError {
    /// The catalog endpoint could not be reached at all.
    #[error("Catalog unreachable: {url}")]
    CatalogUnreachable {
        /// The catalog base URL that failed
        url: String,
        /// Transport-level reason
        reason: String,
    },

    /// A catalog API call returned an error response.
    #[error("Catalog request failed: {operation}")]
    CatalogRequestFailed {
        /// The catalog operation that failed (e.g. "search", "folder listing")
        operation: String,
        /// Response status or error body
        reason: String,
    },

    /// A catalog response could not be decoded.
    #[error("Catalog returned an unexpected response for {operation}")]
    CatalogResponseInvalid {
        /// The catalog operation whose response failed to decode
        operation: String,
        /// Decode failure detail
        reason: String,
    },

    /// Sink truncate failed before any rows were written.
    #[error("Failed to clear sink table '{table}'")]
    SinkClearFailed {
        /// Destination table identifier
        table: String,
        /// Underlying failure
        reason: String,
    },

    /// Sink bulk insert failed after the table was cleared.
    #[error("Failed to insert rows into sink table '{table}'")]
    SinkInsertFailed {
        /// Destination table identifier
        table: String,
        /// Underlying failure
        reason: String,
    },

    /// Configuration file missing at an explicitly requested path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was requested
        path: String,
    },

    /// Configuration file exists but could not be parsed or is invalid.
    #[error("Invalid configuration in {path}")]
    ConfigInvalid {
        /// Path to the offending file
        path: String,
        /// Specific reason for the failure
        reason: String,
    },

    /// I/O error wrapper from [`std::io::Error`].
    #[error("IO error: {message}")]
    IoError {
        /// Description of the I/O failure
        message: String,
    },

    /// Generic error for cases not covered by specific variants.
    #[error("{message}")]
    Other {
        /// The error description
        message: String,
    },
}

impl From<std::io::Error> for GeoinvError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for GeoinvError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigInvalid {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Error context with user-friendly messaging for CLI display.
///
/// Wraps a [`GeoinvError`] with an optional suggestion (green) and details
/// (yellow) rendered to stderr by [`ErrorContext::display`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying geoinv error
    pub error: GeoinvError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: GeoinvError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion, shown in green.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add explanatory details, shown in yellow.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details, and suggestion to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`] with suggestions.
///
/// Recognizes [`GeoinvError`] variants and common I/O errors; anything else
/// falls back to a generic context carrying the error chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(err) = error.downcast_ref::<GeoinvError>() {
        return create_error_context(err.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(GeoinvError::IoError {
                message: io_error.to_string(),
            })
            .with_suggestion("Check file ownership or run with sufficient permissions");
        }
    }

    ErrorContext::new(GeoinvError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: GeoinvError) -> ErrorContext {
    match &error {
        GeoinvError::CatalogUnreachable { url, .. } => {
            let details = format!("No connection could be established to {url}");
            ErrorContext::new(error)
                .with_suggestion("Verify the portal URL and network connectivity")
                .with_details(details)
        }
        GeoinvError::CatalogRequestFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the configured token is valid and not expired")
            .with_details("The catalog rejected a request the inventory depends on"),
        GeoinvError::SinkClearFailed { .. } | GeoinvError::SinkInsertFailed { .. } => {
            ErrorContext::new(error)
                .with_suggestion("The collected data was not persisted; re-run once the sink is available")
                .with_details(
                    "Extraction completed but the destination table could not be updated; it may be empty or stale",
                )
        }
        GeoinvError::ConfigNotFound { path } => {
            let suggestion = format!("Create a configuration file at {path} or pass --config");
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        GeoinvError::ConfigInvalid { .. } => ErrorContext::new(error)
            .with_suggestion("Fix the TOML syntax or remove the invalid key")
            .with_details("Run 'geoinv validate' to check the configuration"),
        _ => ErrorContext::new(error),
    }
}

/// Truncate an error message to the sink column width.
///
/// Truncation is done on a character boundary so multi-byte input never
/// produces an invalid slice.
#[must_use]
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= ERROR_MESSAGE_CAP {
        message.to_string()
    } else {
        message.chars().take(ERROR_MESSAGE_CAP).collect()
    }
}
