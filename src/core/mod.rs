//! Core types and error handling for geoinv.
//!
//! This module hosts the crate-wide error types and the user-facing error
//! presentation used by the CLI. Domain types live next to the components
//! that own them: catalog entities in [`crate::catalog`], extraction types in
//! [`crate::extractor`], and output records in [`crate::resolver`].

pub mod error;

pub use error::{ErrorContext, GeoinvError, truncate_message, user_friendly_error};
