//! Global constants used throughout the geoinv codebase.
//!
//! Sentinel strings, traversal caps, and retry tuning live here so that the
//! sink output format and the defensive bounds are discoverable in one place.
//! The sentinel spellings are part of the output contract: downstream reports
//! match on them verbatim, so they must never change casually.

use std::time::Duration;

/// Upper bound on the number of items requested from a catalog listing.
///
/// Realistic catalogs hold low thousands of items; this cap keeps a
/// misbehaving search endpoint from streaming forever.
pub const MAX_CATALOG_ITEMS: usize = 10_000;

/// Maximum recursion depth for the layer walk.
///
/// Real web maps nest group layers a handful of levels deep. Anything past
/// this bound is treated as pathological input: the walk returns whatever it
/// has collected so far instead of recursing further.
pub const MAX_LAYER_DEPTH: usize = 64;

/// Maximum length of an error message carried in an error-form record.
///
/// The sink column is 255 characters wide; longer messages are truncated on
/// a character boundary.
pub const ERROR_MESSAGE_CAP: usize = 255;

/// Default number of items resolved concurrently.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default timeout for a single secondary catalog lookup.
pub fn default_lookup_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Starting delay for exponential backoff on catalog HTTP retries (10ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Maximum backoff delay for catalog HTTP retries (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Maximum retry attempts for a single catalog HTTP request.
pub const MAX_HTTP_RETRIES: usize = 4;

/// Label used when a layer carries no title of its own.
pub const UNTITLED_LAYER: &str = "||UNTITLED LAYER||";

/// Label used when an embedded feature collection carries no title.
pub const UNTITLED_FEATURE_COLLECTION: &str = "||UNTITLED FEATURE COLLECTION||";

/// Label used when a secondary lookup cannot identify the referenced item.
pub const UNKNOWN_ITEM: &str = "||UNKNOWN ITEM||";

/// Locator sentinel for inline data with no external URL.
pub const EMBEDDED_FEATURE_COLLECTION: &str = "||EMBEDDED FEATURE COLLECTION||";

/// Locator sentinel for a source that should have carried a URL but did not.
pub const NO_URL_FOUND: &str = "||NO URL FOUND||";

/// Sentinel written to both source columns when an item has no sources.
pub const NOT_APPLICABLE: &str = "N/A";

/// Folder column sentinel for the error-form record.
pub const ERROR_FOLDER: &str = "ERROR";

/// Source label for the error-form record.
pub const PROCESSING_ERROR: &str = "PROCESSING ERROR";

/// Folder label used when an item lives outside any named folder.
pub const ROOT_FOLDER: &str = "root";

/// Column names of the inventory output table, in insertion order.
pub const INVENTORY_COLUMNS: [&str; 8] = [
    "ItemID",
    "ItemType",
    "ItemName",
    "ItemURL",
    "Account",
    "AccountFolder",
    "SourceLabel",
    "SourceLocator",
];
