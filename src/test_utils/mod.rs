//! Test utilities shared by unit and integration tests.
//!
//! Available to integration tests through the `test-utils` feature, the same
//! way unit tests use it via `#[cfg(test)]`. Nothing here ships in a default
//! build.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use crate::catalog::{CatalogClient, CatalogError, CatalogItem, FolderIndex};

/// Initialize tracing output for a test, honoring `RUST_LOG` when set.
///
/// Safe to call from multiple tests; only the first call installs the
/// subscriber.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory [`CatalogClient`] with scriptable contents and failure modes.
///
/// Built with the consuming `with_*` methods; queried read-only during a
/// test. Payload fetches are recorded so tests can assert that service
/// items skip the fetch entirely.
pub struct MockCatalog {
    base_url: String,
    items: Vec<CatalogItem>,
    payloads: HashMap<String, Value>,
    summaries: HashMap<String, CatalogItem>,
    folders: FolderIndex,
    fail_listing: bool,
    fail_folders: bool,
    fail_payloads: bool,
    fail_summaries: bool,
    fetched_payloads: Mutex<HashSet<String>>,
}

impl MockCatalog {
    /// Empty catalog at the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            items: Vec::new(),
            payloads: HashMap::new(),
            summaries: HashMap::new(),
            folders: FolderIndex::new(),
            fail_listing: false,
            fail_folders: false,
            fail_payloads: false,
            fail_summaries: false,
            fetched_payloads: Mutex::new(HashSet::new()),
        }
    }

    /// Add an item to the listing.
    #[must_use]
    pub fn with_item(mut self, item: CatalogItem) -> Self {
        self.items.push(item);
        self
    }

    /// Script the payload returned for an item id.
    #[must_use]
    pub fn with_payload(mut self, id: impl Into<String>, payload: Value) -> Self {
        self.payloads.insert(id.into(), payload);
        self
    }

    /// Script the summary returned for an item id.
    #[must_use]
    pub fn with_summary(mut self, id: impl Into<String>, item: CatalogItem) -> Self {
        self.summaries.insert(id.into(), item);
        self
    }

    /// Register a folder in the index served by [`CatalogClient::folder_index`].
    #[must_use]
    pub fn with_folder(
        mut self,
        owner: impl Into<String>,
        folder_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.folders.insert(owner, folder_id, title);
        self
    }

    /// Make `list_items` fail.
    #[must_use]
    pub fn with_failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Make `folder_index` fail.
    #[must_use]
    pub fn with_failing_folders(mut self) -> Self {
        self.fail_folders = true;
        self
    }

    /// Make every payload fetch fail.
    #[must_use]
    pub fn with_failing_payloads(mut self) -> Self {
        self.fail_payloads = true;
        self
    }

    /// Make every summary fetch fail.
    #[must_use]
    pub fn with_failing_summaries(mut self) -> Self {
        self.fail_summaries = true;
        self
    }

    /// Whether a payload fetch was attempted for the given item id.
    #[must_use]
    pub fn payload_fetched(&self, id: &str) -> bool {
        self.fetched_payloads.lock().unwrap().contains(id)
    }

    fn transport(operation: &str) -> CatalogError {
        CatalogError::Transport {
            operation: operation.to_string(),
            reason: "scripted failure".to_string(),
        }
    }
}

impl CatalogClient for MockCatalog {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list_items(&self, max: usize) -> Result<Vec<CatalogItem>, CatalogError> {
        if self.fail_listing {
            return Err(Self::transport("search"));
        }
        Ok(self.items.iter().take(max).cloned().collect())
    }

    async fn folder_index(&self) -> Result<FolderIndex, CatalogError> {
        if self.fail_folders {
            return Err(Self::transport("folder listing"));
        }
        Ok(self.folders.clone())
    }

    async fn item_payload(&self, id: &str) -> Result<Option<Value>, CatalogError> {
        self.fetched_payloads.lock().unwrap().insert(id.to_string());
        if self.fail_payloads {
            return Err(Self::transport("item payload"));
        }
        Ok(self.payloads.get(id).cloned())
    }

    async fn item_summary(&self, id: &str) -> Result<Option<CatalogItem>, CatalogError> {
        if self.fail_summaries {
            return Err(Self::transport("item summary"));
        }
        Ok(self.summaries.get(id).cloned())
    }
}
