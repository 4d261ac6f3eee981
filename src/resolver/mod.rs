//! Per-item resolution: from a catalog item to normalized inventory records.
//!
//! [`resolve`] orchestrates one item end to end: fetch the payload when the
//! item's kind needs one, run the extractor, complete any widget lookups via
//! secondary catalog fetches, and shape the result into [`InventoryRecord`]s.
//!
//! This is the failure-isolation boundary. `resolve` never fails: a
//! malformed item, a dead payload endpoint, or any other per-item fault
//! becomes exactly one error-form record, and inventory of the remaining
//! items continues untouched. Secondary-lookup failures are softer still —
//! the reference is kept with an unknown-item label and a deep-link
//! locator, never dropped.

use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::{CatalogClient, CatalogItem, FolderIndex, deep_link};
use crate::constants::{ERROR_FOLDER, NOT_APPLICABLE, PROCESSING_ERROR, UNKNOWN_ITEM};
use crate::core::truncate_message;
use crate::extractor::{
    DataSourceReference, SourcePlan, extract_sources, normalize_payload,
};

/// One flat row of the inventory output table.
///
/// Item identity fields plus exactly one discovered source, sentinels
/// already applied. Every catalog item produces at least one record, so
/// item existence and item-to-source fan-out are both recoverable from the
/// output without a join against a separate items table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRecord {
    /// Catalog item id
    pub item_id: String,
    /// Raw platform type tag
    pub item_type: String,
    /// Item display title
    pub item_name: String,
    /// Item detail page URL (empty when the catalog reported none)
    pub item_url: String,
    /// Owning account
    pub account: String,
    /// Folder display label, `root`, or the `ERROR` sentinel
    pub account_folder: String,
    /// Source display label or a sentinel
    pub source_label: String,
    /// Source URL or a sentinel
    pub source_locator: String,
}

impl InventoryRecord {
    fn identity(item: &CatalogItem, folder_label: &str) -> Self {
        Self {
            item_id: item.id.clone(),
            item_type: item.type_tag.clone(),
            item_name: item.title.clone(),
            item_url: item.homepage_url.clone().unwrap_or_default(),
            account: item.owner.clone(),
            account_folder: folder_label.to_string(),
            source_label: String::new(),
            source_locator: String::new(),
        }
    }

    /// Record for one discovered data source.
    #[must_use]
    pub fn from_reference(
        item: &CatalogItem,
        folder_label: &str,
        reference: &DataSourceReference,
    ) -> Self {
        let mut record = Self::identity(item, folder_label);
        record.source_label = reference.label.clone();
        record.source_locator = reference.locator.as_sink_str().to_string();
        record
    }

    /// Record for an item with zero discoverable sources.
    #[must_use]
    pub fn not_applicable(item: &CatalogItem, folder_label: &str) -> Self {
        let mut record = Self::identity(item, folder_label);
        record.source_label = NOT_APPLICABLE.to_string();
        record.source_locator = NOT_APPLICABLE.to_string();
        record
    }

    /// Error-form record for an item whose processing failed outright.
    ///
    /// The folder column carries the `ERROR` sentinel and the source columns
    /// carry the error class and the truncated message, so failed items stay
    /// visible in the output instead of vanishing.
    #[must_use]
    pub fn error_form(item: &CatalogItem, message: &str) -> Self {
        let mut record = Self::identity(item, ERROR_FOLDER);
        record.source_label = PROCESSING_ERROR.to_string();
        record.source_locator = truncate_message(message);
        record
    }

    /// Whether this is an error-form record.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.account_folder == ERROR_FOLDER && self.source_label == PROCESSING_ERROR
    }

    /// The record as an ordered row matching
    /// [`crate::constants::INVENTORY_COLUMNS`].
    #[must_use]
    pub fn as_row(&self) -> Vec<String> {
        vec![
            self.item_id.clone(),
            self.item_type.clone(),
            self.item_name.clone(),
            self.item_url.clone(),
            self.account.clone(),
            self.account_folder.clone(),
            self.source_label.clone(),
            self.source_locator.clone(),
        ]
    }
}

/// Resolve one catalog item into its inventory records. Never fails.
///
/// Any error escaping the fallible inner path is converted into a single
/// error-form record at this boundary, keeping one bad item from aborting
/// the rest of the run.
pub async fn resolve<C: CatalogClient>(
    client: &C,
    item: &CatalogItem,
    folders: &FolderIndex,
    lookup_timeout: Duration,
) -> Vec<InventoryRecord> {
    match resolve_inner(client, item, folders, lookup_timeout).await {
        Ok(records) => records,
        Err(e) => {
            let message =
                format!("Could not process item {} ({}): {e:#}", item.id, item.title);
            warn!("{message}");
            vec![InventoryRecord::error_form(item, &message)]
        }
    }
}

async fn resolve_inner<C: CatalogClient>(
    client: &C,
    item: &CatalogItem,
    folders: &FolderIndex,
    lookup_timeout: Duration,
) -> anyhow::Result<Vec<InventoryRecord>> {
    let folder_label = folders.label(&item.owner, item.folder_id.as_deref());

    // Service kinds resolve from identity alone; skipping the payload fetch
    // here saves a round-trip for the majority of a typical catalog.
    let payload = if item.kind.needs_payload() {
        let raw = client
            .item_payload(&item.id)
            .await
            .context("fetching item payload")?;
        normalize_payload(raw)
    } else {
        None
    };

    let plans = extract_sources(item, payload.as_ref(), client.base_url());
    debug!("item {} produced {} source plan(s)", item.id, plans.len());

    let mut references = Vec::with_capacity(plans.len());
    for plan in plans {
        match plan {
            SourcePlan::Ready(reference) => references.push(reference),
            SourcePlan::WidgetLookup { item_id } => {
                references.push(resolve_widget_source(client, &item_id, lookup_timeout).await);
            }
        }
    }

    if references.is_empty() {
        return Ok(vec![InventoryRecord::not_applicable(item, folder_label)]);
    }

    Ok(references
        .iter()
        .map(|reference| InventoryRecord::from_reference(item, folder_label, reference))
        .collect())
}

/// Complete a widget lookup via a secondary catalog fetch.
///
/// A failed, absent, or timed-out lookup still produces a reference: the
/// unknown-item label with the deep-link fallback locator.
async fn resolve_widget_source<C: CatalogClient>(
    client: &C,
    item_id: &str,
    lookup_timeout: Duration,
) -> DataSourceReference {
    let summary = match tokio::time::timeout(lookup_timeout, client.item_summary(item_id)).await {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) => {
            warn!("widget source lookup failed for item {item_id}: {e}");
            None
        }
        Err(_) => {
            warn!("widget source lookup timed out for item {item_id}");
            None
        }
    };

    match summary {
        Some(referenced) => {
            let locator = referenced
                .service_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| deep_link(client.base_url(), item_id));
            DataSourceReference::url(
                format!("Dashboard Source: {}", referenced.title),
                locator,
            )
        }
        None => DataSourceReference::url(
            format!("Dashboard Source: {UNKNOWN_ITEM}"),
            deep_link(client.base_url(), item_id),
        ),
    }
}
