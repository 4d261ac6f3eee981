//! The inventory aggregator: full-catalog runs with bounded fan-out.
//!
//! [`run_inventory`] drives a complete snapshot: build the folder index,
//! list every item, resolve items concurrently over a fixed-size pool, then
//! replace the sink table with the collected records. Item resolution is
//! embarrassingly parallel — the only shared state is the read-only folder
//! index and the collected output — so the fan-out is safe by construction.
//!
//! The sink phase is a single-writer critical section that begins only after
//! the pool has drained. Its failure class is kept distinct from extraction
//! failures: "data collected but not persisted" and "collection never
//! completed" carry different operational responses, and the run report
//! makes the distinction explicit.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogClient, CatalogError, CatalogItem, FolderIndex};
use crate::constants::{
    DEFAULT_CONCURRENCY, INVENTORY_COLUMNS, MAX_CATALOG_ITEMS, default_lookup_timeout,
};
use crate::resolver::{InventoryRecord, resolve};
use crate::sink::{Sink, SinkError};

/// Tuning for one inventory run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Destination table identifier
    pub table: String,
    /// Maximum number of items to inventory
    pub max_items: usize,
    /// Number of items resolved concurrently
    pub concurrency: usize,
    /// Timeout for a single secondary catalog lookup
    pub lookup_timeout: Duration,
    /// Optional wall-clock budget for the collection phase. Items not yet
    /// started when it expires become error-form records; the sink phase
    /// still runs.
    pub deadline: Option<Duration>,
}

impl RunOptions {
    /// Defaults for the given destination table.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            max_items: MAX_CATALOG_ITEMS,
            concurrency: DEFAULT_CONCURRENCY,
            lookup_timeout: default_lookup_timeout(),
            deadline: None,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Items fetched from the catalog listing
    pub items_processed: usize,
    /// Records written to the sink
    pub records_written: usize,
    /// Error-form records among them (per-item failures and cancellations)
    pub error_records: usize,
}

/// Run-level failures.
///
/// Per-item problems never appear here; they are carried inside the record
/// set. These variants are the two ways a run as a whole can fail, and the
/// CLI maps them to distinct messaging.
#[derive(Error, Debug)]
pub enum RunError {
    /// The catalog could not be listed or the folder index could not be
    /// built; no data was collected.
    #[error("catalog collection failed: {0}")]
    Catalog(#[from] CatalogError),

    /// Extraction completed but the sink replace failed. The destination
    /// table may be empty or stale.
    #[error("collected {collected} record(s) but persistence failed: {source}")]
    Persistence {
        /// Records collected before the sink failure
        collected: usize,
        /// The sink failure
        #[source]
        source: SinkError,
    },
}

/// Inventory the whole catalog into the sink. Returns the run report.
///
/// Fatal only when the catalog listing itself fails or the sink replace
/// fails; every per-item problem is absorbed into the record set.
pub async fn run_inventory<C, S>(
    client: &C,
    sink: &mut S,
    options: &RunOptions,
) -> Result<RunReport, RunError>
where
    C: CatalogClient,
    S: Sink,
{
    let started = Instant::now();

    info!("building folder index");
    let folders = client.folder_index().await?;
    debug!("folder index holds {} folder(s)", folders.len());

    info!("listing catalog items (cap {})", options.max_items);
    let items = client.list_items(options.max_items).await?;
    let items_processed = items.len();
    info!("resolving {items_processed} item(s) with concurrency {}", options.concurrency);

    let records = collect_records(client, items, &folders, options, started).await;
    let error_records = records.iter().filter(|r| r.is_error()).count();
    if error_records > 0 {
        warn!("{error_records} item(s) produced error-form records");
    }

    let written = replace_snapshot(sink, &options.table, &records).await?;
    info!(
        "run complete: {written} record(s) written to '{}' in {:.1?}",
        options.table,
        started.elapsed()
    );

    Ok(RunReport {
        items_processed,
        records_written: written,
        error_records,
    })
}

/// Resolve all items over a bounded pool, preserving the one-record-minimum
/// invariant through deadline cancellation.
async fn collect_records<C: CatalogClient>(
    client: &C,
    items: Vec<CatalogItem>,
    folders: &FolderIndex,
    options: &RunOptions,
    started: Instant,
) -> Vec<InventoryRecord> {
    let concurrency = options.concurrency.max(1);

    let batches: Vec<Vec<InventoryRecord>> = stream::iter(items)
        .map(|item| async move {
            // The deadline gates items that have not started; an item that
            // got in before expiry runs to completion.
            if let Some(budget) = options.deadline {
                if started.elapsed() >= budget {
                    warn!("run deadline exceeded, cancelling item {}", item.id);
                    return vec![InventoryRecord::error_form(
                        &item,
                        "RUN CANCELLED: deadline exceeded before item processing started",
                    )];
                }
            }
            resolve(client, &item, folders, options.lookup_timeout).await
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    batches.into_iter().flatten().collect()
}

/// Full-refresh replace: clear, then insert the complete snapshot.
///
/// A failure in either step reports the collected count so the caller can
/// distinguish lost work from work never done. A write already in progress
/// is never abandoned part-way by this function; it either returns the sink
/// error or the inserted count.
async fn replace_snapshot<S: Sink>(
    sink: &mut S,
    table: &str,
    records: &[InventoryRecord],
) -> Result<usize, RunError> {
    let rows: Vec<Vec<String>> = records.iter().map(InventoryRecord::as_row).collect();

    let persistence = |source: SinkError| {
        error!("sink replace failed after collecting {} record(s): {source}", records.len());
        RunError::Persistence {
            collected: records.len(),
            source,
        }
    };

    sink.clear(table).await.map_err(persistence)?;
    sink.bulk_insert(table, &INVENTORY_COLUMNS, &rows).await.map_err(persistence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;
    use crate::sink::MemorySink;
    use crate::test_utils::MockCatalog;
    use serde_json::json;

    fn options() -> RunOptions {
        RunOptions::new("Inventory")
    }

    #[tokio::test]
    async fn test_run_writes_one_record_per_service_item() {
        let client = MockCatalog::new("https://portal.example.com")
            .with_item(
                CatalogItem::new("a", "Feature Service", "Roads", "alice")
                    .with_service_url("https://x/Roads/FeatureServer"),
            )
            .with_item(
                CatalogItem::new("b", "Map Service", "Base", "bob")
                    .with_service_url("https://x/Base/MapServer"),
            );
        let mut sink = MemorySink::new();

        let report = run_inventory(&client, &mut sink, &options()).await.unwrap();

        assert_eq!(
            report,
            RunReport {
                items_processed: 2,
                records_written: 2,
                error_records: 0
            }
        );
        assert_eq!(sink.rows("Inventory").len(), 2);
        assert_eq!(sink.clears, 1);
    }

    #[tokio::test]
    async fn test_run_isolates_per_item_failures() {
        // Item 2's payload fetch fails; items 1 and 3 must still resolve and
        // the sink write must proceed with all three groups.
        let client = MockCatalog::new("https://portal.example.com")
            .with_item(
                CatalogItem::new("i1", "Feature Service", "One", "alice")
                    .with_service_url("https://x/1"),
            )
            .with_item(CatalogItem::new("i2", "Web Map", "Two", "alice"))
            .with_item(
                CatalogItem::new("i3", "Feature Service", "Three", "alice")
                    .with_service_url("https://x/3"),
            )
            .with_failing_payloads();
        let mut sink = MemorySink::new();

        let report = run_inventory(&client, &mut sink, &options()).await.unwrap();

        assert_eq!(report.items_processed, 3);
        assert_eq!(report.records_written, 3);
        assert_eq!(report.error_records, 1);

        let rows = sink.rows("Inventory");
        let error_row = rows.iter().find(|r| r[0] == "i2").unwrap();
        assert_eq!(error_row[5], "ERROR");
        assert_eq!(error_row[6], "PROCESSING ERROR");
    }

    #[tokio::test]
    async fn test_run_replaces_prior_snapshot() {
        let client = MockCatalog::new("https://portal.example.com").with_item(
            CatalogItem::new("a", "Feature Service", "Roads", "alice")
                .with_service_url("https://x/Roads"),
        );
        let mut sink = MemorySink::new();
        sink.bulk_insert(
            "Inventory",
            &INVENTORY_COLUMNS,
            &[vec!["stale".to_string(); INVENTORY_COLUMNS.len()]],
        )
        .await
        .unwrap();

        run_inventory(&client, &mut sink, &options()).await.unwrap();

        let rows = sink.rows("Inventory");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "a");
    }

    #[tokio::test]
    async fn test_listing_failure_is_catalog_error() {
        let client = MockCatalog::new("https://portal.example.com").with_failing_listing();
        let mut sink = MemorySink::new();

        let err = run_inventory(&client, &mut sink, &options()).await.unwrap_err();
        assert!(matches!(err, RunError::Catalog(_)));
        assert!(sink.rows("Inventory").is_empty());
    }

    #[tokio::test]
    async fn test_folder_failure_is_catalog_error() {
        let client = MockCatalog::new("https://portal.example.com").with_failing_folders();
        let mut sink = MemorySink::new();

        let err = run_inventory(&client, &mut sink, &options()).await.unwrap_err();
        assert!(matches!(err, RunError::Catalog(_)));
    }

    #[tokio::test]
    async fn test_sink_failure_reports_collected_count() {
        let client = MockCatalog::new("https://portal.example.com")
            .with_item(
                CatalogItem::new("a", "Feature Service", "Roads", "alice")
                    .with_service_url("https://x/Roads"),
            )
            .with_item(CatalogItem::new("b", "Shapefile", "Zip", "alice"));
        let mut sink = MemorySink::new().with_failing_clear();

        let err = run_inventory(&client, &mut sink, &options()).await.unwrap_err();
        match err {
            RunError::Persistence { collected, .. } => assert_eq!(collected, 2),
            other => panic!("expected persistence error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_insert_failure_after_clear_is_persistence_error() {
        let client = MockCatalog::new("https://portal.example.com").with_item(
            CatalogItem::new("a", "Feature Service", "Roads", "alice")
                .with_service_url("https://x/Roads"),
        );
        let mut sink = MemorySink::new().with_failing_insert();

        let err = run_inventory(&client, &mut sink, &options()).await.unwrap_err();
        assert!(matches!(err, RunError::Persistence { collected: 1, .. }));
    }

    #[tokio::test]
    async fn test_expired_deadline_emits_cancellation_records() {
        let client = MockCatalog::new("https://portal.example.com")
            .with_item(
                CatalogItem::new("a", "Feature Service", "Roads", "alice")
                    .with_service_url("https://x/Roads"),
            )
            .with_item(
                CatalogItem::new("b", "Feature Service", "Rail", "alice")
                    .with_service_url("https://x/Rail"),
            );
        let mut sink = MemorySink::new();

        let mut opts = options();
        opts.deadline = Some(Duration::ZERO);

        let report = run_inventory(&client, &mut sink, &opts).await.unwrap();

        // Every item still produces exactly one record.
        assert_eq!(report.records_written, 2);
        assert_eq!(report.error_records, 2);
        assert!(
            sink.rows("Inventory")
                .iter()
                .all(|r| r[7].contains("RUN CANCELLED"))
        );
    }

    #[tokio::test]
    async fn test_dashboard_secondary_lookup_end_to_end() {
        let client = MockCatalog::new("https://portal.example.com")
            .with_item(CatalogItem::new("d1", "Dashboard", "Ops", "alice"))
            .with_payload("d1", json!({"widgets": [{"dataSource": {"itemId": "abc123"}}]}))
            .with_summary(
                "abc123",
                CatalogItem::new("abc123", "Feature Service", "Crashes", "bob")
                    .with_service_url("https://x/Crashes"),
            );
        let mut sink = MemorySink::new();

        run_inventory(&client, &mut sink, &options()).await.unwrap();

        let rows = sink.rows("Inventory");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][6], "Dashboard Source: Crashes");
        assert_eq!(rows[0][7], "https://x/Crashes");
    }

    #[tokio::test]
    async fn test_folder_labels_applied_from_index() {
        let client = MockCatalog::new("https://portal.example.com")
            .with_folder("alice", "f1", "Projects")
            .with_item(
                CatalogItem::new("a", "Feature Service", "Roads", "alice")
                    .with_service_url("https://x/Roads")
                    .with_folder("f1"),
            );
        let mut sink = MemorySink::new();

        run_inventory(&client, &mut sink, &options()).await.unwrap();
        assert_eq!(sink.rows("Inventory")[0][5], "Projects");
    }

    #[tokio::test]
    async fn test_max_items_cap_respected() {
        let mut client = MockCatalog::new("https://portal.example.com");
        for i in 0..5 {
            client = client.with_item(
                CatalogItem::new(format!("i{i}"), "Feature Service", "S", "alice")
                    .with_service_url("https://x/s"),
            );
        }
        let mut sink = MemorySink::new();

        let mut opts = options();
        opts.max_items = 3;

        let report = run_inventory(&client, &mut sink, &opts).await.unwrap();
        assert_eq!(report.items_processed, 3);
    }
}
