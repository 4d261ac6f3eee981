//! geoinv - Geospatial Platform Inventory
//!
//! geoinv takes a full snapshot of a geospatial content catalog, resolves
//! every data source each item references - including indirect references
//! that require secondary catalog lookups - and bulk-replaces the normalized
//! result into a reporting table.
//!
//! # Architecture Overview
//!
//! Data flows one way through four components:
//!
//! 1. [`catalog`] - the catalog client: list items, fetch payloads, fetch
//!    item summaries, enumerate account folders. The [`catalog::PortalClient`]
//!    speaks the portal sharing REST API; tests substitute their own
//!    [`catalog::CatalogClient`] implementations.
//! 2. [`extractor`] - the pure source extractor: item kind + payload in, an
//!    ordered list of source plans out. Contains the recursive layer walk
//!    over the loosely-typed payload tree. No I/O.
//! 3. [`resolver`] - the per-item orchestrator and failure-isolation
//!    boundary: fetches payloads, completes widget lookups, and never fails -
//!    a broken item becomes one diagnostic record instead of aborting the
//!    run.
//! 4. [`inventory`] - the aggregator: bounded concurrent fan-out across
//!    items, then a single-writer full-refresh replace into the [`sink`].
//!
//! No component holds state across runs; each run is a complete catalog
//! snapshot that supersedes the previous one.
//!
//! # Key Invariants
//!
//! - Every catalog item produces at least one [`resolver::InventoryRecord`];
//!   items with zero sources get the "N/A" sentinel pair, failed items get a
//!   single error-form record.
//! - Malformed payload shapes degrade to "no sources found" with a debug
//!   diagnostic, never an error.
//! - A failed secondary lookup still yields its reference, with an
//!   unknown-item label and a deep-link locator.
//! - Extraction failure and persistence failure are distinct run outcomes;
//!   only the latter (and a failed catalog listing) fail the process.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use geoinv_cli::catalog::PortalClient;
//! use geoinv_cli::inventory::{RunOptions, run_inventory};
//! use geoinv_cli::sink::JsonlSink;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PortalClient::new("https://org.maps.example.com", None);
//! let mut sink = JsonlSink::new("/data/inventory");
//! let report = run_inventory(&client, &mut sink, &RunOptions::new("InventoryDataSources")).await?;
//! println!("{} records written", report.records_written);
//! # Ok(())
//! # }
//! ```

// Core functionality modules
pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod extractor;
pub mod inventory;
pub mod resolver;
pub mod sink;

// Supporting modules
pub mod constants;

// test_utils is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
