//! End-to-end inventory scenarios against a scripted catalog.

use geoinv_cli::catalog::CatalogItem;
use geoinv_cli::constants::{INVENTORY_COLUMNS, NOT_APPLICABLE, UNKNOWN_ITEM};
use geoinv_cli::inventory::{RunOptions, run_inventory};
use geoinv_cli::sink::{JsonlSink, MemorySink};
use geoinv_cli::test_utils::{MockCatalog, init_test_logging};
use serde_json::json;

const PORTAL: &str = "https://portal.example.com";
const TABLE: &str = "InventoryDataSources";

fn options() -> RunOptions {
    RunOptions::new(TABLE)
}

/// Scenario A: a feature service resolves to one record carrying its own
/// title and URL.
#[tokio::test]
async fn feature_service_roundtrip() {
    init_test_logging();
    let client = MockCatalog::new(PORTAL).with_item(
        CatalogItem::new("svc1", "Feature Service", "Crash Sites", "gis_admin")
            .with_service_url("https://x/y/FeatureServer")
            .with_homepage("https://portal.example.com/home/item.html?id=svc1"),
    );
    let mut sink = MemorySink::new();

    let report = run_inventory(&client, &mut sink, &options()).await.unwrap();

    assert_eq!(report.records_written, 1);
    let row = &sink.rows(TABLE)[0];
    assert_eq!(row[0], "svc1");
    assert_eq!(row[1], "Feature Service");
    assert_eq!(row[6], "Crash Sites");
    assert_eq!(row[7], "https://x/y/FeatureServer");
}

/// Scenario B: a web map with a group layer yields the nested layer only.
#[tokio::test]
async fn web_map_group_layer_yields_nested_layer() {
    init_test_logging();
    let client = MockCatalog::new(PORTAL)
        .with_item(CatalogItem::new("map1", "Web Map", "Road Atlas", "cartographer"))
        .with_payload(
            "map1",
            json!({
                "operationalLayers": [
                    {"layerType": "GroupLayer", "layers": [
                        {"title": "Roads", "url": "https://x/Roads"}
                    ]}
                ]
            }),
        );
    let mut sink = MemorySink::new();

    run_inventory(&client, &mut sink, &options()).await.unwrap();

    let rows = sink.rows(TABLE);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][6], "Roads");
    assert_eq!(rows[0][7], "https://x/Roads");
}

/// Scenario C: a group layer with no nested `layers` key contributes
/// nothing, so the item falls back to the single "N/A" record.
#[tokio::test]
async fn group_layer_without_children_falls_back_to_not_applicable() {
    init_test_logging();
    let client = MockCatalog::new(PORTAL)
        .with_item(CatalogItem::new("map1", "Web Map", "Empty Atlas", "cartographer"))
        .with_payload(
            "map1",
            json!({
                "operationalLayers": [
                    {"layerType": "GroupLayer", "title": "Hollow group"}
                ]
            }),
        );
    let mut sink = MemorySink::new();

    run_inventory(&client, &mut sink, &options()).await.unwrap();

    let rows = sink.rows(TABLE);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][6], NOT_APPLICABLE);
    assert_eq!(rows[0][7], NOT_APPLICABLE);
}

/// Scenario D: a dashboard widget whose item lookup comes back absent keeps
/// its reference with the unknown-item label and a deep-link locator.
#[tokio::test]
async fn dashboard_widget_lookup_failure_falls_back_to_deep_link() {
    init_test_logging();
    let client = MockCatalog::new(PORTAL)
        .with_item(CatalogItem::new("dash1", "Dashboard", "Ops Board", "ops"))
        .with_payload("dash1", json!({"widgets": [{"dataSource": {"itemId": "abc123"}}]}));
    let mut sink = MemorySink::new();

    run_inventory(&client, &mut sink, &options()).await.unwrap();

    let rows = sink.rows(TABLE);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][6], format!("Dashboard Source: {UNKNOWN_ITEM}"));
    assert_eq!(rows[0][7], "https://portal.example.com/home/item.html?id=abc123");
}

/// Run-level isolation: one failing item out of three still yields three
/// record groups, and the sink write proceeds with all of them.
#[tokio::test]
async fn failing_item_does_not_abort_run() {
    init_test_logging();
    let client = MockCatalog::new(PORTAL)
        .with_item(
            CatalogItem::new("ok1", "Feature Service", "One", "a").with_service_url("https://x/1"),
        )
        .with_item(CatalogItem::new("bad", "Web Map", "Two", "a"))
        .with_item(
            CatalogItem::new("ok2", "Feature Service", "Three", "a").with_service_url("https://x/3"),
        )
        .with_failing_payloads();
    let mut sink = MemorySink::new();

    let report = run_inventory(&client, &mut sink, &options()).await.unwrap();

    assert_eq!(report.items_processed, 3);
    assert_eq!(report.records_written, 3);
    assert_eq!(report.error_records, 1);

    let rows = sink.rows(TABLE);
    let error_row = rows.iter().find(|r| r[0] == "bad").unwrap();
    assert_eq!(error_row[5], "ERROR");
    assert_eq!(error_row[6], "PROCESSING ERROR");
    assert!(!error_row[7].is_empty());
}

/// A mixed catalog lands the full normalized snapshot in the JSONL sink.
#[tokio::test]
async fn mixed_catalog_writes_jsonl_snapshot() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let client = MockCatalog::new(PORTAL)
        .with_folder("exp_author", "f1", "Experiences")
        .with_item(
            CatalogItem::new("svc", "Vector Tile Service", "Basemap", "gis_admin")
                .with_service_url("https://x/VectorTileServer"),
        )
        .with_item(
            CatalogItem::new("exp", "Web Experience", "Portal Tour", "exp_author")
                .with_folder("f1"),
        )
        .with_payload(
            "exp",
            json!({
                "dataSources": {
                    "ds_1": {"label": "Parcels", "url": "https://x/Parcels"},
                    "ds_2": {"itemId": "ref99"}
                }
            }),
        )
        .with_item(CatalogItem::new("doc", "Code Sample", "Snippet", "dev"));
    let mut sink = JsonlSink::new(dir.path());

    let report = run_inventory(&client, &mut sink, &options()).await.unwrap();

    // One record per experience source, one N/A record for the unknown kind.
    assert_eq!(report.items_processed, 3);
    assert_eq!(report.records_written, 4);

    let contents = std::fs::read_to_string(dir.path().join(format!("{TABLE}.jsonl"))).unwrap();
    let rows: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(rows.len(), 4);

    for row in &rows {
        for column in INVENTORY_COLUMNS {
            assert!(row.get(column).is_some(), "missing column {column}");
        }
    }

    let exp_rows: Vec<&serde_json::Value> =
        rows.iter().filter(|r| r["ItemID"] == "exp").collect();
    assert_eq!(exp_rows.len(), 2);
    assert!(exp_rows.iter().all(|r| r["AccountFolder"] == "Experiences"));

    let na_row = rows.iter().find(|r| r["ItemID"] == "doc").unwrap();
    assert_eq!(na_row["SourceLabel"], NOT_APPLICABLE);
    assert_eq!(na_row["SourceLocator"], NOT_APPLICABLE);
}

/// Re-running against a changed catalog leaves only the new snapshot.
#[tokio::test]
async fn rerun_supersedes_previous_snapshot() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut sink = JsonlSink::new(dir.path());

    let first = MockCatalog::new(PORTAL).with_item(
        CatalogItem::new("old", "Feature Service", "Old", "a").with_service_url("https://x/old"),
    );
    run_inventory(&first, &mut sink, &options()).await.unwrap();

    let second = MockCatalog::new(PORTAL).with_item(
        CatalogItem::new("new", "Feature Service", "New", "a").with_service_url("https://x/new"),
    );
    run_inventory(&second, &mut sink, &options()).await.unwrap();

    let contents = std::fs::read_to_string(dir.path().join(format!("{TABLE}.jsonl"))).unwrap();
    assert!(contents.contains("\"new\""));
    assert!(!contents.contains("\"old\""));
    assert_eq!(contents.lines().count(), 1);
}

/// High fan-out with a small pool: every item still lands exactly once.
#[tokio::test]
async fn bounded_pool_processes_every_item() {
    init_test_logging();
    let mut client = MockCatalog::new(PORTAL);
    for i in 0..50 {
        client = client.with_item(
            CatalogItem::new(format!("svc{i}"), "Map Service", format!("Service {i}"), "a")
                .with_service_url(format!("https://x/{i}/MapServer")),
        );
    }
    let mut sink = MemorySink::new();

    let mut opts = options();
    opts.concurrency = 3;

    let report = run_inventory(&client, &mut sink, &opts).await.unwrap();

    assert_eq!(report.records_written, 50);
    let mut ids: Vec<String> = sink.rows(TABLE).iter().map(|r| r[0].clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 50);
}
