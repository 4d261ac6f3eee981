//! Data-source extraction from loosely-typed item payloads.
//!
//! An item's payload is an ad-hoc JSON document whose shape varies by item
//! type and platform version; no stable schema can be assumed. This module
//! walks that document defensively and produces an ordered list of
//! [`SourcePlan`]s: either a fully-formed [`DataSourceReference`], or a
//! marker that the resolver must complete with a secondary catalog lookup.
//!
//! Everything here is pure: malformed shapes degrade to "no sources found"
//! with a debug diagnostic, never an error, and no I/O happens in this
//! module. Secondary lookups are delegated to [`crate::resolver`], which
//! keeps the extraction policy independently testable.
//!
//! # Dispatch policy (first match wins)
//!
//! - Direct service kinds with a non-empty URL emit one reference with the
//!   item's own name and URL; the payload is never inspected.
//! - Map containers walk `operationalLayers` (plus `baseMap.baseMapLayers`
//!   for web maps only — web scenes do not carry that field).
//! - Application containers emit a deep link for a referenced map, a lookup
//!   plan per widget data source, and a reference per `dataSources` entry.
//! - Every other kind yields nothing; the record-level "N/A" sentinel is
//!   applied downstream.

use serde_json::Value;
use tracing::debug;

use crate::catalog::{CatalogItem, deep_link};
use crate::constants::{
    EMBEDDED_FEATURE_COLLECTION, MAX_LAYER_DEPTH, NO_URL_FOUND, UNTITLED_FEATURE_COLLECTION,
    UNTITLED_LAYER,
};

/// Where a discovered data source lives.
///
/// The historical sink format used sentinel strings in place of this
/// tri-state; they are reproduced only at the sink boundary via
/// [`SourceLocator::as_sink_str`], keeping the core precise and testable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// An external URL (service endpoint or catalog deep link)
    Url(String),
    /// Inline data embedded in the payload; no external URL exists
    Embedded,
    /// A URL was expected but absent
    Missing,
}

impl SourceLocator {
    /// Render the locator in the sink's historical sentinel format.
    #[must_use]
    pub fn as_sink_str(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Embedded => EMBEDDED_FEATURE_COLLECTION,
            Self::Missing => NO_URL_FOUND,
        }
    }
}

/// One discovered data source: a display label and a locator.
///
/// Never null on either side; the label defaults to an untitled sentinel
/// when the payload carries no name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceReference {
    /// Human-readable name of the source
    pub label: String,
    /// Where the source lives
    pub locator: SourceLocator,
}

impl DataSourceReference {
    /// Reference with a concrete URL.
    #[must_use]
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            locator: SourceLocator::Url(url.into()),
        }
    }

    /// Reference to inline embedded data.
    #[must_use]
    pub fn embedded(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            locator: SourceLocator::Embedded,
        }
    }
}

/// Extractor output unit.
///
/// Widget data sources carry only an item id; resolving one to a title and
/// URL requires a catalog fetch, which the extractor cannot perform. Those
/// come back as [`SourcePlan::WidgetLookup`] for the resolver to complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePlan {
    /// A reference that needs no further work
    Ready(DataSourceReference),
    /// A dashboard widget source to be resolved by item id
    WidgetLookup {
        /// Catalog id of the referenced item
        item_id: String,
    },
}

/// Re-parse payloads that arrive as a JSON string.
///
/// Some platform versions store the payload as a serialized string rather
/// than a document. An unparsable string is data-quality noise, not a
/// processing fault: it normalizes to `None` (zero sources).
#[must_use]
pub fn normalize_payload(payload: Option<Value>) -> Option<Value> {
    match payload {
        Some(Value::String(text)) => match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("payload string is not valid JSON, treating as absent: {e}");
                None
            }
        },
        other => other,
    }
}

/// Discover every data source an item references.
///
/// `payload` must already be normalized via [`normalize_payload`]. The
/// output order is deterministic for a given payload: layer order for maps,
/// then map reference / widgets / data sources (key-sorted) for
/// applications.
#[must_use]
pub fn extract_sources(
    item: &CatalogItem,
    payload: Option<&Value>,
    catalog_base: &str,
) -> Vec<SourcePlan> {
    if item.kind.is_direct_service() {
        return match &item.service_url {
            Some(url) if !url.is_empty() => {
                vec![SourcePlan::Ready(DataSourceReference::url(&item.title, url))]
            }
            _ => Vec::new(),
        };
    }

    let Some(data) = payload.filter(|v| v.is_object()) else {
        return Vec::new();
    };

    if item.kind.is_map_container() {
        return extract_map_sources(item, data);
    }

    if item.kind.is_application_container() {
        return extract_application_sources(item, data, catalog_base);
    }

    Vec::new()
}

fn extract_map_sources(item: &CatalogItem, data: &Value) -> Vec<SourcePlan> {
    let mut sources = walk_layers(data.get("operationalLayers"), 0, &item.id);

    // Web scenes carry no baseMap.baseMapLayers; only web maps get this walk.
    if item.kind == crate::catalog::ItemKind::WebMap {
        match data.get("baseMap") {
            Some(base_map) if base_map.is_object() => {
                sources.extend(walk_layers(base_map.get("baseMapLayers"), 0, &item.id));
            }
            Some(_) => {
                debug!("item {} has a non-object 'baseMap', skipping", item.id);
            }
            None => {}
        }
    }

    sources.into_iter().map(SourcePlan::Ready).collect()
}

fn extract_application_sources(
    item: &CatalogItem,
    data: &Value,
    catalog_base: &str,
) -> Vec<SourcePlan> {
    let mut plans = Vec::new();

    // A referenced web map becomes a deep link; the referenced item itself
    // is not fetched.
    if let Some(map_id) = data
        .get("map")
        .filter(|m| m.is_object())
        .and_then(|m| m.get("itemId"))
        .and_then(Value::as_str)
    {
        plans.push(SourcePlan::Ready(DataSourceReference::url(
            "Referenced Web Map",
            deep_link(catalog_base, map_id),
        )));
    }

    if let Some(widgets) = data.get("widgets").and_then(Value::as_array) {
        for widget in widgets {
            let Some(widget) = widget.as_object() else {
                debug!("item {} has a non-object widget entry, skipping", item.id);
                continue;
            };
            if let Some(item_id) = widget
                .get("dataSource")
                .filter(|ds| ds.is_object())
                .and_then(|ds| ds.get("itemId"))
                .and_then(Value::as_str)
            {
                plans.push(SourcePlan::WidgetLookup {
                    item_id: item_id.to_string(),
                });
            }
        }
    }

    // URL-bearing entries resolve eagerly; id-only entries become deep links
    // without a fetch. The asymmetry mirrors observed payload shapes.
    if let Some(data_sources) = data.get("dataSources").and_then(Value::as_object) {
        for (source_key, content) in data_sources {
            let Some(content) = content.as_object() else {
                debug!(
                    "item {} has a non-object dataSource entry '{source_key}', skipping",
                    item.id
                );
                continue;
            };
            if let Some(url) = content.get("url").and_then(Value::as_str) {
                let name = content
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or(source_key);
                plans.push(SourcePlan::Ready(DataSourceReference::url(
                    format!("Experience Source: {name}"),
                    url,
                )));
            } else if let Some(item_id) = content.get("itemId").and_then(Value::as_str) {
                plans.push(SourcePlan::Ready(DataSourceReference::url(
                    "Experience Source Item",
                    deep_link(catalog_base, item_id),
                )));
            }
        }
    }

    plans
}

/// Recursively walk a layer list, collecting data-source references.
///
/// Group layers are structural and never emit a reference themselves; their
/// nested `layers` list is recursed into. An embedded `featureCollection`
/// wins over any `url` also present. Non-list input and non-object entries
/// degrade to nothing, with a diagnostic for the latter. Recursion is capped
/// at [`MAX_LAYER_DEPTH`]; pathological nesting returns whatever was
/// collected above the cap.
#[must_use]
pub fn walk_layers(layers: Option<&Value>, depth: usize, item_id: &str) -> Vec<DataSourceReference> {
    let mut sources = Vec::new();

    let Some(layers) = layers.and_then(Value::as_array) else {
        return sources;
    };

    if depth >= MAX_LAYER_DEPTH {
        debug!("item {item_id} exceeds layer nesting cap at depth {depth}, truncating walk");
        return sources;
    }

    for layer in layers {
        let Some(entry) = layer.as_object() else {
            debug!("item {item_id} has a malformed layer entry, skipping");
            continue;
        };

        let is_group = entry
            .get("layerType")
            .and_then(Value::as_str)
            .is_some_and(|t| t == "GroupLayer");

        if is_group && entry.contains_key("layers") {
            sources.extend(walk_layers(entry.get("layers"), depth + 1, item_id));
        } else if entry.contains_key("featureCollection") {
            let label = entry
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(UNTITLED_FEATURE_COLLECTION);
            sources.push(DataSourceReference::embedded(label));
        } else if let Some(url) = entry.get("url").and_then(Value::as_str).filter(|u| !u.is_empty())
        {
            let label = entry
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(UNTITLED_LAYER);
            sources.push(DataSourceReference::url(label, url));
        }
        // No group, no feature collection, no url: contributes nothing.
    }

    sources
}
