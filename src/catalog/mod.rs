//! Catalog entities and the catalog client contract.
//!
//! The catalog is the system of record being inventoried: an online content
//! catalog holding maps, services, and applications. This module defines the
//! identity snapshot taken for each item ([`CatalogItem`]), the closed set of
//! item kinds the extractor dispatches on ([`ItemKind`]), the folder display
//! index ([`FolderIndex`]), and the [`CatalogClient`] trait consumed by the
//! resolver and aggregator.
//!
//! The concrete HTTP implementation lives in [`portal`]; tests substitute
//! their own [`CatalogClient`] implementations, which is why the trait is
//! deliberately small.

use std::collections::HashMap;

use thiserror::Error;

use crate::constants::ROOT_FOLDER;

pub mod portal;

pub use portal::PortalClient;

/// Errors produced by catalog client operations.
///
/// Transient transport failures are distinguished from permanent request
/// failures so the HTTP client can retry the former and fail fast on the
/// latter.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    /// The request never received a usable response (DNS, connect, timeout).
    #[error("catalog transport error during {operation}: {reason}")]
    Transport {
        /// The catalog operation being performed
        operation: String,
        /// Transport-level failure detail
        reason: String,
    },

    /// The catalog answered with an error status.
    #[error("catalog request failed during {operation} (status {status}): {reason}")]
    Request {
        /// The catalog operation being performed
        operation: String,
        /// HTTP status code of the response
        status: u16,
        /// Response detail
        reason: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("catalog response invalid for {operation}: {reason}")]
    InvalidResponse {
        /// The catalog operation being performed
        operation: String,
        /// Decode failure detail
        reason: String,
    },
}

impl CatalogError {
    /// Whether a retry has any chance of succeeding.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Request { status, .. } => *status >= 500,
            Self::InvalidResponse { .. } => false,
        }
    }
}

/// The kind of a catalog item, parsed from the platform's type tag.
///
/// The platform's item-type vocabulary is open-ended and has grown across
/// versions; everything not explicitly known maps to [`ItemKind::Other`],
/// which the extractor treats as having zero discoverable sources. Dispatch
/// over this enum is exhaustive so a new known kind cannot be added without
/// deciding its extraction policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// Hosted or referenced feature service
    FeatureService,
    /// Cached or dynamic map service
    MapService,
    /// Image service
    ImageService,
    /// Vector tile service
    VectorTileService,
    /// 3D scene service
    SceneService,
    /// KML document or service
    Kml,
    /// OGC Web Map Service
    Wms,
    /// OGC Web Map Tile Service
    Wmts,
    /// Web map container
    WebMap,
    /// Web scene container
    WebScene,
    /// Configurable mapping application
    WebMappingApplication,
    /// Operations dashboard
    Dashboard,
    /// Story map
    StoryMap,
    /// Web experience
    WebExperience,
    /// Hub site application
    HubSiteApplication,
    /// Any item type not handled above; carries the raw tag
    Other(String),
}

impl ItemKind {
    /// Parse a raw platform type tag into an [`ItemKind`].
    #[must_use]
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "Feature Service" => Self::FeatureService,
            "Map Service" => Self::MapService,
            "Image Service" => Self::ImageService,
            "Vector Tile Service" => Self::VectorTileService,
            "Scene Service" => Self::SceneService,
            "KML" => Self::Kml,
            "WMS" => Self::Wms,
            "WMTS" => Self::Wmts,
            "Web Map" => Self::WebMap,
            "Web Scene" => Self::WebScene,
            "Web Mapping Application" => Self::WebMappingApplication,
            "Dashboard" => Self::Dashboard,
            "StoryMap" => Self::StoryMap,
            "Web Experience" => Self::WebExperience,
            "Hub Site Application" => Self::HubSiteApplication,
            other => Self::Other(other.to_string()),
        }
    }

    /// Direct service kinds: the item's own URL is the data source.
    #[must_use]
    pub const fn is_direct_service(&self) -> bool {
        matches!(
            self,
            Self::FeatureService
                | Self::MapService
                | Self::ImageService
                | Self::VectorTileService
                | Self::SceneService
                | Self::Kml
                | Self::Wms
                | Self::Wmts
        )
    }

    /// Map container kinds: sources come from the operational layer tree.
    #[must_use]
    pub const fn is_map_container(&self) -> bool {
        matches!(self, Self::WebMap | Self::WebScene)
    }

    /// Application container kinds: sources come from map references,
    /// widgets, and data-source mappings.
    #[must_use]
    pub const fn is_application_container(&self) -> bool {
        matches!(
            self,
            Self::WebMappingApplication
                | Self::Dashboard
                | Self::StoryMap
                | Self::WebExperience
                | Self::HubSiteApplication
        )
    }

    /// Whether resolution requires fetching the item's JSON payload.
    ///
    /// Service kinds and unknown kinds never need one, which skips a network
    /// round-trip for the majority of a typical catalog.
    #[must_use]
    pub const fn needs_payload(&self) -> bool {
        self.is_map_container() || self.is_application_container()
    }
}

/// Identity snapshot of one catalog item, fetched once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    /// Opaque item identifier, unique within the catalog
    pub id: String,
    /// Raw platform type tag, preserved verbatim for the output record
    pub type_tag: String,
    /// Parsed kind used for extraction dispatch
    pub kind: ItemKind,
    /// Display title
    pub title: String,
    /// Item detail page URL, if known
    pub homepage_url: Option<String>,
    /// Service REST endpoint, for items that expose one
    pub service_url: Option<String>,
    /// Owning account name
    pub owner: String,
    /// Folder the item lives in; `None` means the owner's root location
    pub folder_id: Option<String>,
}

impl CatalogItem {
    /// Build an item from raw catalog fields, parsing the kind from the tag.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        type_tag: impl Into<String>,
        title: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        let type_tag = type_tag.into();
        let kind = ItemKind::from_type_tag(&type_tag);
        Self {
            id: id.into(),
            type_tag,
            kind,
            title: title.into(),
            homepage_url: None,
            service_url: None,
            owner: owner.into(),
            folder_id: None,
        }
    }

    /// Set the service REST endpoint.
    #[must_use]
    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    /// Set the item detail page URL.
    #[must_use]
    pub fn with_homepage(mut self, url: impl Into<String>) -> Self {
        self.homepage_url = Some(url.into());
        self
    }

    /// Set the owning folder id.
    #[must_use]
    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }
}

/// Mapping from (owner account, folder id) to folder display name.
///
/// Built once at the start of a run by enumerating every account's folders.
/// Used only for display enrichment; a missing entry resolves to the `root`
/// label rather than failing.
#[derive(Debug, Clone, Default)]
pub struct FolderIndex {
    folders: HashMap<(String, String), String>,
}

impl FolderIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a folder title for an (owner, folder id) pair.
    pub fn insert(
        &mut self,
        owner: impl Into<String>,
        folder_id: impl Into<String>,
        title: impl Into<String>,
    ) {
        self.folders
            .insert((owner.into(), folder_id.into()), title.into());
    }

    /// Resolve the display label for an item's location.
    ///
    /// Items without a folder id, and folder ids the index has never seen,
    /// both resolve to the `root` sentinel.
    #[must_use]
    pub fn label(&self, owner: &str, folder_id: Option<&str>) -> &str {
        folder_id
            .and_then(|id| self.folders.get(&(owner.to_string(), id.to_string())))
            .map_or(ROOT_FOLDER, String::as_str)
    }

    /// Number of folders in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Whether the index holds no folders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

/// Construct the catalog deep link for an item's detail page.
///
/// Used as a fallback locator whenever a referenced item has no service URL
/// of its own.
#[must_use]
pub fn deep_link(catalog_base: &str, item_id: &str) -> String {
    format!(
        "{}/home/item.html?id={item_id}",
        catalog_base.trim_end_matches('/')
    )
}

/// Read access to a content catalog.
///
/// All four operations may fail with a connectivity or auth error; callers
/// treat such a failure as fatal for that single call site only. The two
/// item-scoped lookups return `Ok(None)` when the item simply does not exist
/// or carries no payload, which is not an error.
pub trait CatalogClient {
    /// Base URL of the catalog, used to build deep links.
    fn base_url(&self) -> &str;

    /// List up to `max` items in the catalog.
    fn list_items(
        &self,
        max: usize,
    ) -> impl Future<Output = Result<Vec<CatalogItem>, CatalogError>>;

    /// Enumerate every account's folders into a [`FolderIndex`].
    fn folder_index(&self) -> impl Future<Output = Result<FolderIndex, CatalogError>>;

    /// Fetch an item's raw JSON payload, if it has one.
    fn item_payload(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, CatalogError>>;

    /// Fetch an item's identity snapshot, if the item exists.
    fn item_summary(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<CatalogItem>, CatalogError>>;
}
