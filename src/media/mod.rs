//! # Media boundary
//!
//! Asset persistence lives outside this crate. The adapter reads collections,
//! tags and assets through [`MediaRepository`] and renders them as protocol
//! records.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;

use crate::model::{Asset, AssetCollection, MediaKind, Tag};
use crate::{Error, Result};

pub use memory::MemoryMediaRepository;

/// Segment value meaning "do not filter".
pub const ANY: &str = "*";

/// Read access to the asset store.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn asset_collections(&self) -> Result<Vec<AssetCollection>>;

    async fn tags(&self) -> Result<Vec<Tag>>;

    /// Assets of `query.kind`, narrowed by collection and tag when given.
    async fn find_assets(&self, query: &AssetQuery) -> Result<Vec<Asset>>;

    /// Public URI of the asset's binary.
    fn public_uri(&self, asset: &Asset) -> Result<String>;
}

/// Asset filter. Collection and tag are matched by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetQuery {
    pub kind: MediaKind,
    pub collection: Option<String>,
    pub tag: Option<String>,
}

impl AssetQuery {
    pub fn new(kind: MediaKind) -> Self {
        Self { kind, collection: None, tag: None }
    }

    /// Build a query from decoded path segments: `*` or an empty segment
    /// disables the collection and tag filters; the kind is mandatory.
    pub fn from_segments(collection: &str, tag: &str, kind: &str) -> Result<Self> {
        let kind = MediaKind::parse(kind).ok_or_else(|| Error::UnsupportedMediaType(kind.to_string()))?;
        Ok(Self {
            kind,
            collection: filter_segment(collection),
            tag: filter_segment(tag),
        })
    }

    pub fn in_collection(mut self, collection_id: impl Into<String>) -> Self {
        self.collection = Some(collection_id.into());
        self
    }

    pub fn tagged(mut self, tag_id: impl Into<String>) -> Self {
        self.tag = Some(tag_id.into());
        self
    }

    pub fn matches(&self, asset: &Asset) -> bool {
        asset.kind == self.kind
            && self.collection.as_ref().is_none_or(|c| asset.collections.contains(c))
            && self.tag.as_ref().is_none_or(|t| asset.tags.contains(t))
    }
}

fn filter_segment(segment: &str) -> Option<String> {
    match segment {
        "" | ANY => None,
        other => Some(other.to_string()),
    }
}

/// `{id, uri, title, caption, copyrightNotice, mediaType}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: String,
    pub uri: String,
    pub title: String,
    pub caption: String,
    pub copyright_notice: String,
    pub media_type: String,
}

impl AssetRecord {
    pub fn new(asset: &Asset, uri: String) -> Self {
        Self {
            id: asset.id.clone(),
            uri,
            title: asset.title.clone(),
            caption: asset.caption.clone(),
            copyright_notice: asset.copyright_notice.clone(),
            media_type: asset.media_type.clone(),
        }
    }
}

/// The media type literals agents may filter by.
pub fn media_types() -> Vec<&'static str> {
    MediaKind::ALL.iter().map(MediaKind::as_str).collect()
}

/// Run `query` and render every hit with its public URI.
pub async fn find_asset_records(media: &dyn MediaRepository, query: &AssetQuery) -> Result<Vec<AssetRecord>> {
    media
        .find_assets(query)
        .await?
        .iter()
        .map(|asset| Ok(AssetRecord::new(asset, media.public_uri(asset)?)))
        .collect()
}
