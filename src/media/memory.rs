//! In-memory asset store.

use async_trait::async_trait;
use parking_lot::RwLock;
use url::Url;

use crate::model::{Asset, AssetCollection, Tag};
use crate::{Error, Result};
use super::{AssetQuery, MediaRepository};

/// Assets, collections and tags held in memory; public URIs are
/// `<base>/<asset id>/<file name>`.
pub struct MemoryMediaRepository {
    base_uri: Url,
    collections: RwLock<Vec<AssetCollection>>,
    tags: RwLock<Vec<Tag>>,
    assets: RwLock<Vec<Asset>>,
}

impl MemoryMediaRepository {
    pub fn new(base_uri: &str) -> Result<Self> {
        let mut base_uri = Url::parse(base_uri)
            .map_err(|e| Error::MalformedParameter(format!("media base URI \"{base_uri}\": {e}")))?;
        if !base_uri.path().ends_with('/') {
            let path = format!("{}/", base_uri.path());
            base_uri.set_path(&path);
        }
        Ok(Self {
            base_uri,
            collections: RwLock::new(Vec::new()),
            tags: RwLock::new(Vec::new()),
            assets: RwLock::new(Vec::new()),
        })
    }

    pub fn add_collection(&self, id: impl Into<String>, title: impl Into<String>) {
        self.collections.write().push(AssetCollection { id: id.into(), title: title.into() });
    }

    pub fn add_tag(&self, id: impl Into<String>, label: impl Into<String>) {
        self.tags.write().push(Tag { id: id.into(), label: label.into() });
    }

    pub fn add_asset(&self, asset: Asset) {
        self.assets.write().push(asset);
    }
}

#[async_trait]
impl MediaRepository for MemoryMediaRepository {
    async fn asset_collections(&self) -> Result<Vec<AssetCollection>> {
        Ok(self.collections.read().clone())
    }

    async fn tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tags.read().clone())
    }

    async fn find_assets(&self, query: &AssetQuery) -> Result<Vec<Asset>> {
        Ok(self.assets.read().iter().filter(|a| query.matches(a)).cloned().collect())
    }

    fn public_uri(&self, asset: &Asset) -> Result<String> {
        let relative = format!(
            "{}/{}",
            urlencoding::encode(&asset.id),
            urlencoding::encode(&asset.filename)
        );
        self.base_uri
            .join(&relative)
            .map(String::from)
            .map_err(|e| Error::StorageError(format!("public URI of asset {}: {e}", asset.id)))
    }
}
