//! # Sites
//!
//! Site records live outside the content graph; their root nodes live at
//! `/sites/<node name>` inside it. Listing sites therefore needs a
//! dimensioned context to locate each root.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::model::{DimensionSpacePoint, NodeAggregateId, Site};
use crate::storage::ContentBackend;
use crate::tx::TxMode;
use crate::{ContentGraph, Result};

#[async_trait]
pub trait SiteRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Site>>;
}

/// `{name, nodeAggregateId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    pub name: String,
    pub node_aggregate_id: NodeAggregateId,
}

/// Sites whose root node is visible under `point`, in repository order.
///
/// A site without a root node in this dimension variant is skipped.
pub async fn list_sites<B: ContentBackend>(
    graph: &ContentGraph<B>,
    sites: &dyn SiteRepository,
    point: &DimensionSpacePoint,
) -> Result<Vec<SiteRecord>> {
    let all = sites.find_all().await?;
    let ctx = graph.open_context(point, TxMode::ReadOnly).await?;

    let mut found = Vec::with_capacity(all.len());
    let mut lookup = Ok(());
    for site in all {
        match ctx.backend().get_node_by_path(ctx.tx(), &site.root_path()).await {
            Ok(Some(root)) => found.push(SiteRecord { name: site.name, node_aggregate_id: root.aggregate_id }),
            Ok(None) => debug!(site = %site.name, point = %point, "site has no root node in this variant"),
            Err(e) => {
                lookup = Err(e);
                break;
            }
        }
    }
    ctx.finish(lookup).await?;
    Ok(found)
}

/// Sites held in memory.
#[derive(Default)]
pub struct MemorySiteRepository {
    sites: RwLock<Vec<Site>>,
}

impl MemorySiteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, site: Site) {
        self.sites.write().push(site);
    }
}

#[async_trait]
impl SiteRepository for MemorySiteRepository {
    async fn find_all(&self) -> Result<Vec<Site>> {
        Ok(self.sites.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::model::{property_map, DimensionDeclaration, Preset, PresetCatalog};
    use crate::schema::NodeTypeManager;
    use crate::storage::NodeSeed;

    #[tokio::test]
    async fn test_list_sites_skips_missing_roots() {
        let types = Arc::new(NodeTypeManager::from_json_str(r#"{"T:Site": {}}"#).unwrap());
        let presets = Arc::new(PresetCatalog::default().with_dimension(
            "language",
            DimensionDeclaration::new(vec![Preset::new("en", ["en"]), Preset::new("de", ["de"])]),
        ));
        let graph = ContentGraph::open_memory(types, presets);
        let backend = graph.backend();
        let sites_node = backend.sites_node_aggregate_id("user-admin").unwrap();
        let en = DimensionSpacePoint::new().with("language", "en");
        backend
            .insert_node(
                "user-admin",
                &sites_node,
                NodeSeed::new("site-1", "example", "T:Site").variant(en.clone(), property_map([("title", "Example")])),
            )
            .unwrap();

        let repo = MemorySiteRepository::new();
        repo.add(Site::new("Example", "example"));
        repo.add(Site::new("Orphan", "orphan"));

        let listed = list_sites(&graph, &repo, &en).await.unwrap();
        assert_eq!(
            listed,
            vec![SiteRecord { name: "Example".into(), node_aggregate_id: "site-1".into() }]
        );

        let de = DimensionSpacePoint::new().with("language", "de");
        assert!(list_sites(&graph, &repo, &de).await.unwrap().is_empty());
        assert_eq!(graph.security().active_bypass_count(), 0);
    }
}
