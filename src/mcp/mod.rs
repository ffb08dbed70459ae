//! # Resource/Tool registry
//!
//! Maps protocol resource URIs and tool names onto [`ContentGraph`]
//! operations and the media and site boundaries, and encodes the results
//! in the protocol's envelopes. Transport and framing stay outside: the
//! registry consumes and produces `serde_json::Value` messages
//! (see [`rpc`]).
//!
//! | Kind | Identifier |
//! |------|------------|
//! | Template | `contentsubgraph://find-children/{dimensionSpacePoint}/{parentNodeAggregateId}/{nodeTypeName}/{limitToPropertyNames}` |
//! | Template | `contentsubgraph://find-descendants/{dimensionSpacePoint}/{ancestorNodeAggregateId}/{nodeTypeName}/{limitToPropertyNames}` |
//! | Resource | `dimensionspace://show` |
//! | Resource | `nodetypes://schema` |
//! | Resource | `media://find-assetcollections`, `media://find-tags`, `media://find-types` |
//! | Template | `media://find-assets/{assetCollection}/{tag}/{type}` |
//! | Template | `sites://list/{dimensionSpacePoint}` |
//! | Tool | `CreateNodeAggregateWithNode` |
//! | Tool | `SetNodeProperties` |

pub mod uri;
pub mod resources;
pub mod tools;
pub mod rpc;

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::config::AdapterConfig;
use crate::media::{self, MediaRepository};
use crate::schema;
use crate::sites::{self, SiteRepository};
use crate::storage::ContentBackend;
use crate::{ContentGraph, Error, Result};

pub use resources::{ResourceContents, ResourceDescriptor, ResourceRequest, ResourceTemplateDescriptor};
pub use tools::{ToolDescriptor, ToolResult};

/// Server instructions handed to agents on `initialize`.
pub const INSTRUCTIONS: &str = "Welcome to the content repository. The content repository is a property graph \
    structure consisting of nodes and relations. Nodes are arranged in a hierarchical tree structure. Nodes can \
    also have reference relations to other nodes. Nodes are of a specific node type which declares the schema of \
    that node. This includes what properties nodes of this type have, what other nodes can be referenced and what \
    type child nodes of nodes of this type may have. Content varies across dimensions such as language or market: \
    every read and write names a dimension space point, see dimensionspace://show.";

/// The agent-facing adapter.
pub struct ContentRepositoryMcp<B: ContentBackend> {
    graph: ContentGraph<B>,
    media: Arc<dyn MediaRepository>,
    sites: Arc<dyn SiteRepository>,
    config: AdapterConfig,
}

impl<B: ContentBackend> ContentRepositoryMcp<B> {
    pub fn new(
        graph: ContentGraph<B>,
        media: Arc<dyn MediaRepository>,
        sites: Arc<dyn SiteRepository>,
        config: AdapterConfig,
    ) -> Self {
        Self { graph, media, sites, config }
    }

    pub fn graph(&self) -> &ContentGraph<B> {
        &self.graph
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn instructions(&self) -> &'static str {
        INSTRUCTIONS
    }

    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        resources::resources()
    }

    pub fn list_resource_templates(&self) -> Vec<ResourceTemplateDescriptor> {
        resources::resource_templates()
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        tools::tools()
    }

    /// Read one resource. The envelope echoes the concrete `uri`.
    pub async fn read_resource(&self, uri: &str) -> Result<ResourceContents> {
        let request = ResourceRequest::parse(uri)?;
        debug!(uri, "reading resource");
        match &request {
            ResourceRequest::FindChildren { point, parent, node_type_name, properties } => {
                let nodes = self.graph.find_children(point, parent, node_type_name, properties).await?;
                ResourceContents::json(uri, &request, &nodes)
            }
            ResourceRequest::FindDescendants { point, ancestor, node_type_name, properties } => {
                let nodes = self.graph.find_descendants(point, ancestor, node_type_name, properties).await?;
                ResourceContents::json(uri, &request, &nodes)
            }
            ResourceRequest::DimensionSpace => {
                ResourceContents::json(uri, &request, &self.graph.dimension_space())
            }
            ResourceRequest::NodeTypeSchema => {
                let schema = schema::introspect(self.graph.node_types(), &self.config.exposed_node_type)?;
                ResourceContents::json(uri, &request, &schema)
            }
            ResourceRequest::AssetCollections => {
                ResourceContents::json(uri, &request, &self.media.asset_collections().await?)
            }
            ResourceRequest::Tags => ResourceContents::json(uri, &request, &self.media.tags().await?),
            ResourceRequest::MediaTypes => ResourceContents::json(uri, &request, &media::media_types()),
            ResourceRequest::FindAssets(query) => {
                let assets = media::find_asset_records(self.media.as_ref(), query).await?;
                ResourceContents::json(uri, &request, &assets)
            }
            ResourceRequest::ListSites(point) => {
                let listed = sites::list_sites(&self.graph, self.sites.as_ref(), point).await?;
                ResourceContents::json(uri, &request, &listed)
            }
        }
    }

    /// Invoke one tool.
    pub async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolResult> {
        match name {
            tools::CREATE_NODE_TOOL => {
                let args: tools::CreateNodeArguments = tools::parse_arguments(name, arguments)?;
                let (origin, command) = args.into_command();
                let created = self.graph.create_node(&origin, command).await?;
                Ok(ToolResult::success(serde_json::to_value(created)?))
            }
            tools::SET_NODE_PROPERTIES_TOOL => {
                let args: tools::SetNodePropertiesArguments = tools::parse_arguments(name, arguments)?;
                let values = args.property_values();
                self.graph
                    .set_node_properties(&args.origin_dimension_space_point, &args.node_aggregate_id, values)
                    .await?;
                Ok(ToolResult::success(json!(null)))
            }
            other => Err(Error::UnknownTool(other.to_string())),
        }
    }
}
