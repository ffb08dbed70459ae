//! # contentgraph-mcp: Dimensioned Content Graph Access for Agents
//!
//! Exposes a hierarchical, multi-dimensional content graph (typed nodes,
//! tethered children, dimension variants) to agents speaking the Model
//! Context Protocol: resources to discover the graph, tools to mutate it.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `ContentBackend` is the contract between this layer and the content engine
//! 2. **One context per call**: every operation resolves its dimensions and binds a fresh `GraphContext`
//! 3. **Scoped elevation**: authorization checks are suspended by a guard that dies with the context
//! 4. **Schema-driven polymorphism**: type filters and the schema resource share one supertype closure
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use contentgraph_mcp::{ContentGraph, DimensionSpacePoint, NodeTypeManager, PresetCatalog, PropertyFilter};
//!
//! # async fn example() -> contentgraph_mcp::Result<()> {
//! let node_types = Arc::new(NodeTypeManager::from_json_str(r#"{"Example:Text": {}}"#)?);
//! let presets = Arc::new(PresetCatalog::default());
//! let graph = ContentGraph::open_memory(node_types, presets);
//!
//! let root = graph.backend().root_node_aggregate_id("user-admin").expect("seeded");
//! let texts = graph
//!     .find_children(&DimensionSpacePoint::new(), &root, "Example:Text", &PropertyFilter::All)
//!     .await?;
//! println!("{} text nodes", texts.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Engines
//!
//! | Engine | Module | Description |
//! |--------|--------|-------------|
//! | Memory | `storage::memory` | In-memory content graph for testing/embedding |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod tx;
pub mod storage;
pub mod security;
pub mod dimension;
pub mod context;
pub mod schema;
pub mod traversal;
pub mod projection;
pub mod convert;
pub mod mutation;
pub mod media;
pub mod sites;
pub mod config;
pub mod mcp;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, NodeAggregateId, Value, PropertyMap, PropertyType,
    DimensionSpacePoint, ResolvedDimensionValues, PresetCatalog,
    NodeTypeDeclaration, MediaKind, Site,
};

// ============================================================================
// Re-exports: Engine boundary
// ============================================================================

pub use storage::{ContentBackend, MemoryBackend};
pub use tx::{Transaction, TxMode, TxId};
pub use security::{SecurityContext, AuthorizationBypass};

// ============================================================================
// Re-exports: Access layer
// ============================================================================

pub use config::AdapterConfig;
pub use context::{ContextConfig, ContextFactory, GraphContext};
pub use convert::ConverterRegistry;
pub use dimension::DimensionResolver;
pub use mutation::{CreateNodeCommand, CreatedNode};
pub use projection::{NodeRecord, PropertyFilter};
pub use schema::{NodeType, NodeTypeManager};
pub use mcp::ContentRepositoryMcp;

// ============================================================================
// Top-level ContentGraph handle
// ============================================================================

/// The primary entry point. A `ContentGraph` wraps a content engine and runs
/// each read or write as a self-contained unit: resolve dimensions, bind a
/// context, perform the operation, release the context.
///
/// Nothing is cached between calls.
pub struct ContentGraph<B: ContentBackend> {
    backend: B,
    node_types: Arc<NodeTypeManager>,
    resolver: DimensionResolver,
    contexts: ContextFactory,
    converters: ConverterRegistry,
}

impl<B: ContentBackend> ContentGraph<B> {
    /// Create a ContentGraph over the given engine.
    pub fn with_backend(
        backend: B,
        node_types: Arc<NodeTypeManager>,
        presets: Arc<PresetCatalog>,
        config: &AdapterConfig,
        security: SecurityContext,
    ) -> Self {
        Self {
            backend,
            node_types,
            resolver: DimensionResolver::new(presets),
            contexts: ContextFactory::new(config.workspace_name.clone(), security),
            converters: ConverterRegistry::default(),
        }
    }

    /// Replace the property conversion registry.
    pub fn with_converters(mut self, converters: ConverterRegistry) -> Self {
        self.converters = converters;
        self
    }

    /// Resolve `point` and bind a context for exactly one operation.
    ///
    /// Authorization checks stay suspended until the returned context is
    /// committed, rolled back or dropped.
    pub async fn open_context(
        &self,
        point: &DimensionSpacePoint,
        mode: TxMode,
    ) -> Result<GraphContext<'_, B>> {
        let resolved = self.resolver.resolve(point)?;
        self.contexts.create(&self.backend, resolved, mode).await
    }

    /// Direct children of `parent` that are of type `node_type_name` (or a subtype).
    ///
    /// Cheap: bounded by the parent's fan-out. Prefer this whenever the parent is known.
    pub async fn find_children(
        &self,
        point: &DimensionSpacePoint,
        parent: &NodeAggregateId,
        node_type_name: &str,
        properties: &PropertyFilter,
    ) -> Result<Vec<NodeRecord>> {
        let filter = traversal::NodeTypeFilter::new(&self.node_types, node_type_name)?;
        let ctx = self.open_context(point, TxMode::ReadOnly).await?;
        let found = traversal::find_children(&ctx, parent, &filter).await;
        let nodes = ctx.finish(found).await?;
        debug!(parent = %parent, node_type = node_type_name, count = nodes.len(), "found children");
        Ok(projection::project_all(&nodes, properties))
    }

    /// All nodes below `ancestor` (excluding it) that are of type `node_type_name`.
    ///
    /// Expensive: walks the whole subtree. Use only when the parent is unknown.
    pub async fn find_descendants(
        &self,
        point: &DimensionSpacePoint,
        ancestor: &NodeAggregateId,
        node_type_name: &str,
        properties: &PropertyFilter,
    ) -> Result<Vec<NodeRecord>> {
        let filter = traversal::NodeTypeFilter::new(&self.node_types, node_type_name)?;
        let ctx = self.open_context(point, TxMode::ReadOnly).await?;
        let found = traversal::find_descendants(&ctx, ancestor, &filter).await;
        let nodes = ctx.finish(found).await?;
        debug!(ancestor = %ancestor, node_type = node_type_name, count = nodes.len(), "found descendants");
        Ok(projection::project_all(&nodes, properties))
    }

    /// Look up one node as seen from `point`.
    pub async fn get_node(&self, point: &DimensionSpacePoint, id: &NodeAggregateId) -> Result<Node> {
        let ctx = self.open_context(point, TxMode::ReadOnly).await?;
        let found = ctx.backend().get_node(ctx.tx(), id).await;
        ctx.finish(found).await?
            .ok_or_else(|| Error::NodeNotFound(format!("{id} in {point}")))
    }

    /// Create a node (and its tethered children) in the `origin` variant.
    pub async fn create_node(
        &self,
        origin: &DimensionSpacePoint,
        command: CreateNodeCommand,
    ) -> Result<CreatedNode> {
        let mut ctx = self.open_context(origin, TxMode::ReadWrite).await?;
        let created = mutation::create_node(&mut ctx, &self.node_types, &self.converters, command).await;
        let created = ctx.finish(created).await?;
        info!(
            node = %created.node_aggregate_id,
            tethered = created.tethered_descendant_aggregate_ids.len(),
            "created node"
        );
        Ok(created)
    }

    /// Coerce and assign `values` on an existing node in the `origin` variant.
    ///
    /// Not atomic: see [`mutation::set_properties`].
    pub async fn set_node_properties(
        &self,
        origin: &DimensionSpacePoint,
        id: &NodeAggregateId,
        values: BTreeMap<String, Value>,
    ) -> Result<()> {
        let names: Vec<String> = values.keys().cloned().collect();
        let mut ctx = self.open_context(origin, TxMode::ReadWrite).await?;
        let outcome = mutation::set_properties(&mut ctx, &self.node_types, &self.converters, id, values).await;
        ctx.finish(outcome).await?;
        info!(node = %id, properties = ?names, "set node properties");
        Ok(())
    }

    /// Every allowed dimension space point, reduced to the first value per dimension.
    ///
    /// Values, not preset keys: see [`DimensionResolver::dimension_space`].
    pub fn dimension_space(&self) -> Vec<BTreeMap<String, String>> {
        self.resolver.dimension_space()
    }

    pub fn node_types(&self) -> &NodeTypeManager {
        &self.node_types
    }

    pub fn resolver(&self) -> &DimensionResolver {
        &self.resolver
    }

    pub fn security(&self) -> &SecurityContext {
        self.contexts.security()
    }

    /// Access the underlying engine (for fixtures and advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// In-memory content graph for testing and embedding.
impl ContentGraph<MemoryBackend> {
    pub fn open_memory(node_types: Arc<NodeTypeManager>, presets: Arc<PresetCatalog>) -> Self {
        let config = AdapterConfig::default();
        let backend = MemoryBackend::new(Arc::clone(&node_types));
        backend.ensure_workspace(&config.workspace_name);
        Self::with_backend(backend, node_types, presets, &config, SecurityContext::new())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown dimension or preset: {0}")]
    UnknownDimensionOrPreset(String),

    #[error("Node context creation failed: {0}")]
    NodeContextCreationFailed(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Parent node not found: {0}")]
    ParentNotFound(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Property \"{property}\" could not be coerced: {message}")]
    PropertyCoercionFailed { property: String, message: String },

    #[error("Unsupported media type \"{0}\", must be one of Audio, Document, Image or Video")]
    UnsupportedMediaType(String),

    #[error("Malformed parameter: {0}")]
    MalformedParameter(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid node type catalog: {0}")]
    InvalidNodeTypeCatalog(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable error kind reported at the protocol boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnknownDimensionOrPreset(_) => "UnknownDimensionOrPreset",
            Error::NodeContextCreationFailed(_) => "NodeContextCreationFailed",
            Error::NodeNotFound(_) => "NodeNotFound",
            Error::ParentNotFound(_) => "ParentNotFound",
            Error::UnknownNodeType(_) => "UnknownNodeType",
            Error::PropertyCoercionFailed { .. } => "PropertyCoercionFailed",
            Error::UnsupportedMediaType(_) => "UnsupportedMediaType",
            Error::MalformedParameter(_) => "MalformedParameter",
            Error::ConstraintViolation(_) => "ConstraintViolation",
            Error::InvalidNodeTypeCatalog(_) => "InvalidNodeTypeCatalog",
            Error::UnknownResource(_) => "UnknownResource",
            Error::UnknownTool(_) => "UnknownTool",
            Error::StorageError(_) => "StorageError",
            Error::Json(_) => "Json",
        }
    }

    /// True when the caller sent something unusable, as opposed to an engine failure.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownDimensionOrPreset(_)
                | Error::UnknownNodeType(_)
                | Error::PropertyCoercionFailed { .. }
                | Error::UnsupportedMediaType(_)
                | Error::MalformedParameter(_)
                | Error::ConstraintViolation(_)
                | Error::UnknownTool(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NodeNotFound(_) | Error::ParentNotFound(_) | Error::UnknownResource(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
