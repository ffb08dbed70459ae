//! In-memory content engine.
//!
//! This is the reference implementation of `ContentBackend`.
//! It keeps one node tree per workspace in HashMaps protected by RwLock.
//!
//! ## Model
//!
//! - A **node aggregate** owns identity, type, name, parent and child order.
//!   Tree structure is shared by all dimension variants.
//! - A **variant** holds the properties for one dimension coordinate. A
//!   variant at the empty coordinate is visible under every dimension set.
//! - Under a context, the visible variant is the first coordinate in the
//!   cartesian product of the fallback chains (dimensions in name order,
//!   first dimension most significant) that the aggregate has a variant for.
//!
//! ## Limitations
//!
//! - **No real transactions**: `commit_tx()` and `rollback_tx()` are no-ops.
//!   Writes are applied immediately. Rollback does NOT undo mutations.
//! - **Single-writer only**: each write takes the workspace lock on its own,
//!   so multi-step mutations are NOT atomic.
//!
//! Use this engine for:
//! - Testing the dimension, traversal and mutation layers
//! - Embedding the adapter in applications that don't need persistence

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;
use async_trait::async_trait;
use tracing::debug;

use crate::context::ContextConfig;
use crate::model::*;
use crate::model::node::is_internal_property;
use crate::schema::NodeTypeManager;
use crate::security::AuthorizationBypass;
use crate::tx::{Transaction, TxMode, TxId};
use crate::{Error, Result};
use super::ContentBackend;

/// Node type of the workspace root and of `/sites`.
pub const ROOT_NODE_TYPE: &str = "unstructured";

/// Name of the node below the root that holds all site roots.
pub const SITES_NODE_NAME: &str = "sites";

pub use crate::model::node::HIDDEN_PROPERTY;

/// Tethered children nested deeper than this indicate a self-tethering type.
const MAX_TETHERED_DEPTH: usize = 32;

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory content graph storage.
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    node_types: Arc<NodeTypeManager>,
    workspaces: RwLock<HashMap<String, WorkspaceGraph>>,
    next_tx_id: AtomicU64,
}

#[derive(Debug, Clone)]
struct WorkspaceGraph {
    root: NodeAggregateId,
    aggregates: HashMap<NodeAggregateId, NodeAggregate>,
}

#[derive(Debug, Clone)]
struct NodeAggregate {
    id: NodeAggregateId,
    node_type_name: String,
    name: String,
    parent: Option<NodeAggregateId>,
    children: Vec<NodeAggregateId>,
    variants: BTreeMap<DimensionSpacePoint, NodeVariant>,
}

#[derive(Debug, Clone, Default)]
struct NodeVariant {
    properties: PropertyMap,
    hidden: bool,
}

impl MemoryBackend {
    pub fn new(node_types: Arc<NodeTypeManager>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                node_types,
                workspaces: RwLock::new(HashMap::new()),
                next_tx_id: AtomicU64::new(1),
            }),
        }
    }

    /// Create an empty workspace (root + `/sites`) unless it exists.
    pub fn ensure_workspace(&self, name: &str) {
        self.inner
            .workspaces
            .write()
            .entry(name.to_string())
            .or_insert_with(WorkspaceGraph::empty);
    }

    /// Create `name` as a copy of `base`.
    pub fn fork_workspace(&self, base: &str, name: &str) -> Result<()> {
        let mut workspaces = self.inner.workspaces.write();
        if workspaces.contains_key(name) {
            return Err(Error::ConstraintViolation(format!("workspace \"{name}\" already exists")));
        }
        let copy = workspaces
            .get(base)
            .cloned()
            .ok_or_else(|| Error::StorageError(format!("workspace \"{base}\" does not exist")))?;
        workspaces.insert(name.to_string(), copy);
        Ok(())
    }

    pub fn workspace_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.workspaces.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn root_node_aggregate_id(&self, workspace: &str) -> Option<NodeAggregateId> {
        self.inner.workspaces.read().get(workspace).map(|g| g.root.clone())
    }

    /// Aggregate id of `/sites` in `workspace`.
    pub fn sites_node_aggregate_id(&self, workspace: &str) -> Option<NodeAggregateId> {
        let workspaces = self.inner.workspaces.read();
        let graph = workspaces.get(workspace)?;
        graph.child_named(&graph.root, SITES_NODE_NAME).map(|a| a.id.clone())
    }

    /// Number of node aggregates in `workspace`, root included.
    pub fn aggregate_count(&self, workspace: &str) -> usize {
        self.inner.workspaces.read().get(workspace).map_or(0, |g| g.aggregates.len())
    }

    /// Insert a fixture node with explicit variants. Tethered children are
    /// not created; seed them explicitly if a test needs them.
    pub fn insert_node(
        &self,
        workspace: &str,
        parent: &NodeAggregateId,
        seed: NodeSeed,
    ) -> Result<NodeAggregateId> {
        let mut workspaces = self.inner.workspaces.write();
        let graph = workspaces
            .get_mut(workspace)
            .ok_or_else(|| Error::StorageError(format!("workspace \"{workspace}\" does not exist")))?;
        let variants = seed
            .variants
            .into_iter()
            .map(|(point, properties, hidden)| (point, NodeVariant { properties, hidden }))
            .collect();
        graph.attach(parent, seed.id.clone(), seed.name, seed.node_type, variants)?;
        Ok(seed.id)
    }
}

impl WorkspaceGraph {
    fn empty() -> Self {
        let root = NodeAggregate {
            id: NodeAggregateId::generate(),
            node_type_name: ROOT_NODE_TYPE.to_string(),
            name: String::new(),
            parent: None,
            children: Vec::new(),
            variants: BTreeMap::from([(DimensionSpacePoint::new(), NodeVariant::default())]),
        };
        let mut graph = Self {
            root: root.id.clone(),
            aggregates: HashMap::from([(root.id.clone(), root)]),
        };
        let root_id = graph.root.clone();
        let everywhere = BTreeMap::from([(DimensionSpacePoint::new(), NodeVariant::default())]);
        // The root was inserted above, so attaching `/sites` cannot fail.
        let _ = graph.attach(
            &root_id,
            NodeAggregateId::generate(),
            SITES_NODE_NAME.to_string(),
            ROOT_NODE_TYPE.to_string(),
            everywhere,
        );
        graph
    }

    fn child_named(&self, parent: &NodeAggregateId, name: &str) -> Option<&NodeAggregate> {
        self.aggregates
            .get(parent)?
            .children
            .iter()
            .filter_map(|id| self.aggregates.get(id))
            .find(|child| child.name == name)
    }

    /// Append a new aggregate below `parent`.
    fn attach(
        &mut self,
        parent: &NodeAggregateId,
        id: NodeAggregateId,
        name: String,
        node_type_name: String,
        variants: BTreeMap<DimensionSpacePoint, NodeVariant>,
    ) -> Result<()> {
        if self.aggregates.contains_key(&id) {
            return Err(Error::ConstraintViolation(format!("node aggregate {id} already exists")));
        }
        if !self.aggregates.contains_key(parent) {
            return Err(Error::NodeNotFound(parent.to_string()));
        }
        if self.child_named(parent, &name).is_some() {
            return Err(Error::ConstraintViolation(format!(
                "node {parent} already has a child named \"{name}\""
            )));
        }
        let aggregate = NodeAggregate {
            id: id.clone(),
            node_type_name,
            name,
            parent: Some(parent.clone()),
            children: Vec::new(),
            variants,
        };
        self.aggregates.insert(id.clone(), aggregate);
        if let Some(parent) = self.aggregates.get_mut(parent) {
            parent.children.push(id);
        }
        Ok(())
    }

    /// Attach a node and, recursively, the tethered children its type declares.
    fn attach_with_tethered(
        &mut self,
        types: &NodeTypeManager,
        parent: &NodeAggregateId,
        id: NodeAggregateId,
        name: String,
        node_type_name: &str,
        target: &DimensionSpacePoint,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_TETHERED_DEPTH {
            return Err(Error::ConstraintViolation(format!(
                "tethered children of \"{node_type_name}\" nest deeper than {MAX_TETHERED_DEPTH} levels"
            )));
        }
        let tethered = types.tethered_children(node_type_name)?;
        let variants = BTreeMap::from([(target.clone(), NodeVariant::default())]);
        self.attach(parent, id.clone(), name, node_type_name.to_string(), variants)?;

        for (child_name, declaration) in tethered {
            self.attach_with_tethered(
                types,
                &id,
                NodeAggregateId::generate(),
                child_name,
                &declaration.node_type,
                target,
                depth + 1,
            )?;
        }
        Ok(())
    }

    /// Remove `id` and everything below it. Returns the number of aggregates removed.
    fn detach_subtree(&mut self, id: &NodeAggregateId) -> usize {
        let Some(parent) = self.aggregates.get(id).and_then(|a| a.parent.clone()) else {
            return 0;
        };
        if let Some(parent) = self.aggregates.get_mut(&parent) {
            parent.children.retain(|c| c != id);
        }
        let mut removed = 0;
        let mut pending = vec![id.clone()];
        while let Some(current) = pending.pop() {
            if let Some(aggregate) = self.aggregates.remove(&current) {
                removed += 1;
                pending.extend(aggregate.children);
            }
        }
        removed
    }

    fn visible_variant<'a>(&self, aggregate: &'a NodeAggregate, tx: &MemoryTx) -> Option<&'a NodeVariant> {
        let variant = tx
            .candidates
            .iter()
            .find_map(|point| aggregate.variants.get(point))
            .or_else(|| aggregate.variants.get(&DimensionSpacePoint::new()))?;
        if variant.hidden && !tx.invisible_content_shown {
            return None;
        }
        Some(variant)
    }

    fn visible_aggregate(&self, id: &NodeAggregateId, tx: &MemoryTx) -> Option<(&NodeAggregate, &NodeVariant)> {
        let aggregate = self.aggregates.get(id)?;
        let variant = self.visible_variant(aggregate, tx)?;
        Some((aggregate, variant))
    }

    fn snapshot(&self, aggregate: &NodeAggregate, variant: &NodeVariant) -> Node {
        let position = aggregate
            .parent
            .as_ref()
            .and_then(|p| self.aggregates.get(p))
            .and_then(|p| p.children.iter().position(|c| *c == aggregate.id))
            .unwrap_or(0);
        Node {
            aggregate_id: aggregate.id.clone(),
            node_type_name: aggregate.node_type_name.clone(),
            name: aggregate.name.clone(),
            parent: aggregate.parent.clone(),
            position,
            hidden: variant.hidden,
            properties: variant
                .properties
                .iter()
                .filter(|(k, _)| !is_internal_property(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    fn visible_node(&self, id: &NodeAggregateId, tx: &MemoryTx) -> Option<Node> {
        self.visible_aggregate(id, tx)
            .map(|(aggregate, variant)| self.snapshot(aggregate, variant))
    }

    /// Whether `candidate` is `ancestor` or lies below it.
    fn is_within(&self, candidate: &NodeAggregateId, ancestor: &NodeAggregateId) -> bool {
        let mut current = Some(candidate.clone());
        while let Some(id) = current {
            if id == *ancestor {
                return true;
            }
            current = self.aggregates.get(&id).and_then(|a| a.parent.clone());
        }
        false
    }
}

// ============================================================================
// NodeSeed (fixtures)
// ============================================================================

/// Fixture description for [`MemoryBackend::insert_node`].
#[derive(Debug, Clone)]
pub struct NodeSeed {
    pub id: NodeAggregateId,
    pub name: String,
    pub node_type: String,
    pub variants: Vec<(DimensionSpacePoint, PropertyMap, bool)>,
}

impl NodeSeed {
    pub fn new(id: impl Into<NodeAggregateId>, name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), node_type: node_type.into(), variants: Vec::new() }
    }

    /// Add a variant at `point`.
    pub fn variant(mut self, point: DimensionSpacePoint, properties: PropertyMap) -> Self {
        self.variants.push((point, properties, false));
        self
    }

    /// Add a hidden variant at `point`.
    pub fn hidden_variant(mut self, point: DimensionSpacePoint, properties: PropertyMap) -> Self {
        self.variants.push((point, properties, true));
        self
    }

    /// Add a variant visible under every dimension set.
    pub fn everywhere(self, properties: PropertyMap) -> Self {
        self.variant(DimensionSpacePoint::new(), properties)
    }
}

// ============================================================================
// MemoryTx
// ============================================================================

/// In-memory transaction: the bound context, no MVCC.
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
    workspace: String,
    /// Variant coordinates in lookup priority order.
    candidates: Vec<DimensionSpacePoint>,
    target: DimensionSpacePoint,
    invisible_content_shown: bool,
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
    fn workspace_name(&self) -> &str { &self.workspace }
}

impl MemoryTx {
    fn ensure_writable(&self) -> Result<()> {
        match self.mode {
            TxMode::ReadWrite => Ok(()),
            TxMode::ReadOnly => Err(Error::StorageError(format!("{} is read-only", self.id))),
        }
    }
}

/// Cartesian product of the fallback chains, most specific first.
fn candidate_points(dimensions: &ResolvedDimensionValues) -> Vec<DimensionSpacePoint> {
    let mut points = vec![DimensionSpacePoint::new()];
    for (dimension, values) in dimensions.iter() {
        points = points
            .into_iter()
            .flat_map(|point| {
                values
                    .iter()
                    .map(move |value| point.clone().with(dimension.clone(), value.clone()))
            })
            .collect();
    }
    points
}

// ============================================================================
// ContentBackend impl
// ============================================================================

#[async_trait]
impl ContentBackend for MemoryBackend {
    type Tx = MemoryTx;

    async fn begin_tx(
        &self,
        config: &ContextConfig,
        mode: TxMode,
        _bypass: &AuthorizationBypass,
    ) -> Result<MemoryTx> {
        if !self.inner.workspaces.read().contains_key(&config.workspace_name) {
            return Err(Error::NodeContextCreationFailed(format!(
                "workspace \"{}\" does not exist",
                config.workspace_name
            )));
        }
        let candidates = candidate_points(&config.dimensions);
        let target = config.target_dimensions.clone();
        // Variants written at the target must be readable by the same context.
        if !target.is_empty() && !candidates.contains(&target) {
            return Err(Error::NodeContextCreationFailed(format!(
                "target {target} is not reachable through the context's dimension fallbacks"
            )));
        }
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        Ok(MemoryTx {
            id,
            mode,
            workspace: config.workspace_name.clone(),
            candidates,
            target,
            invisible_content_shown: config.invisible_content_shown,
        })
    }

    /// No-op: memory engine applies writes immediately, not on commit.
    async fn commit_tx(&self, _tx: MemoryTx) -> Result<()> { Ok(()) }

    /// WARNING: No-op. Memory engine has no write-ahead log.
    /// Mutations applied during this transaction are NOT reverted.
    async fn rollback_tx(&self, _tx: MemoryTx) -> Result<()> { Ok(()) }

    // ========================================================================
    // Reads
    // ========================================================================

    async fn get_node(&self, tx: &MemoryTx, id: &NodeAggregateId) -> Result<Option<Node>> {
        let workspaces = self.inner.workspaces.read();
        let graph = workspace(&workspaces, tx)?;
        Ok(graph.visible_node(id, tx))
    }

    async fn get_node_by_path(&self, tx: &MemoryTx, path: &str) -> Result<Option<Node>> {
        let workspaces = self.inner.workspaces.read();
        let graph = workspace(&workspaces, tx)?;

        let mut current = graph.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let Some(child) = graph.child_named(&current, segment) else {
                return Ok(None);
            };
            if graph.visible_variant(child, tx).is_none() {
                return Ok(None);
            }
            current = child.id.clone();
        }
        Ok(graph.visible_node(&current, tx))
    }

    async fn get_children(&self, tx: &MemoryTx, parent: &NodeAggregateId) -> Result<Vec<Node>> {
        let workspaces = self.inner.workspaces.read();
        let graph = workspace(&workspaces, tx)?;

        let (aggregate, _) = graph
            .visible_aggregate(parent, tx)
            .ok_or_else(|| Error::NodeNotFound(parent.to_string()))?;
        Ok(aggregate
            .children
            .iter()
            .filter_map(|child| graph.visible_node(child, tx))
            .collect())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    async fn create_node(
        &self,
        tx: &mut MemoryTx,
        parent: &NodeAggregateId,
        id: NodeAggregateId,
        name: &str,
        node_type_name: &str,
    ) -> Result<Node> {
        tx.ensure_writable()?;
        let mut workspaces = self.inner.workspaces.write();
        let graph = workspace_mut(&mut workspaces, tx)?;

        if graph.visible_aggregate(parent, tx).is_none() {
            return Err(Error::NodeNotFound(parent.to_string()));
        }
        if graph.aggregates.contains_key(&id) {
            return Err(Error::ConstraintViolation(format!("node aggregate {id} already exists")));
        }
        let attached = graph.attach_with_tethered(
            &self.inner.node_types,
            parent,
            id.clone(),
            name.to_string(),
            node_type_name,
            &tx.target,
            0,
        );
        if let Err(err) = attached {
            // A failure below the new node must not leave part of its subtree behind.
            let removed = graph.detach_subtree(&id);
            debug!(node = %id, removed, "discarded partially created subtree");
            return Err(err);
        }
        graph
            .visible_node(&id, tx)
            .ok_or_else(|| Error::StorageError(format!("created node {id} is not visible in its own context")))
    }

    async fn set_node_property(
        &self,
        tx: &mut MemoryTx,
        id: &NodeAggregateId,
        key: &str,
        val: Value,
    ) -> Result<()> {
        tx.ensure_writable()?;
        let hidden = match key {
            HIDDEN_PROPERTY => Some(val.as_bool().ok_or_else(|| Error::PropertyCoercionFailed {
                property: HIDDEN_PROPERTY.to_string(),
                message: format!("must be boolean, got {}", val.type_name()),
            })?),
            _ => None,
        };
        let mut workspaces = self.inner.workspaces.write();
        let graph = workspace_mut(&mut workspaces, tx)?;

        let (_, visible) = graph
            .visible_aggregate(id, tx)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        let materialized = visible.clone();

        let aggregate = graph
            .aggregates
            .get_mut(id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        let variant = aggregate.variants.entry(tx.target.clone()).or_insert(materialized);

        match hidden {
            Some(hidden) => variant.hidden = hidden,
            None => {
                variant.properties.insert(key.to_string(), val);
            }
        }
        Ok(())
    }

    async fn move_before(
        &self,
        tx: &mut MemoryTx,
        id: &NodeAggregateId,
        succeeding_sibling: &NodeAggregateId,
    ) -> Result<()> {
        tx.ensure_writable()?;
        if id == succeeding_sibling {
            return Ok(());
        }
        let mut workspaces = self.inner.workspaces.write();
        let graph = workspace_mut(&mut workspaces, tx)?;

        let (node, _) = graph
            .visible_aggregate(id, tx)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        let old_parent = node
            .parent
            .clone()
            .ok_or_else(|| Error::ConstraintViolation("the root node cannot be moved".into()))?;
        let (sibling, _) = graph
            .visible_aggregate(succeeding_sibling, tx)
            .ok_or_else(|| Error::NodeNotFound(succeeding_sibling.to_string()))?;
        let new_parent = sibling.parent.clone().ok_or_else(|| {
            Error::ConstraintViolation("cannot move a node before the root node".into())
        })?;
        if graph.is_within(&new_parent, id) {
            return Err(Error::ConstraintViolation(format!(
                "cannot move node {id} below itself"
            )));
        }

        if let Some(parent) = graph.aggregates.get_mut(&old_parent) {
            parent.children.retain(|c| c != id);
        }
        let parent = graph
            .aggregates
            .get_mut(&new_parent)
            .ok_or_else(|| Error::NodeNotFound(new_parent.to_string()))?;
        let index = parent
            .children
            .iter()
            .position(|c| c == succeeding_sibling)
            .unwrap_or(parent.children.len());
        parent.children.insert(index, id.clone());
        if let Some(node) = graph.aggregates.get_mut(id) {
            node.parent = Some(new_parent);
        }
        Ok(())
    }
}

fn workspace<'w>(
    workspaces: &'w HashMap<String, WorkspaceGraph>,
    tx: &MemoryTx,
) -> Result<&'w WorkspaceGraph> {
    workspaces
        .get(&tx.workspace)
        .ok_or_else(|| Error::StorageError(format!("workspace \"{}\" vanished", tx.workspace)))
}

fn workspace_mut<'w>(
    workspaces: &'w mut HashMap<String, WorkspaceGraph>,
    tx: &MemoryTx,
) -> Result<&'w mut WorkspaceGraph> {
    workspaces
        .get_mut(&tx.workspace)
        .ok_or_else(|| Error::StorageError(format!("workspace \"{}\" vanished", tx.workspace)))
}

// ============================================================================
// Tests
// ============================================================================
