//! # Graph traversal
//!
//! Children-only and subtree search below a root node, filtered by node
//! type. Type matching is polymorphic through [`NodeTypeManager::is_of_type`],
//! the same closure the schema resource reports.
//!
//! | Operation | Cost |
//! |-----------|------|
//! | `find_children` | parent's fan-out |
//! | `find_descendants` | whole subtree: use only when the parent is unknown |

use std::collections::HashSet;

use tracing::debug;

use crate::context::GraphContext;
use crate::model::{Node, NodeAggregateId};
use crate::schema::NodeTypeManager;
use crate::storage::ContentBackend;
use crate::{Error, Result};

/// An "instanceof" filter over node type names.
#[derive(Debug, Clone, Copy)]
pub struct NodeTypeFilter<'t> {
    types: &'t NodeTypeManager,
    node_type_name: &'t str,
}

impl<'t> NodeTypeFilter<'t> {
    /// Fails with `UnknownNodeType` when the filter type is not declared.
    pub fn new(types: &'t NodeTypeManager, node_type_name: &'t str) -> Result<Self> {
        types.get_node_type(node_type_name)?;
        Ok(Self { types, node_type_name })
    }

    pub fn node_type_name(&self) -> &str {
        self.node_type_name
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.types.is_of_type(&node.node_type_name, self.node_type_name)
    }
}

/// Direct children of `root` that match `filter`, in sibling order.
pub async fn find_children<B: ContentBackend>(
    ctx: &GraphContext<'_, B>,
    root: &NodeAggregateId,
    filter: &NodeTypeFilter<'_>,
) -> Result<Vec<Node>> {
    let root = resolve_root(ctx, root).await?;
    let children = ctx.backend().get_children(ctx.tx(), &root.aggregate_id).await?;
    Ok(children.into_iter().filter(|child| filter.matches(child)).collect())
}

/// Every node below `root` (not `root` itself) that matches `filter`, in
/// document order (depth-first, pre-order).
pub async fn find_descendants<B: ContentBackend>(
    ctx: &GraphContext<'_, B>,
    root: &NodeAggregateId,
    filter: &NodeTypeFilter<'_>,
) -> Result<Vec<Node>> {
    let root = resolve_root(ctx, root).await?;

    let mut found = Vec::new();
    let mut visited: HashSet<NodeAggregateId> = HashSet::from([root.aggregate_id.clone()]);
    let mut stack: Vec<Node> = ctx.backend().get_children(ctx.tx(), &root.aggregate_id).await?;
    stack.reverse();
    let mut walked = 0usize;

    while let Some(node) = stack.pop() {
        if !visited.insert(node.aggregate_id.clone()) {
            continue;
        }
        walked += 1;
        let mut children = ctx.backend().get_children(ctx.tx(), &node.aggregate_id).await?;
        children.reverse();
        stack.extend(children);
        if filter.matches(&node) {
            found.push(node);
        }
    }
    debug!(root = %root.aggregate_id, walked, matched = found.len(), "subtree walk");
    Ok(found)
}

async fn resolve_root<B: ContentBackend>(ctx: &GraphContext<'_, B>, id: &NodeAggregateId) -> Result<Node> {
    ctx.backend()
        .get_node(ctx.tx(), id)
        .await?
        .ok_or_else(|| Error::NodeNotFound(format!("{id} in {}", ctx.config().target_dimensions)))
}
