//! Node in the content graph.

use serde::{Deserialize, Serialize};
use super::{PropertyMap, Value};

/// Stable identity of a node, invariant across its dimension variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAggregateId(pub String);

impl NodeAggregateId {
    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeAggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeAggregateId {
    fn from(v: &str) -> Self { Self(v.to_owned()) }
}

impl From<String> for NodeAggregateId {
    fn from(v: String) -> Self { Self(v) }
}

/// A node as seen through one graph context: the variant selected by the
/// context's dimension fallbacks.
///
/// This is a snapshot. Mutations go through the engine, never through this
/// struct, so a `Node` held across a write is stale.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub aggregate_id: NodeAggregateId,
    pub node_type_name: String,
    /// Path segment below the parent. Unique among siblings.
    pub name: String,
    pub parent: Option<NodeAggregateId>,
    /// Index among the parent's children.
    pub position: usize,
    /// Whether the selected variant carries the `_hidden` flag.
    pub hidden: bool,
    /// Public (non-internal) properties of the selected variant.
    pub properties: PropertyMap,
}

impl Node {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Generate a random node name, used when the caller supplies none.
pub fn generate_node_name() -> String {
    format!("node-{}", uuid::Uuid::new_v4().simple())
}

/// Internal property that toggles a variant's hidden flag. Boolean only.
pub const HIDDEN_PROPERTY: &str = "_hidden";

/// Properties starting with `_` are engine-internal and never exposed.
pub fn is_internal_property(name: &str) -> bool {
    name.starts_with('_')
}
