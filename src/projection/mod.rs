//! Node projection: the protocol-safe record every traversal resource returns.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::Node;

/// Which properties a projection keeps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PropertyFilter {
    #[default]
    All,
    /// Names the node does not carry are simply omitted.
    Only(BTreeSet<String>),
}

impl PropertyFilter {
    /// An empty allow-list means no restriction.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            PropertyFilter::All
        } else {
            PropertyFilter::Only(names)
        }
    }

    pub fn allows(&self, property: &str) -> bool {
        match self {
            PropertyFilter::All => true,
            PropertyFilter::Only(names) => names.contains(property),
        }
    }
}

/// `{aggregateId, properties, nodeTypeName}`; properties are emitted in name order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub aggregate_id: String,
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub node_type_name: String,
}

impl NodeRecord {
    pub fn project(node: &Node, filter: &PropertyFilter) -> Self {
        let mut names: Vec<&String> = node.properties.keys().filter(|k| filter.allows(k)).collect();
        names.sort();
        let properties = names
            .into_iter()
            .map(|name| (name.clone(), node.properties[name].to_json()))
            .collect();
        Self {
            aggregate_id: node.aggregate_id.to_string(),
            properties,
            node_type_name: node.node_type_name.clone(),
        }
    }
}

pub fn project_all(nodes: &[Node], filter: &PropertyFilter) -> Vec<NodeRecord> {
    nodes.iter().map(|node| NodeRecord::project(node, filter)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::property_map;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn node() -> Node {
        Node {
            aggregate_id: "n1".into(),
            node_type_name: "Example:Text".into(),
            name: "text".into(),
            parent: Some("p".into()),
            position: 0,
            hidden: false,
            properties: property_map([("a", 1), ("b", 2), ("c", 3)]),
        }
    }

    #[test]
    fn test_allow_list_projection() {
        let record = NodeRecord::project(&node(), &PropertyFilter::only(["a", "c", "zzz"]));
        assert_eq!(
            serde_json::to_value(record).unwrap(),
            json!({"aggregateId": "n1", "properties": {"a": 1, "c": 3}, "nodeTypeName": "Example:Text"})
        );
    }

    #[test]
    fn test_unrestricted_projection() {
        let record = NodeRecord::project(&node(), &PropertyFilter::All);
        assert_eq!(record.properties.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(PropertyFilter::only(Vec::<String>::new()), PropertyFilter::All);
    }

    #[test]
    fn test_projection_is_deterministic() {
        let n = node();
        let first = serde_json::to_string(&NodeRecord::project(&n, &PropertyFilter::All)).unwrap();
        let second = serde_json::to_string(&NodeRecord::project(&n, &PropertyFilter::All)).unwrap();
        assert_eq!(first, second);
    }
}
