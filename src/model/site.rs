//! Site records.

use serde::{Deserialize, Serialize};

/// A site: a display name plus the node name of its root below `/sites`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub name: String,
    pub node_name: String,
}

impl Site {
    pub fn new(name: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self { name: name.into(), node_name: node_name.into() }
    }

    /// Absolute path of the site's root node.
    pub fn root_path(&self) -> String {
        format!("/sites/{}", self.node_name)
    }
}
