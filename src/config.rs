//! Adapter configuration.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Settings that are fixed for the lifetime of an adapter.
///
/// Every context targets `workspace_name`; it is configurable, but never
/// chosen per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterConfig {
    pub workspace_name: String,
    /// Marker type: its concrete subtypes make up the schema resource.
    pub exposed_node_type: String,
    pub server_name: String,
    pub server_version: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            workspace_name: "user-admin".to_string(),
            exposed_node_type: "ContentGraph.Mcp:Mixin.Exposed".to_string(),
            server_name: env!("CARGO_PKG_NAME").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl AdapterConfig {
    /// Parse a JSON object; absent keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = AdapterConfig::from_json_str(r#"{"workspaceName": "live"}"#).unwrap();
        assert_eq!(config.workspace_name, "live");
        assert_eq!(config.exposed_node_type, "ContentGraph.Mcp:Mixin.Exposed");
        assert_eq!(config.server_name, "contentgraph-mcp");
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(AdapterConfig::from_json_str("[]"), Err(crate::Error::Json(_))));
    }
}
