//! Tool descriptors, argument decoding and the tool result envelope.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::model::{DimensionSpacePoint, NodeAggregateId, Value};
use crate::mutation::CreateNodeCommand;
use crate::{Error, Result};

pub const CREATE_NODE_TOOL: &str = "CreateNodeAggregateWithNode";
pub const SET_NODE_PROPERTIES_TOOL: &str = "SetNodeProperties";

/// Entry of `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: serde_json::Value,
}

pub fn tools() -> Vec<ToolDescriptor> {
    let point_schema = json!({
        "type": "object",
        "description": "Dimension name to preset key, see dimensionspace://show",
        "additionalProperties": {"type": "string"}
    });
    vec![
        ToolDescriptor {
            name: CREATE_NODE_TOOL,
            description: "Create a new node with the given parameters. Node names are strictly optional and \
                should not be used for regular editorial nodes. The succeedingSiblingNodeAggregateId is optional, \
                only use it if a position relative to the siblings is explicitly requested. Remember that \
                tethered children don't need to be created explicitly as they are created automatically together \
                with their parent. Returns the nodeAggregateId of the created node as well as the \
                nodeAggregateIds of the tethered descendants that were created as well.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "nodeTypeName": {"type": "string"},
                    "originDimensionSpacePoint": point_schema.clone(),
                    "parentNodeAggregateId": {"type": "string"},
                    "initialPropertyValues": {"type": "object"},
                    "succeedingSiblingNodeAggregateId": {"type": "string"},
                    "nodeName": {"type": "string"}
                },
                "required": ["nodeTypeName", "originDimensionSpacePoint", "parentNodeAggregateId", "initialPropertyValues"]
            }),
        },
        ToolDescriptor {
            name: SET_NODE_PROPERTIES_TOOL,
            description: "Sets properties on an existing node.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "nodeAggregateId": {"type": "string"},
                    "originDimensionSpacePoint": point_schema,
                    "propertyValues": {"type": "object"}
                },
                "required": ["nodeAggregateId", "originDimensionSpacePoint", "propertyValues"]
            }),
        },
    ]
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeArguments {
    pub node_type_name: String,
    pub origin_dimension_space_point: DimensionSpacePoint,
    pub parent_node_aggregate_id: NodeAggregateId,
    #[serde(default)]
    pub initial_property_values: serde_json::Map<String, serde_json::Value>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub succeeding_sibling_node_aggregate_id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub node_name: Option<String>,
}

impl CreateNodeArguments {
    pub fn into_command(self) -> (DimensionSpacePoint, CreateNodeCommand) {
        let command = CreateNodeCommand {
            parent: self.parent_node_aggregate_id,
            node_type_name: self.node_type_name,
            initial_properties: values(self.initial_property_values),
            succeeding_sibling: self.succeeding_sibling_node_aggregate_id.map(NodeAggregateId::from),
            node_name: self.node_name,
        };
        (self.origin_dimension_space_point, command)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetNodePropertiesArguments {
    pub node_aggregate_id: NodeAggregateId,
    pub origin_dimension_space_point: DimensionSpacePoint,
    pub property_values: serde_json::Map<String, serde_json::Value>,
}

impl SetNodePropertiesArguments {
    pub fn property_values(&self) -> BTreeMap<String, Value> {
        values(self.property_values.clone())
    }
}

/// Decode tool arguments; shape errors are `MalformedParameter`.
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: serde_json::Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| Error::MalformedParameter(format!("{tool}: {e}")))
}

fn values(map: serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, Value> {
    map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

// ============================================================================
// Result envelope
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// `{content: {type: "text", text}, structuredContent}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: ToolContent,
    pub structured_content: serde_json::Value,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(payload: serde_json::Value) -> Self {
        Self {
            content: ToolContent { kind: "text", text: payload.to_string() },
            structured_content: payload,
            is_error: false,
        }
    }

    /// A failed invocation reported to the agent, carrying the error kind.
    pub fn failure(error: &Error) -> Self {
        let message = error.to_string();
        Self {
            content: ToolContent { kind: "text", text: message.clone() },
            structured_content: json!({"kind": error.kind(), "message": message}),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_arguments() {
        let args: CreateNodeArguments = parse_arguments(
            CREATE_NODE_TOOL,
            json!({
                "nodeTypeName": "Example:Text",
                "originDimensionSpacePoint": {"language": "en"},
                "parentNodeAggregateId": "p1",
                "initialPropertyValues": {"text": "hello"},
                "succeedingSiblingNodeAggregateId": "",
            }),
        )
        .unwrap();
        let (point, command) = args.into_command();
        assert_eq!(point, DimensionSpacePoint::new().with("language", "en"));
        assert_eq!(command, CreateNodeCommand::new("p1", "Example:Text").with_property("text", "hello"));
    }

    #[test]
    fn test_missing_argument() {
        let err = parse_arguments::<SetNodePropertiesArguments>(SET_NODE_PROPERTIES_TOOL, json!({"nodeAggregateId": "n"}))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedParameter(msg) if msg.starts_with("SetNodeProperties")));
    }

    #[test]
    fn test_result_envelope() {
        let ok = ToolResult::success(json!({"nodeAggregateId": "n1"}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({
                "content": {"type": "text", "text": "{\"nodeAggregateId\":\"n1\"}"},
                "structuredContent": {"nodeAggregateId": "n1"}
            })
        );

        let failed = ToolResult::failure(&Error::NodeNotFound("n2".into()));
        let failed = serde_json::to_value(&failed).unwrap();
        assert_eq!(failed["isError"], json!(true));
        assert_eq!(failed["structuredContent"]["kind"], json!("NodeNotFound"));
    }

    #[test]
    fn test_tool_schemas_require_dimension_point() {
        for tool in tools() {
            let required = tool.input_schema["required"].as_array().unwrap();
            assert!(required.contains(&json!("originDimensionSpacePoint")));
        }
    }
}
