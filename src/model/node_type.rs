//! Node type declarations: the schema entries of the type catalog.
//!
//! A declaration holds only what the type itself declares. Inherited
//! configuration and the transitive supertype closure are computed by
//! `crate::schema::NodeTypeManager`, never stored here.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::Value;

/// One entry of the node type catalog, as declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeTypeDeclaration {
    /// Direct supertypes. Accepts a list or a `{name: bool}` map on input.
    #[serde(deserialize_with = "deserialize_super_types")]
    pub super_types: Vec<String>,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub properties: BTreeMap<String, PropertyDeclaration>,
    /// Tethered children: created with every node of this type.
    pub child_nodes: BTreeMap<String, TetheredChildDeclaration>,
    pub constraints: ConstraintDeclaration,
    pub options: NodeTypeOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyDeclaration {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub ui: PropertyUi,
}

impl PropertyDeclaration {
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self { type_name: Some(type_name.into()), ui: PropertyUi::default() }
    }

    /// Declared type, `string` when the declaration leaves it open.
    pub fn property_type(&self) -> PropertyType {
        PropertyType::parse(self.type_name.as_deref().unwrap_or("string"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyUi {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetheredChildDeclaration {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "ConstraintDeclaration::is_empty")]
    pub constraints: ConstraintDeclaration,
}

/// Structural constraints: which node types are allowed as children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstraintDeclaration {
    /// Type name (or `*`) → allowed.
    pub node_types: BTreeMap<String, bool>,
}

impl ConstraintDeclaration {
    pub fn is_empty(&self) -> bool {
        self.node_types.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeTypeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpOptions>,
}

/// Agent-facing presentation of a type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpOptions {
    pub name: Option<String>,
    pub description: Option<String>,
}

fn deserialize_super_types<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SuperTypes {
        List(Vec<String>),
        Map(BTreeMap<String, Option<bool>>),
    }

    Ok(match SuperTypes::deserialize(deserializer)? {
        SuperTypes::List(names) => names,
        SuperTypes::Map(map) => map
            .into_iter()
            .filter(|(_, enabled)| enabled.unwrap_or(false))
            .map(|(name, _)| name)
            .collect(),
    })
}

// ============================================================================
// Semantic property types
// ============================================================================

/// The semantic type a property declaration names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Boolean,
    Integer,
    Float,
    Array,
    DateTime,
    Uri,
    Asset,
    Image,
    AssetList,
    Reference,
    References,
    /// A type this crate has no built-in notion of. Converters may still be
    /// registered for it by name.
    Other(String),
}

impl PropertyType {
    pub fn parse(name: &str) -> Self {
        match name.trim_start_matches('\\') {
            "string" => PropertyType::String,
            "boolean" | "bool" => PropertyType::Boolean,
            "integer" | "int" => PropertyType::Integer,
            "float" | "double" => PropertyType::Float,
            "array" => PropertyType::Array,
            "DateTime" | "DateTimeImmutable" | "DateTimeInterface" => PropertyType::DateTime,
            "Uri" | "uri" => PropertyType::Uri,
            "Asset" => PropertyType::Asset,
            "Image" | "ImageInterface" => PropertyType::Image,
            "array<Asset>" => PropertyType::AssetList,
            "reference" => PropertyType::Reference,
            "references" => PropertyType::References,
            other => PropertyType::Other(other.to_owned()),
        }
    }

    /// Canonical name, also the conversion registry key.
    pub fn name(&self) -> &str {
        match self {
            PropertyType::String => "string",
            PropertyType::Boolean => "boolean",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Array => "array",
            PropertyType::DateTime => "DateTime",
            PropertyType::Uri => "Uri",
            PropertyType::Asset => "Asset",
            PropertyType::Image => "Image",
            PropertyType::AssetList => "array<Asset>",
            PropertyType::Reference => "reference",
            PropertyType::References => "references",
            PropertyType::Other(name) => name,
        }
    }

    /// Scalar types are stored as supplied; structured ones go through the
    /// conversion registry.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            PropertyType::String
                | PropertyType::Boolean
                | PropertyType::Integer
                | PropertyType::Float
                | PropertyType::Array
        )
    }

    /// Whether `value` already is an instance of this (structured) type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (PropertyType::DateTime, Value::DateTime(_)) => true,
            (PropertyType::Uri, Value::Uri(_)) => true,
            (PropertyType::Asset | PropertyType::Image, Value::Asset(_)) => true,
            (PropertyType::AssetList, Value::AssetList(_)) => true,
            (PropertyType::Reference, Value::Reference(_)) => true,
            (PropertyType::References, Value::References(_)) => true,
            (ty, _) => ty.is_scalar(),
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_super_types_as_list_or_map() {
        let a: NodeTypeDeclaration =
            serde_json::from_value(json!({"superTypes": ["A", "B"]})).unwrap();
        assert_eq!(a.super_types, vec!["A", "B"]);

        let b: NodeTypeDeclaration =
            serde_json::from_value(json!({"superTypes": {"A": true, "B": false, "C": null}})).unwrap();
        assert_eq!(b.super_types, vec!["A"]);
    }

    #[test]
    fn test_declaration_defaults() {
        let decl: NodeTypeDeclaration = serde_json::from_value(json!({
            "properties": {"title": {"ui": {"label": "Title"}}}
        }))
        .unwrap();
        assert!(!decl.is_abstract);
        assert_eq!(decl.properties["title"].property_type(), PropertyType::String);
        assert_eq!(decl.properties["title"].ui.label.as_deref(), Some("Title"));
    }

    #[test]
    fn test_property_type_parse() {
        assert_eq!(PropertyType::parse("\\DateTime"), PropertyType::DateTime);
        assert_eq!(PropertyType::parse("array<Asset>"), PropertyType::AssetList);
        assert_eq!(
            PropertyType::parse("Vendor:Money"),
            PropertyType::Other("Vendor:Money".into())
        );
        assert!(PropertyType::String.is_scalar());
        assert!(!PropertyType::Image.is_scalar());
    }

    #[test]
    fn test_accepts() {
        assert!(PropertyType::Image.accepts(&Value::Asset(crate::model::AssetReference::new("x"))));
        assert!(!PropertyType::DateTime.accepts(&Value::from("2024-01-01")));
        assert!(PropertyType::String.accepts(&Value::from(3)));
    }
}
