//! Universal property value type.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::NodeAggregateId;

/// Property value as stored on a node variant.
///
/// Covers the property types node type schemas declare:
/// - Scalars: Bool, Int, Float, String
/// - Containers: List, Map (untyped JSON-ish structures)
/// - Structured: DateTime, Uri, Asset, AssetList, Reference, References
///
/// Wire payloads arrive as plain JSON and decode into the scalar/container
/// variants only; the structured variants are produced by the conversion
/// registry (`crate::convert`).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),

    // Structured types
    DateTime(DateTime<FixedOffset>),
    Uri(String),
    Asset(AssetReference),
    AssetList(Vec<AssetReference>),
    Reference(NodeAggregateId),
    References(Vec<NodeAggregateId>),
}

/// Pointer to a media asset by its persistence identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetReference {
    pub id: String,
}

impl AssetReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "array",
            Value::Map(_) => "object",
            Value::DateTime(_) => "DateTime",
            Value::Uri(_) => "Uri",
            Value::Asset(_) => "Asset",
            Value::AssetList(_) => "array<Asset>",
            Value::Reference(_) => "reference",
            Value::References(_) => "references",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    /// Attempt to extract as &str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempt to extract as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

// ============================================================================
// JSON bridge
// ============================================================================

impl Value {
    /// Protocol representation of this value.
    ///
    /// Structured values flatten to JSON: date-times as RFC 3339 strings,
    /// URIs and references as strings, assets as `{"id": ...}` objects.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::List(l) => Json::Array(l.iter().map(Value::to_json).collect()),
            Value::Map(m) => Json::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
            Value::Uri(u) => Json::String(u.clone()),
            Value::Asset(a) => serde_json::json!({ "id": a.id }),
            Value::AssetList(list) => Json::Array(
                list.iter().map(|a| serde_json::json!({ "id": a.id })).collect(),
            ),
            Value::Reference(id) => Json::String(id.0.clone()),
            Value::References(ids) => Json::Array(
                ids.iter().map(|id| Json::String(id.0.clone())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Map(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<DateTime<FixedOffset>> for Value { fn from(v: DateTime<FixedOffset>) -> Self { Value::DateTime(v) } }
impl From<AssetReference> for Value { fn from(v: AssetReference) -> Self { Value::Asset(v) } }
impl From<NodeAggregateId> for Value { fn from(v: NodeAggregateId) -> Self { Value::Reference(v) } }

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
