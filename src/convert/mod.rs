//! # Property conversion registry
//!
//! Structured property types (date-times, URIs, assets, references) are
//! produced from plain JSON-decoded values by converters registered under
//! the declared type's name. Coercion only runs when the supplied value is
//! not already an instance of the declared type; scalar types are stored
//! as supplied.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::model::{AssetReference, NodeAggregateId, PropertyType, Value};
use crate::{Error, Result};

/// Converts a supplied value into one declared type.
///
/// The error is a human-readable reason; the registry attaches the property name.
pub trait PropertyConverter: Send + Sync {
    fn convert(&self, value: &Value) -> std::result::Result<Value, String>;
}

impl<F> PropertyConverter for F
where
    F: Fn(&Value) -> std::result::Result<Value, String> + Send + Sync,
{
    fn convert(&self, value: &Value) -> std::result::Result<Value, String> {
        self(value)
    }
}

/// Converters keyed by declared type name.
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn PropertyConverter>>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.converters.keys().collect();
        names.sort();
        f.debug_struct("ConverterRegistry").field("types", &names).finish()
    }
}

/// The built-in converters for every structured `PropertyType`.
impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::empty()
            .with(PropertyType::DateTime.name(), to_date_time)
            .with(PropertyType::Uri.name(), to_uri)
            .with(PropertyType::Asset.name(), to_asset)
            .with(PropertyType::Image.name(), to_asset)
            .with(PropertyType::AssetList.name(), to_asset_list)
            .with(PropertyType::Reference.name(), to_reference)
            .with(PropertyType::References.name(), to_references)
    }
}

impl ConverterRegistry {
    /// A registry without any converters.
    pub fn empty() -> Self {
        Self { converters: HashMap::new() }
    }

    pub fn register(&mut self, type_name: impl Into<String>, converter: impl PropertyConverter + 'static) {
        self.converters.insert(type_name.into(), Arc::new(converter));
    }

    pub fn with(mut self, type_name: impl Into<String>, converter: impl PropertyConverter + 'static) -> Self {
        self.register(type_name, converter);
        self
    }

    pub fn has_converter(&self, type_name: &str) -> bool {
        self.converters.contains_key(type_name)
    }

    /// Coerce `value` for `property` declared as `declared`.
    ///
    /// Undeclared properties, scalar types, nulls and values that already
    /// are instances of the declared type pass through unchanged. Everything
    /// else must convert, or the call fails with `PropertyCoercionFailed`;
    /// the raw value is never passed through for a structured type.
    pub fn coerce(&self, property: &str, declared: Option<&PropertyType>, value: Value) -> Result<Value> {
        let Some(declared) = declared else {
            return Ok(value);
        };
        if declared.is_scalar() || value.is_null() || declared.accepts(&value) {
            return Ok(value);
        }
        let failed = |message: String| Error::PropertyCoercionFailed {
            property: property.to_string(),
            message,
        };
        let converter = self
            .converters
            .get(declared.name())
            .ok_or_else(|| failed(format!("no converter for type \"{declared}\"")))?;
        converter
            .convert(&value)
            .map_err(|reason| failed(format!("cannot convert {value} to {declared}: {reason}")))
    }
}

// ============================================================================
// Built-in converters
// ============================================================================

fn to_date_time(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(Value::DateTime(dt));
            }
            for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Ok(Value::DateTime(naive.and_utc().fixed_offset()));
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Value::DateTime(naive.and_utc().fixed_offset()))
                .ok_or_else(|| "not an RFC 3339 date-time or YYYY-MM-DD date".to_string())
        }
        Value::Int(seconds) => DateTime::<Utc>::from_timestamp(*seconds, 0)
            .map(|dt| Value::DateTime(dt.fixed_offset()))
            .ok_or_else(|| "unix timestamp out of range".to_string()),
        other => Err(format!("expected a string or integer, got {}", other.type_name())),
    }
}

fn to_uri(value: &Value) -> std::result::Result<Value, String> {
    let raw = value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {}", value.type_name()))?;
    url::Url::parse(raw)
        .map(|uri| Value::Uri(uri.into()))
        .map_err(|e| e.to_string())
}

fn asset_reference(value: &Value) -> std::result::Result<AssetReference, String> {
    let id = match value {
        Value::String(id) => Some(id.as_str()),
        Value::Map(map) => map
            .get("id")
            .or_else(|| map.get("__identity"))
            .and_then(Value::as_str),
        _ => None,
    };
    match id {
        Some(id) if !id.is_empty() => Ok(AssetReference::new(id)),
        _ => Err(format!(
            "expected an asset id or an object with \"id\", got {}",
            value.type_name()
        )),
    }
}

fn to_asset(value: &Value) -> std::result::Result<Value, String> {
    asset_reference(value).map(Value::Asset)
}

fn to_asset_list(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::List(items) => items
            .iter()
            .map(asset_reference)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::AssetList),
        other => Err(format!("expected a list of assets, got {}", other.type_name())),
    }
}

fn node_reference(value: &Value) -> std::result::Result<NodeAggregateId, String> {
    match value.as_str() {
        Some(id) if !id.is_empty() => Ok(NodeAggregateId::from(id)),
        _ => Err(format!("expected a node aggregate id, got {}", value.type_name())),
    }
}

fn to_reference(value: &Value) -> std::result::Result<Value, String> {
    node_reference(value).map(Value::Reference)
}

fn to_references(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::List(items) => items
            .iter()
            .map(node_reference)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::References),
        other => Err(format!("expected a list of node aggregate ids, got {}", other.type_name())),
    }
}
