//! # Mutation engine
//!
//! Node creation (with tethered children and sibling positioning) and
//! property assignment inside one write context.
//!
//! ## Failure semantics
//!
//! Every supplied property is coerced before anything is written, so a
//! `PropertyCoercionFailed` leaves the graph untouched. Once writing has
//! started, an engine failure leaves the writes before it in place: the
//! engine gives no rollback guarantee, so callers must treat a failed
//! multi-property mutation as possibly partially applied.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::context::GraphContext;
use crate::convert::ConverterRegistry;
use crate::model::node::{generate_node_name, HIDDEN_PROPERTY};
use crate::model::{Node, NodeAggregateId, Value};
use crate::schema::NodeTypeManager;
use crate::storage::ContentBackend;
use crate::{Error, Result};

/// Input of [`create_node`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateNodeCommand {
    pub parent: NodeAggregateId,
    pub node_type_name: String,
    pub initial_properties: BTreeMap<String, Value>,
    pub succeeding_sibling: Option<NodeAggregateId>,
    /// Generated when absent. Not meant for regular editorial nodes.
    pub node_name: Option<String>,
}

impl CreateNodeCommand {
    pub fn new(parent: impl Into<NodeAggregateId>, node_type_name: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            node_type_name: node_type_name.into(),
            initial_properties: BTreeMap::new(),
            succeeding_sibling: None,
            node_name: None,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.initial_properties.insert(name.into(), value.into());
        self
    }

    pub fn before(mut self, sibling: impl Into<NodeAggregateId>) -> Self {
        self.succeeding_sibling = Some(sibling.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.node_name = Some(name.into());
        self
    }
}

/// Identifiers of everything a creation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedNode {
    pub node_aggregate_id: NodeAggregateId,
    /// Direct tethered child name → aggregate id.
    pub tethered_descendant_aggregate_ids: BTreeMap<String, NodeAggregateId>,
}

/// Create a node of `command.node_type_name` below `command.parent`.
pub async fn create_node<B: ContentBackend>(
    ctx: &mut GraphContext<'_, B>,
    types: &NodeTypeManager,
    converters: &ConverterRegistry,
    command: CreateNodeCommand,
) -> Result<CreatedNode> {
    let node_type = types.get_node_type(&command.node_type_name)?;
    if node_type.is_abstract() {
        return Err(Error::ConstraintViolation(format!(
            "\"{}\" is abstract and cannot be instantiated",
            node_type.name()
        )));
    }

    let backend = ctx.backend();
    let parent = backend
        .get_node(ctx.tx(), &command.parent)
        .await?
        .ok_or_else(|| Error::ParentNotFound(format!("{} in {}", command.parent, ctx.config().target_dimensions)))?;
    check_child_allowed(ctx, types, &parent, node_type.name()).await?;

    if let Some(sibling_id) = &command.succeeding_sibling {
        let sibling = backend
            .get_node(ctx.tx(), sibling_id)
            .await?
            .ok_or_else(|| Error::NodeNotFound(format!("succeeding sibling {sibling_id}")))?;
        if sibling.parent.as_ref() != Some(&parent.aggregate_id) {
            return Err(Error::ConstraintViolation(format!(
                "succeeding sibling {sibling_id} is not a child of {}",
                parent.aggregate_id
            )));
        }
    }

    let values = coerce_all(types, converters, node_type.name(), command.initial_properties)?;
    let name = node_name(command.node_name)?;

    let id = NodeAggregateId::generate();
    backend
        .create_node(ctx.tx_mut(), &parent.aggregate_id, id.clone(), &name, node_type.name())
        .await?;
    for (property, value) in values {
        backend.set_node_property(ctx.tx_mut(), &id, &property, value).await?;
    }
    if let Some(sibling_id) = &command.succeeding_sibling {
        backend.move_before(ctx.tx_mut(), &id, sibling_id).await?;
    }

    let mut tethered = BTreeMap::new();
    for child_name in types.tethered_children(node_type.name())?.into_keys() {
        let child = backend
            .get_child_by_name(ctx.tx(), &id, &child_name)
            .await?
            .ok_or_else(|| Error::StorageError(format!("tethered child \"{child_name}\" of {id} was not created")))?;
        tethered.insert(child_name, child.aggregate_id);
    }

    debug!(node = %id, name = %name, node_type = node_type.name(), "node written");
    Ok(CreatedNode { node_aggregate_id: id, tethered_descendant_aggregate_ids: tethered })
}

/// Coerce and assign `values` on an existing node.
pub async fn set_properties<B: ContentBackend>(
    ctx: &mut GraphContext<'_, B>,
    types: &NodeTypeManager,
    converters: &ConverterRegistry,
    id: &NodeAggregateId,
    values: BTreeMap<String, Value>,
) -> Result<()> {
    let backend = ctx.backend();
    let node = backend
        .get_node(ctx.tx(), id)
        .await?
        .ok_or_else(|| Error::NodeNotFound(format!("{id} in {}", ctx.config().target_dimensions)))?;

    let values = coerce_all(types, converters, &node.node_type_name, values)?;
    for (property, value) in values {
        backend.set_node_property(ctx.tx_mut(), id, &property, value).await?;
    }
    Ok(())
}

/// Coerce every value against the declared types of `node_type_name`.
///
/// An undeclared node type (engine-side data the catalog no longer knows)
/// leaves every value as supplied.
fn coerce_all(
    types: &NodeTypeManager,
    converters: &ConverterRegistry,
    node_type_name: &str,
    values: BTreeMap<String, Value>,
) -> Result<Vec<(String, Value)>> {
    let declared = if types.has_node_type(node_type_name) {
        types.effective_properties(node_type_name)?
    } else {
        BTreeMap::new()
    };
    values
        .into_iter()
        .map(|(property, value)| {
            if property == HIDDEN_PROPERTY && !matches!(value, Value::Bool(_)) {
                return Err(Error::PropertyCoercionFailed {
                    message: format!("must be boolean, got {}", value.type_name()),
                    property,
                });
            }
            let property_type = declared.get(&property).map(|d| d.property_type());
            let value = converters.coerce(&property, property_type.as_ref(), value)?;
            Ok((property, value))
        })
        .collect()
}

fn node_name(requested: Option<String>) -> Result<String> {
    match requested {
        None => Ok(generate_node_name()),
        Some(name) if name.is_empty() => Ok(generate_node_name()),
        Some(name) if name.contains('/') => Err(Error::MalformedParameter(format!(
            "node name \"{name}\" must not contain '/'"
        ))),
        Some(name) => Ok(name),
    }
}

/// Tethered parents are governed by the constraints their own parent declares
/// for them; every other parent by its type's constraints.
async fn check_child_allowed<B: ContentBackend>(
    ctx: &GraphContext<'_, B>,
    types: &NodeTypeManager,
    parent: &Node,
    child_type: &str,
) -> Result<()> {
    if !types.has_node_type(&parent.node_type_name) {
        return Ok(());
    }

    let mut allowed = None;
    if let Some(grandparent_id) = &parent.parent {
        if let Some(grandparent) = ctx.backend().get_node(ctx.tx(), grandparent_id).await? {
            if types.has_node_type(&grandparent.node_type_name) {
                allowed = types.allows_grandchild_node_type(&grandparent.node_type_name, &parent.name, child_type)?;
            }
        }
    }
    let allowed = match allowed {
        Some(allowed) => allowed,
        None => types.allows_child_node_type(&parent.node_type_name, child_type)?,
    };

    if allowed {
        Ok(())
    } else {
        Err(Error::ConstraintViolation(format!(
            "\"{child_type}\" is not allowed below {} ({})",
            parent.aggregate_id, parent.node_type_name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_name_generation() {
        assert!(node_name(None).unwrap().starts_with("node-"));
        assert!(node_name(Some(String::new())).unwrap().starts_with("node-"));
        assert_eq!(node_name(Some("main".into())).unwrap(), "main");
        assert!(matches!(node_name(Some("a/b".into())), Err(Error::MalformedParameter(_))));
    }

    #[test]
    fn test_coercion_happens_before_any_write() {
        let types = NodeTypeManager::from_json_str(
            r#"{"T:Event": {"properties": {"date": {"type": "DateTime"}, "title": {}}}}"#,
        )
        .unwrap();
        let converters = ConverterRegistry::default();
        let values = BTreeMap::from([
            ("date".to_string(), Value::from("not a date")),
            ("title".to_string(), Value::from("Launch")),
        ]);
        let err = coerce_all(&types, &converters, "T:Event", values).unwrap_err();
        assert!(matches!(err, Error::PropertyCoercionFailed { property, .. } if property == "date"));
    }

    #[test]
    fn test_undeclared_type_passes_values_through() {
        let types = NodeTypeManager::default();
        let values = BTreeMap::from([("x".to_string(), Value::from("raw"))]);
        let out = coerce_all(&types, &ConverterRegistry::default(), "Gone:Type", values).unwrap();
        assert_eq!(out, vec![("x".to_string(), Value::from("raw"))]);
    }
}
