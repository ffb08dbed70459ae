//! Schema introspection for agents.
//!
//! Every non-abstract subtype of the exposure marker type is described with
//! its effective configuration. Internal (`_`-prefixed) properties are left out.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::node::is_internal_property;
use crate::model::{ConstraintDeclaration, TetheredChildDeclaration};
use crate::Result;
use super::NodeTypeManager;

/// One entry of the `nodetypes://schema` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeSchema {
    pub name: Option<String>,
    pub description: Option<String>,
    pub properties: BTreeMap<String, PropertySchema>,
    /// Transitive supertype closure, sorted.
    pub supertypes: Vec<String>,
    pub constraints: ConstraintDeclaration,
    pub tethered_children: BTreeMap<String, TetheredChildDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub type_name: String,
    pub label: String,
}

/// Describe every concrete type below `marker`, keyed by type name.
///
/// Fails with `UnknownNodeType` when `marker` itself is not declared.
pub fn introspect(types: &NodeTypeManager, marker: &str) -> Result<BTreeMap<String, NodeTypeSchema>> {
    let mut schema = BTreeMap::new();
    for node_type in types.sub_node_types(marker, false)? {
        let name = node_type.name();
        let options = types.mcp_options(name)?;
        let properties = types
            .effective_properties(name)?
            .into_iter()
            .filter(|(property, _)| !is_internal_property(property))
            .map(|(property, declaration)| {
                let schema = PropertySchema {
                    type_name: declaration.type_name.clone().unwrap_or_else(|| "string".to_string()),
                    label: declaration.ui.label.clone().unwrap_or_default(),
                };
                (property, schema)
            })
            .collect();

        schema.insert(
            name.to_string(),
            NodeTypeSchema {
                name: options.name,
                description: options.description,
                properties,
                supertypes: types.super_type_names(name)?.into_iter().collect(),
                constraints: types.constraints(name)?,
                tethered_children: types.tethered_children(name)?,
            },
        );
    }
    Ok(schema)
}
