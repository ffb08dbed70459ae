//! # Node type catalog
//!
//! [`NodeTypeManager`] owns every declared [`NodeType`]. Each type holds its
//! direct supertypes only; everything inherited (the supertype closure,
//! effective properties, tethered children, constraints) is computed here.
//!
//! The catalog is validated when it is built: unknown supertypes, unknown
//! tethered child types and supertype cycles are rejected with
//! `InvalidNodeTypeCatalog`. Walks still keep a visited set, so diamond
//! inheritance never yields duplicates.

pub mod introspect;

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use tracing::debug;

use crate::model::{
    ConstraintDeclaration, McpOptions, NodeTypeDeclaration, PropertyDeclaration, PropertyType,
    TetheredChildDeclaration,
};
use crate::{Error, Result};

pub use introspect::{introspect, NodeTypeSchema, PropertySchema};

/// Wildcard entry in `constraints.nodeTypes`.
pub const ANY_NODE_TYPE: &str = "*";

/// A named schema entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeType {
    name: String,
    declaration: NodeTypeDeclaration,
}

impl NodeType {
    pub fn new(name: impl Into<String>, declaration: NodeTypeDeclaration) -> Self {
        Self { name: name.into(), declaration }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Own declaration, without anything inherited.
    pub fn declaration(&self) -> &NodeTypeDeclaration {
        &self.declaration
    }

    pub fn is_abstract(&self) -> bool {
        self.declaration.is_abstract
    }

    pub fn declared_super_types(&self) -> &[String] {
        &self.declaration.super_types
    }
}

// ============================================================================
// NodeTypeManager
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct NodeTypeManager {
    types: BTreeMap<String, NodeType>,
}

impl NodeTypeManager {
    /// Build and validate a catalog.
    pub fn from_declarations(declarations: BTreeMap<String, NodeTypeDeclaration>) -> Result<Self> {
        let types: BTreeMap<String, NodeType> = declarations
            .into_iter()
            .map(|(name, declaration)| (name.clone(), NodeType::new(name, declaration)))
            .collect();
        let manager = Self { types };
        manager.validate()?;
        debug!(count = manager.types.len(), "node type catalog loaded");
        Ok(manager)
    }

    /// Parse a JSON catalog: type name → declaration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let declarations: BTreeMap<String, NodeTypeDeclaration> = serde_json::from_str(json)
            .map_err(|e| Error::InvalidNodeTypeCatalog(e.to_string()))?;
        Self::from_declarations(declarations)
    }

    fn validate(&self) -> Result<()> {
        for node_type in self.types.values() {
            for super_type in node_type.declared_super_types() {
                if !self.types.contains_key(super_type) {
                    return Err(Error::InvalidNodeTypeCatalog(format!(
                        "\"{}\" declares unknown supertype \"{super_type}\"",
                        node_type.name
                    )));
                }
            }
            for (child, declaration) in &node_type.declaration.child_nodes {
                if !self.types.contains_key(&declaration.node_type) {
                    return Err(Error::InvalidNodeTypeCatalog(format!(
                        "tethered child \"{child}\" of \"{}\" has unknown type \"{}\"",
                        node_type.name, declaration.node_type
                    )));
                }
            }
        }

        if let Some(super_type) = self.find_cycle(|name| {
            Ok(self.types[name].declared_super_types().iter().map(String::as_str).collect())
        })? {
            return Err(Error::InvalidNodeTypeCatalog(format!(
                "supertype cycle through \"{super_type}\""
            )));
        }
        // Tethered children are created with their parent, so a type may not
        // (even through inheritance) end up tethered below itself.
        if let Some(node_type) = self.find_cycle(|name| {
            Ok(self
                .tethered_children(name)?
                .values()
                .filter_map(|declaration| self.types.get_key_value(&declaration.node_type))
                .map(|(key, _)| key.as_str())
                .collect())
        })? {
            return Err(Error::InvalidNodeTypeCatalog(format!(
                "tethered child cycle through \"{node_type}\""
            )));
        }
        Ok(())
    }

    /// Three-colour DFS over the edges `successors` yields. Returns a type
    /// on the first cycle found.
    fn find_cycle<'a, F>(&'a self, successors: F) -> Result<Option<&'a str>>
    where
        F: Fn(&'a str) -> Result<Vec<&'a str>>,
    {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark { Visiting, Done }
        let mut marks: HashMap<&str, Mark> = HashMap::new();

        for start in self.types.keys() {
            if marks.contains_key(start.as_str()) {
                continue;
            }
            let mut stack: Vec<(&str, Vec<&str>, usize)> = vec![(start.as_str(), successors(start.as_str())?, 0)];
            marks.insert(start.as_str(), Mark::Visiting);
            while let Some((name, next_names, next)) = stack.pop() {
                let Some(&successor) = next_names.get(next) else {
                    marks.insert(name, Mark::Done);
                    continue;
                };
                stack.push((name, next_names, next + 1));
                match marks.get(successor) {
                    Some(Mark::Visiting) => return Ok(Some(successor)),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(successor, Mark::Visiting);
                        stack.push((successor, successors(successor)?, 0));
                    }
                }
            }
        }
        Ok(None)
    }

    pub fn has_node_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn get_node_type(&self, name: &str) -> Result<&NodeType> {
        self.types
            .get(name)
            .ok_or_else(|| Error::UnknownNodeType(name.to_string()))
    }

    /// All types, in name order.
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // ========================================================================
    // Inheritance
    // ========================================================================

    /// Transitive supertype closure of `name`, excluding `name` itself.
    pub fn super_type_names(&self, name: &str) -> Result<BTreeSet<String>> {
        let node_type = self.get_node_type(name)?;
        let mut closure = BTreeSet::new();
        let mut pending: Vec<&str> = node_type.declared_super_types().iter().map(String::as_str).collect();
        while let Some(current) = pending.pop() {
            if !closure.insert(current.to_string()) {
                continue;
            }
            if let Some(super_type) = self.types.get(current) {
                pending.extend(super_type.declared_super_types().iter().map(String::as_str));
            }
        }
        Ok(closure)
    }

    /// Polymorphic type check: `actual` is `filter` or one of its subtypes.
    ///
    /// An undeclared `actual` type only matches itself.
    pub fn is_of_type(&self, actual: &str, filter: &str) -> bool {
        actual == filter
            || self
                .super_type_names(actual)
                .is_ok_and(|closure| closure.contains(filter))
    }

    /// Every type that inherits from `base`, excluding `base` itself.
    pub fn sub_node_types(&self, base: &str, include_abstract: bool) -> Result<Vec<&NodeType>> {
        self.get_node_type(base)?;
        Ok(self
            .types
            .values()
            .filter(|t| t.name != base && (include_abstract || !t.is_abstract()))
            .filter(|t| self.is_of_type(&t.name, base))
            .collect())
    }

    /// Supertypes before subtypes, `name` last, each type once.
    fn linearize(&self, name: &str) -> Result<Vec<&NodeType>> {
        let root = self.get_node_type(name)?;
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        self.linearize_into(root, &mut order, &mut seen);
        Ok(order)
    }

    fn linearize_into<'a>(&'a self, node_type: &'a NodeType, order: &mut Vec<&'a NodeType>, seen: &mut BTreeSet<&'a str>) {
        if !seen.insert(node_type.name.as_str()) {
            return;
        }
        for super_name in node_type.declared_super_types() {
            if let Some(super_type) = self.types.get(super_name) {
                self.linearize_into(super_type, order, seen);
            }
        }
        order.push(node_type);
    }

    /// Distance from `name` to each type in its lineage (itself at 0).
    fn lineage_distances(&self, name: &str) -> BTreeMap<String, usize> {
        let mut distances = BTreeMap::from([(name.to_string(), 0)]);
        let mut queue = VecDeque::from([name.to_string()]);
        while let Some(current) = queue.pop_front() {
            let depth = distances[&current];
            let Some(node_type) = self.types.get(&current) else { continue };
            for super_type in node_type.declared_super_types() {
                if !distances.contains_key(super_type) {
                    distances.insert(super_type.clone(), depth + 1);
                    queue.push_back(super_type.clone());
                }
            }
        }
        distances
    }

    // ========================================================================
    // Effective configuration
    // ========================================================================

    /// Declared plus inherited properties; the closest declaration wins.
    pub fn effective_properties(&self, name: &str) -> Result<BTreeMap<String, PropertyDeclaration>> {
        let mut merged = BTreeMap::new();
        for node_type in self.linearize(name)? {
            for (property, declaration) in &node_type.declaration.properties {
                merged.insert(property.clone(), declaration.clone());
            }
        }
        Ok(merged)
    }

    /// Declared plus inherited tethered children.
    pub fn tethered_children(&self, name: &str) -> Result<BTreeMap<String, TetheredChildDeclaration>> {
        let mut merged = BTreeMap::new();
        for node_type in self.linearize(name)? {
            for (child, declaration) in &node_type.declaration.child_nodes {
                merged.insert(child.clone(), declaration.clone());
            }
        }
        Ok(merged)
    }

    /// Declared plus inherited child constraints.
    pub fn constraints(&self, name: &str) -> Result<ConstraintDeclaration> {
        let mut merged = ConstraintDeclaration::default();
        for node_type in self.linearize(name)? {
            merged.node_types.extend(
                node_type.declaration.constraints.node_types.iter().map(|(k, v)| (k.clone(), *v)),
            );
        }
        Ok(merged)
    }

    /// Agent-facing name and description, field-wise inherited.
    pub fn mcp_options(&self, name: &str) -> Result<McpOptions> {
        let mut merged = McpOptions::default();
        for node_type in self.linearize(name)? {
            if let Some(own) = &node_type.declaration.options.mcp {
                if own.name.is_some() {
                    merged.name = own.name.clone();
                }
                if own.description.is_some() {
                    merged.description = own.description.clone();
                }
            }
        }
        Ok(merged)
    }

    /// Semantic type of `property` on `node_type`; `None` when undeclared.
    pub fn property_type(&self, node_type: &str, property: &str) -> Result<Option<PropertyType>> {
        Ok(self
            .effective_properties(node_type)?
            .get(property)
            .map(PropertyDeclaration::property_type))
    }

    // ========================================================================
    // Child constraints
    // ========================================================================

    /// Whether a node of `child_type` may be created below a node of `parent_type`.
    pub fn allows_child_node_type(&self, parent_type: &str, child_type: &str) -> Result<bool> {
        let constraints = self.constraints(parent_type)?;
        Ok(self.constraints_allow(&constraints, child_type))
    }

    /// Whether a node of `child_type` may be created inside the tethered
    /// child `tethered_name` of a node of `grandparent_type`.
    ///
    /// Returns `None` when `tethered_name` is not a tethered child of that
    /// type or its declaration carries no constraints of its own.
    pub fn allows_grandchild_node_type(
        &self,
        grandparent_type: &str,
        tethered_name: &str,
        child_type: &str,
    ) -> Result<Option<bool>> {
        let tethered = self.tethered_children(grandparent_type)?;
        Ok(tethered
            .get(tethered_name)
            .filter(|declaration| !declaration.constraints.is_empty())
            .map(|declaration| self.constraints_allow(&declaration.constraints, child_type)))
    }

    /// Closest matching lineage entry wins; deny wins a tie; `*` applies
    /// when nothing matches; no constraints at all means unrestricted.
    fn constraints_allow(&self, constraints: &ConstraintDeclaration, child_type: &str) -> bool {
        if constraints.is_empty() {
            return true;
        }
        let distances = self.lineage_distances(child_type);
        let mut best: Option<(usize, bool)> = None;
        for (constrained, allowed) in &constraints.node_types {
            let Some(&distance) = distances.get(constrained) else { continue };
            best = match best {
                Some((d, _)) if d < distance => best,
                Some((d, a)) if d == distance => Some((d, a && *allowed)),
                _ => Some((distance, *allowed)),
            };
        }
        match best {
            Some((_, allowed)) => allowed,
            None => constraints.node_types.get(ANY_NODE_TYPE).copied().unwrap_or(false),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn catalog() -> NodeTypeManager {
        NodeTypeManager::from_json_str(
            r#"{
                "Base:Exposed": {"abstract": true},
                "Base:Content": {
                    "abstract": true,
                    "superTypes": ["Base:Exposed"],
                    "properties": {"_hidden": {"type": "boolean"}, "title": {"ui": {"label": "Title"}}}
                },
                "Base:Titled": {"abstract": true, "superTypes": ["Base:Exposed"]},
                "Example:Text": {
                    "superTypes": {"Base:Content": true, "Base:Titled": true},
                    "properties": {"text": {"type": "string"}, "title": {"type": "string", "ui": {"label": "Headline"}}}
                },
                "Example:Image": {
                    "superTypes": ["Base:Content"],
                    "properties": {"image": {"type": "Image"}}
                },
                "Example:Collection": {"constraints": {"nodeTypes": {"*": true, "Example:Image": false}}},
                "Example:Page": {
                    "superTypes": ["Base:Exposed"],
                    "childNodes": {"main": {"type": "Example:Collection", "constraints": {"nodeTypes": {"Example:Text": true}}}},
                    "constraints": {"nodeTypes": {"Base:Content": false, "Example:Page": true}}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_supertype_closure_diamond() {
        let types = catalog();
        let closure = types.super_type_names("Example:Text").unwrap();
        assert_eq!(
            closure.into_iter().collect::<Vec<_>>(),
            vec!["Base:Content", "Base:Exposed", "Base:Titled"]
        );
    }

    #[test]
    fn test_is_of_type_is_polymorphic() {
        let types = catalog();
        assert!(types.is_of_type("Example:Text", "Example:Text"));
        assert!(types.is_of_type("Example:Text", "Base:Content"));
        assert!(types.is_of_type("Example:Text", "Base:Exposed"));
        assert!(!types.is_of_type("Example:Page", "Base:Content"));
        assert!(types.is_of_type("Unknown:Type", "Unknown:Type"));
        assert!(!types.is_of_type("Unknown:Type", "Base:Content"));
    }

    #[test]
    fn test_sub_node_types_skip_abstract() {
        let types = catalog();
        let names: Vec<&str> = types
            .sub_node_types("Base:Exposed", false)
            .unwrap()
            .into_iter()
            .map(NodeType::name)
            .collect();
        assert_eq!(names, vec!["Example:Image", "Example:Page", "Example:Text"]);

        let with_abstract = types.sub_node_types("Base:Exposed", true).unwrap();
        assert_eq!(with_abstract.len(), 5);
    }

    #[test]
    fn test_effective_properties_own_declaration_wins() {
        let types = catalog();
        let props = types.effective_properties("Example:Text").unwrap();
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["_hidden", "text", "title"]);
        assert_eq!(props["title"].ui.label.as_deref(), Some("Headline"));
        assert_eq!(
            types.property_type("Example:Image", "image").unwrap(),
            Some(PropertyType::Image)
        );
        assert_eq!(types.property_type("Example:Image", "nope").unwrap(), None);
    }

    #[test]
    fn test_child_constraints() {
        let types = catalog();
        assert!(!types.allows_child_node_type("Example:Page", "Example:Text").unwrap());
        assert!(types.allows_child_node_type("Example:Page", "Example:Page").unwrap());
        // No matching entry and no wildcard.
        assert!(!types.allows_child_node_type("Example:Page", "Example:Collection").unwrap());
        assert!(types.allows_child_node_type("Example:Collection", "Example:Text").unwrap());
        assert!(!types.allows_child_node_type("Example:Collection", "Example:Image").unwrap());
        // Unconstrained parent.
        assert!(types.allows_child_node_type("Example:Text", "Example:Page").unwrap());
    }

    #[test]
    fn test_tethered_child_constraints() {
        let types = catalog();
        assert_eq!(types.allows_grandchild_node_type("Example:Page", "main", "Example:Text").unwrap(), Some(true));
        assert_eq!(types.allows_grandchild_node_type("Example:Page", "main", "Example:Image").unwrap(), Some(false));
        assert_eq!(types.allows_grandchild_node_type("Example:Page", "aside", "Example:Text").unwrap(), None);
    }

    #[test]
    fn test_unknown_type() {
        let err = catalog().get_node_type("Nope").unwrap_err();
        assert!(matches!(err, Error::UnknownNodeType(name) if name == "Nope"));
    }

    #[test]
    fn test_rejects_unknown_supertype() {
        let err = NodeTypeManager::from_json_str(r#"{"A": {"superTypes": ["B"]}}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidNodeTypeCatalog(_)));
    }

    #[test]
    fn test_rejects_cycles() {
        let err = NodeTypeManager::from_json_str(
            r#"{"A": {"superTypes": ["B"]}, "B": {"superTypes": ["C"]}, "C": {"superTypes": ["A"]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidNodeTypeCatalog(_)));
    }

    #[test]
    fn test_rejects_self_tethering_types() {
        let err = NodeTypeManager::from_json_str(r#"{"Loop:Box": {"childNodes": {"inner": {"type": "Loop:Box"}}}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidNodeTypeCatalog(ref m) if m.contains("tethered")));

        // Through another type, with the tethered child inherited from a mixin.
        let err = NodeTypeManager::from_json_str(
            r#"{
                "Loop:Mixin": {"abstract": true, "childNodes": {"body": {"type": "Loop:Body"}}},
                "Loop:Page": {"superTypes": ["Loop:Mixin"]},
                "Loop:Body": {"childNodes": {"page": {"type": "Loop:Page"}}}
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidNodeTypeCatalog(_)));
    }

    #[test]
    fn test_shared_tethered_types_are_not_cycles() {
        let types = NodeTypeManager::from_json_str(
            r#"{
                "A": {"childNodes": {"left": {"type": "C"}, "right": {"type": "B"}}},
                "B": {"childNodes": {"main": {"type": "C"}}},
                "C": {}
            }"#,
        );
        assert!(types.is_ok());
    }

    #[test]
    fn test_rejects_unknown_tethered_type() {
        let err = NodeTypeManager::from_json_str(r#"{"A": {"childNodes": {"main": {"type": "B"}}}}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidNodeTypeCatalog(_)));
    }

    #[test]
    fn test_mcp_options_inherit_fieldwise() {
        let types = NodeTypeManager::from_json_str(
            r#"{
                "A": {"options": {"mcp": {"name": "Base", "description": "Shared"}}},
                "B": {"superTypes": ["A"], "options": {"mcp": {"name": "Text"}}}
            }"#,
        )
        .unwrap();
        let options = types.mcp_options("B").unwrap();
        assert_eq!(options.name.as_deref(), Some("Text"));
        assert_eq!(options.description.as_deref(), Some("Shared"));
    }

    proptest! {
        /// Layered catalogs where every type inherits from all types of the
        /// layer below: ancestors are reachable along many paths.
        #[test]
        fn prop_closure_is_complete_and_duplicate_free(widths in prop::collection::vec(1usize..4, 1..5)) {
            let mut declarations = BTreeMap::new();
            let mut below: Vec<String> = Vec::new();
            let mut expected = 0usize;
            for (layer, width) in widths.iter().enumerate() {
                let current: Vec<String> = (0..*width).map(|i| format!("L{layer}:T{i}")).collect();
                for name in &current {
                    declarations.insert(
                        name.clone(),
                        NodeTypeDeclaration { super_types: below.clone(), ..Default::default() },
                    );
                }
                expected += below.len();
                below = current;
            }
            declarations.insert(
                "Leaf".to_string(),
                NodeTypeDeclaration { super_types: below.clone(), ..Default::default() },
            );
            expected += below.len();

            let types = NodeTypeManager::from_declarations(declarations).unwrap();
            let closure = types.super_type_names("Leaf").unwrap();
            prop_assert_eq!(closure.len(), expected);
            prop_assert!(!closure.contains("Leaf"));
        }
    }
}
