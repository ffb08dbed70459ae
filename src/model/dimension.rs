//! Dimension space points and the preset catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A selection of one preset key per content dimension, as a caller sends it.
///
/// Doubles as the target coordinate of writes: the engine materializes
/// variants at exactly these values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionSpacePoint(pub BTreeMap<String, String>);

impl DimensionSpacePoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dimension: impl Into<String>, preset: impl Into<String>) -> Self {
        self.0.insert(dimension.into(), preset.into());
        self
    }

    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.0.get(dimension).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DimensionSpacePoint {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl std::fmt::Display for DimensionSpacePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

/// Dimension name → fallback chain, most specific value first.
///
/// Only ever used to bind a graph context; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedDimensionValues(pub BTreeMap<String, Vec<String>>);

impl ResolvedDimensionValues {
    pub fn get(&self, dimension: &str) -> Option<&[String]> {
        self.0.get(dimension).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The coordinate variants are stored at: the most specific value of
    /// every fallback chain. Always the first candidate a read checks.
    pub fn origin(&self) -> DimensionSpacePoint {
        self.0
            .iter()
            .filter_map(|(dimension, values)| values.first().map(|value| (dimension.clone(), value.clone())))
            .collect()
    }
}

// ============================================================================
// Preset catalog
// ============================================================================

/// Declared content dimensions and their presets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetCatalog {
    pub dimensions: BTreeMap<String, DimensionDeclaration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DimensionDeclaration {
    pub label: Option<String>,
    pub default_preset: Option<String>,
    /// Declaration order is significant: it drives combination order.
    pub presets: Vec<Preset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    pub key: String,
    pub label: Option<String>,
    /// Fallback chain, most specific first.
    pub values: Vec<String>,
    /// Other dimension → preset key (or `*`) → allowed together with this preset.
    pub constraints: BTreeMap<String, BTreeMap<String, bool>>,
}

impl Preset {
    pub fn new<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Whether this preset may be combined with `other_preset` of `other_dimension`.
    pub fn allows(&self, other_dimension: &str, other_preset: &str) -> bool {
        match self.constraints.get(other_dimension) {
            None => true,
            Some(rules) => rules
                .get(other_preset)
                .or_else(|| rules.get("*"))
                .copied()
                .unwrap_or(true),
        }
    }
}

impl PresetCatalog {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_dimension(mut self, name: impl Into<String>, dimension: DimensionDeclaration) -> Self {
        self.dimensions.insert(name.into(), dimension);
        self
    }

    pub fn dimension(&self, name: &str) -> Option<&DimensionDeclaration> {
        self.dimensions.get(name)
    }

    /// Typed two-level lookup: `None` when either the dimension or the key is undeclared.
    pub fn preset(&self, dimension: &str, key: &str) -> Option<&Preset> {
        self.dimension(dimension)?.presets.iter().find(|p| p.key == key)
    }
}

impl DimensionDeclaration {
    pub fn new(presets: Vec<Preset>) -> Self {
        let default_preset = presets.first().map(|p| p.key.clone());
        Self { label: None, default_preset, presets }
    }
}
