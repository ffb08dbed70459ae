//! # Dimension Resolver
//!
//! Turns a caller's [`DimensionSpacePoint`] (dimension → preset key) into
//! [`ResolvedDimensionValues`] (dimension → fallback chain) through a typed
//! lookup in the [`PresetCatalog`]. Nothing is ever defaulted: an unknown
//! dimension, an unknown preset key, a missing dimension or a forbidden
//! preset combination is an `UnknownDimensionOrPreset` error.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::model::{DimensionSpacePoint, Preset, PresetCatalog, ResolvedDimensionValues};
use crate::{Error, Result};

/// Pure lookup over a shared preset catalog.
#[derive(Debug, Clone)]
pub struct DimensionResolver {
    presets: Arc<PresetCatalog>,
}

impl DimensionResolver {
    pub fn new(presets: Arc<PresetCatalog>) -> Self {
        Self { presets }
    }

    pub fn catalog(&self) -> &PresetCatalog {
        &self.presets
    }

    /// Resolve every dimension of `point` to its preset's fallback chain.
    pub fn resolve(&self, point: &DimensionSpacePoint) -> Result<ResolvedDimensionValues> {
        let mut selected: Vec<(&str, &Preset)> = Vec::with_capacity(point.0.len());
        for (dimension, key) in point.iter() {
            let preset = self.presets.preset(dimension, key).ok_or_else(|| {
                Error::UnknownDimensionOrPreset(format!("dimension \"{dimension}\" has no preset \"{key}\""))
            })?;
            if preset.values.is_empty() {
                return Err(Error::UnknownDimensionOrPreset(format!(
                    "preset \"{key}\" of dimension \"{dimension}\" declares no values"
                )));
            }
            selected.push((dimension.as_str(), preset));
        }

        if let Some(missing) = self.presets.dimensions.keys().find(|d| point.get(d).is_none()) {
            return Err(Error::UnknownDimensionOrPreset(format!(
                "dimension \"{missing}\" is missing from {point}"
            )));
        }
        if !combination_allowed(&selected) {
            return Err(Error::UnknownDimensionOrPreset(format!(
                "{point} is not an allowed preset combination"
            )));
        }

        let resolved = ResolvedDimensionValues(
            selected
                .into_iter()
                .map(|(dimension, preset)| (dimension.to_string(), preset.values.clone()))
                .collect(),
        );
        debug!(point = %point, dimensions = resolved.len(), "resolved dimension space point");
        Ok(resolved)
    }

    /// Every preset combination the catalog allows, first dimension varying slowest.
    ///
    /// A catalog without dimensions has exactly one (empty) combination.
    pub fn allowed_combinations(&self) -> Vec<BTreeMap<String, &Preset>> {
        let mut combinations: Vec<Vec<(&str, &Preset)>> = vec![Vec::new()];
        for (dimension, declaration) in &self.presets.dimensions {
            let mut extended = Vec::with_capacity(combinations.len() * declaration.presets.len());
            for combination in &combinations {
                for preset in &declaration.presets {
                    let mut candidate = combination.clone();
                    candidate.push((dimension.as_str(), preset));
                    if combination_allowed(&candidate) {
                        extended.push(candidate);
                    }
                }
            }
            combinations = extended;
        }
        combinations
            .into_iter()
            .map(|c| c.into_iter().map(|(d, p)| (d.to_string(), p)).collect())
            .collect()
    }

    /// Allowed combinations, each reduced to the first value of every preset.
    ///
    /// These are preset *values*, while [`resolve`](Self::resolve) takes
    /// preset *keys*. A listed point only resolves when every preset in it
    /// uses its first value as its key.
    pub fn dimension_space(&self) -> Vec<BTreeMap<String, String>> {
        self.allowed_combinations()
            .into_iter()
            .map(|combination| {
                combination
                    .into_iter()
                    .filter_map(|(dimension, preset)| preset.values.first().map(|v| (dimension, v.clone())))
                    .collect()
            })
            .collect()
    }
}

/// Pairwise preset constraints, checked in both directions.
fn combination_allowed(selected: &[(&str, &Preset)]) -> bool {
    selected.iter().enumerate().all(|(i, (dimension, preset))| {
        selected[i + 1..].iter().all(|(other_dimension, other)| {
            preset.allows(other_dimension, &other.key) && other.allows(dimension, &preset.key)
        })
    })
}
