//! PropertyMap: the key-value store on node variants.

use std::collections::HashMap;
use super::Value;

/// A map of property names to values. Iteration order carries no meaning.
pub type PropertyMap = HashMap<String, Value>;

/// Build a `PropertyMap` from `(name, value)` pairs.
pub fn property_map<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> PropertyMap
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
