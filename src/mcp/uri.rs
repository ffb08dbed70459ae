//! URI templates with `{name}` path-segment parameters.
//!
//! Parameters are whole segments and arrive URL-encoded, usually wrapping
//! JSON. Decoding failures are `MalformedParameter`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::model::DimensionSpacePoint;
use crate::projection::PropertyFilter;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    Param(&'static str),
}

/// A parsed template such as `sites://list/{dimensionSpacePoint}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    template: &'static str,
    segments: Vec<Segment>,
}

impl UriTemplate {
    pub fn new(template: &'static str) -> Self {
        let segments = template
            .split('/')
            .map(|part| match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                Some(name) => Segment::Param(name),
                None => Segment::Literal(part),
            })
            .collect();
        Self { template, segments }
    }

    pub fn as_str(&self) -> &'static str {
        self.template
    }

    /// Raw (still encoded) parameter values when `uri` matches.
    pub fn matches(&self, uri: &str) -> Option<BTreeMap<&'static str, String>> {
        let parts: Vec<&str> = uri.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if *literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(*name, part.to_string());
                }
            }
        }
        Some(params)
    }

    /// Fill the parameters in order, URL-encoding each value.
    pub fn expand(&self, values: &[&str]) -> String {
        let mut values = values.iter();
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(literal) => literal.to_string(),
                Segment::Param(_) => values
                    .next()
                    .map(|v| urlencoding::encode(v).into_owned())
                    .unwrap_or_default(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Percent-decode one segment.
pub fn decode_segment(name: &str, raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::MalformedParameter(format!("{name}: {e}")))
}

/// Percent-decode one segment and parse it as JSON.
pub fn decode_json_segment<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T> {
    let decoded = decode_segment(name, raw)?;
    serde_json::from_str(&decoded).map_err(|e| Error::MalformedParameter(format!("{name}: {e}")))
}

/// A dimension space point: a JSON object of dimension → preset key.
pub fn decode_point(name: &str, raw: &str) -> Result<DimensionSpacePoint> {
    decode_json_segment(name, raw)
}

/// `*` (no limit) or a JSON array of property names.
pub fn decode_property_filter(name: &str, raw: &str) -> Result<PropertyFilter> {
    let decoded = decode_segment(name, raw)?;
    if decoded == "*" {
        return Ok(PropertyFilter::All);
    }
    let names: Vec<String> = serde_json::from_str(&decoded)
        .map_err(|e| Error::MalformedParameter(format!("{name}: {e}")))?;
    Ok(PropertyFilter::only(names))
}
