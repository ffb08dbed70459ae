//! Resource and resource-template descriptors, URI routing and the uniform
//! response envelope.

use serde::Serialize;

use crate::media::AssetQuery;
use crate::model::{DimensionSpacePoint, NodeAggregateId};
use crate::projection::PropertyFilter;
use crate::{Error, Result};
use super::uri::{decode_point, decode_property_filter, decode_segment, UriTemplate};

pub const MIME_TYPE: &str = "application/json";

pub const FIND_CHILDREN_URI: &str = "contentsubgraph://find-children/{dimensionSpacePoint}/{parentNodeAggregateId}/{nodeTypeName}/{limitToPropertyNames}";
pub const FIND_DESCENDANTS_URI: &str = "contentsubgraph://find-descendants/{dimensionSpacePoint}/{ancestorNodeAggregateId}/{nodeTypeName}/{limitToPropertyNames}";
pub const DIMENSION_SPACE_URI: &str = "dimensionspace://show";
pub const NODE_TYPE_SCHEMA_URI: &str = "nodetypes://schema";
pub const ASSET_COLLECTIONS_URI: &str = "media://find-assetcollections";
pub const TAGS_URI: &str = "media://find-tags";
pub const MEDIA_TYPES_URI: &str = "media://find-types";
pub const FIND_ASSETS_URI: &str = "media://find-assets/{assetCollection}/{tag}/{type}";
pub const LIST_SITES_URI: &str = "sites://list/{dimensionSpacePoint}";

/// Entry of `resources/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
}

/// Entry of `resources/templates/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateDescriptor {
    pub uri_template: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
}

pub fn resources() -> Vec<ResourceDescriptor> {
    let resource = |uri: &'static str, name: &'static str, description: &'static str| ResourceDescriptor {
        uri,
        name,
        description,
        mime_type: MIME_TYPE,
    };
    vec![
        resource(
            DIMENSION_SPACE_URI,
            "dimensionspace",
            "A list of all available dimension space points. Content can be varied across multiple dimensions. \
             Examples for dimensions would be language or market. Each allowed combination of values of such \
             dimensions is called a dimension space point. An example would be {\"market\": \"EU\", \"language\": \"en\"}. \
             Points list the first value of each preset; other resources and tools expect preset keys, which \
             usually but not always match.",
        ),
        resource(
            NODE_TYPE_SCHEMA_URI,
            "nodetype-schema",
            "A list of available node types that can be handled by MCP clients",
        ),
        resource(
            ASSET_COLLECTIONS_URI,
            "find-asset-collections",
            "A list of all available asset collections. Asset collections contain media assets like images, documents etc.",
        ),
        resource(
            TAGS_URI,
            "find-tags",
            "A list of all available tags. Tags can be assigned to media assets like images, documents etc.",
        ),
        resource(MEDIA_TYPES_URI, "find-types", "A list of all available media types."),
    ]
}

pub fn resource_templates() -> Vec<ResourceTemplateDescriptor> {
    let template = |uri_template: &'static str, name: &'static str, description: &'static str| ResourceTemplateDescriptor {
        uri_template,
        name,
        description,
        mime_type: MIME_TYPE,
    };
    vec![
        template(
            FIND_CHILDREN_URI,
            "find-children",
            "A list of all available child nodes of a given parent that are of a given type. This is a rather \
             efficient query; use this if you already know the parent under which you want to search. To reduce \
             response size, you can limit the returned properties to the list of given names in the parameter \
             limitToPropertyNames",
        ),
        template(
            FIND_DESCENDANTS_URI,
            "find-descendants",
            "A list of all available descendant nodes of a given ancestor that are of a given type. This is a \
             rather expensive query; use this if you do not yet know the structure or the parent to search \
             children of. To reduce response size, you can limit the returned properties to the list of given \
             names in the parameter limitToPropertyNames",
        ),
        template(
            FIND_ASSETS_URI,
            "find-assets",
            "A list of all available assets. Can be filtered by asset collection, tag or type. The asset \
             collection and tag parameters are optional and can be set to * if to be ignored. Each parameter has \
             its own resource to determine the available values.",
        ),
        template(LIST_SITES_URI, "list-sites", "A list of all available sites."),
    ]
}

// ============================================================================
// Routing
// ============================================================================

/// A decoded resource read.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRequest {
    FindChildren {
        point: DimensionSpacePoint,
        parent: NodeAggregateId,
        node_type_name: String,
        properties: PropertyFilter,
    },
    FindDescendants {
        point: DimensionSpacePoint,
        ancestor: NodeAggregateId,
        node_type_name: String,
        properties: PropertyFilter,
    },
    DimensionSpace,
    NodeTypeSchema,
    AssetCollections,
    Tags,
    MediaTypes,
    FindAssets(AssetQuery),
    ListSites(DimensionSpacePoint),
}

impl ResourceRequest {
    /// Route `uri` and decode its parameters.
    pub fn parse(uri: &str) -> Result<Self> {
        match uri {
            DIMENSION_SPACE_URI => return Ok(ResourceRequest::DimensionSpace),
            NODE_TYPE_SCHEMA_URI => return Ok(ResourceRequest::NodeTypeSchema),
            ASSET_COLLECTIONS_URI => return Ok(ResourceRequest::AssetCollections),
            TAGS_URI => return Ok(ResourceRequest::Tags),
            MEDIA_TYPES_URI => return Ok(ResourceRequest::MediaTypes),
            _ => {}
        }

        if let Some(p) = UriTemplate::new(FIND_CHILDREN_URI).matches(uri) {
            return Ok(ResourceRequest::FindChildren {
                point: decode_point("dimensionSpacePoint", &p["dimensionSpacePoint"])?,
                parent: decode_segment("parentNodeAggregateId", &p["parentNodeAggregateId"])?.into(),
                node_type_name: decode_segment("nodeTypeName", &p["nodeTypeName"])?,
                properties: decode_property_filter("limitToPropertyNames", &p["limitToPropertyNames"])?,
            });
        }
        if let Some(p) = UriTemplate::new(FIND_DESCENDANTS_URI).matches(uri) {
            return Ok(ResourceRequest::FindDescendants {
                point: decode_point("dimensionSpacePoint", &p["dimensionSpacePoint"])?,
                ancestor: decode_segment("ancestorNodeAggregateId", &p["ancestorNodeAggregateId"])?.into(),
                node_type_name: decode_segment("nodeTypeName", &p["nodeTypeName"])?,
                properties: decode_property_filter("limitToPropertyNames", &p["limitToPropertyNames"])?,
            });
        }
        if let Some(p) = UriTemplate::new(FIND_ASSETS_URI).matches(uri) {
            let query = AssetQuery::from_segments(
                &decode_segment("assetCollection", &p["assetCollection"])?,
                &decode_segment("tag", &p["tag"])?,
                &decode_segment("type", &p["type"])?,
            )?;
            return Ok(ResourceRequest::FindAssets(query));
        }
        if let Some(p) = UriTemplate::new(LIST_SITES_URI).matches(uri) {
            return Ok(ResourceRequest::ListSites(decode_point("dimensionSpacePoint", &p["dimensionSpacePoint"])?));
        }
        Err(Error::UnknownResource(uri.to_string()))
    }

    /// Name and description of the response envelope.
    pub fn envelope_labels(&self) -> (&'static str, &'static str) {
        match self {
            ResourceRequest::FindChildren { .. } => (
                "Child nodes",
                "A list of nodes. The aggregateId identifies a node in the subgraph. The properties field contains \
                 the current state of the properties of that node. The nodeTypeName field contains the name of the \
                 type of that node, for more information see the nodetypes://schema resource.",
            ),
            ResourceRequest::FindDescendants { .. } => (
                "Descendant nodes",
                "A list of nodes. The aggregateId identifies a node in the subgraph. The properties field contains \
                 the current state of the properties of that node. The nodeTypeName field contains the name of the \
                 type of that node, for more information see the nodetypes://schema resource.",
            ),
            ResourceRequest::DimensionSpace => (
                "Dimension Space",
                "A list of all available dimension space points. Each point maps every dimension to the first value \
                 of one preset, which is not necessarily that preset's key.",
            ),
            ResourceRequest::NodeTypeSchema => (
                "Node Type Schema",
                "The list of available node types. The properties field defines all properties that can be set on \
                 a node of that type. The constraints field defines structural restrictions the node type imposes, \
                 e.g. what type children of a node of this type must be of. The tetheredChildren field defines \
                 which child nodes are automatically created under a new node of this type.",
            ),
            ResourceRequest::AssetCollections => (
                "Asset collections",
                "A list of all available asset collections. The id identifies the asset collection and is to be \
                 sent as parameter for subsequent calls.",
            ),
            ResourceRequest::Tags => (
                "Tags",
                "A list of all available tags. The id identifies the tag and is to be sent as parameter for \
                 subsequent calls.",
            ),
            ResourceRequest::MediaTypes => (
                "Media types",
                "A list of all available media types, to be sent as the type parameter of media://find-assets.",
            ),
            ResourceRequest::FindAssets(_) => (
                "Assets",
                "A list of assets. The id identifies the asset if it is to be referenced. The uri can be used to \
                 evaluate the file contents.",
            ),
            ResourceRequest::ListSites(_) => (
                "Sites",
                "A list of sites. The nodeAggregateId identifies the site's root node in the subgraph.",
            ),
        }
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// `{uri, name, description, mimeType, text}`; `text` is the JSON-encoded payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// The concrete URI that was read.
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub text: String,
}

impl ResourceContents {
    pub fn json<T: Serialize + ?Sized>(uri: &str, request: &ResourceRequest, payload: &T) -> Result<Self> {
        let (name, description) = request.envelope_labels();
        Ok(Self {
            uri: uri.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: MIME_TYPE.to_string(),
            text: serde_json::to_string(payload)?,
        })
    }

    /// Decode `text` back into JSON.
    pub fn payload(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaKind;

    #[test]
    fn test_static_routes() {
        assert_eq!(ResourceRequest::parse("dimensionspace://show").unwrap(), ResourceRequest::DimensionSpace);
        assert_eq!(ResourceRequest::parse("media://find-types").unwrap(), ResourceRequest::MediaTypes);
    }

    #[test]
    fn test_find_assets_route() {
        let uri = UriTemplate::new(FIND_ASSETS_URI).expand(&["*", "*", "Image"]);
        assert_eq!(
            ResourceRequest::parse(&uri).unwrap(),
            ResourceRequest::FindAssets(AssetQuery::new(MediaKind::Image))
        );

        let bad = UriTemplate::new(FIND_ASSETS_URI).expand(&["*", "*", "Font"]);
        assert!(matches!(ResourceRequest::parse(&bad), Err(Error::UnsupportedMediaType(_))));
    }

    #[test]
    fn test_find_descendants_route() {
        let uri = UriTemplate::new(FIND_DESCENDANTS_URI).expand(&["{}", "n1", "Example:Text", r#"["title"]"#]);
        let request = ResourceRequest::parse(&uri).unwrap();
        assert_eq!(
            request,
            ResourceRequest::FindDescendants {
                point: DimensionSpacePoint::new(),
                ancestor: "n1".into(),
                node_type_name: "Example:Text".into(),
                properties: PropertyFilter::only(["title"]),
            }
        );
    }

    #[test]
    fn test_unknown_resource() {
        assert!(matches!(ResourceRequest::parse("nodetypes://list"), Err(Error::UnknownResource(_))));
    }

    #[test]
    fn test_descriptors_are_listed() {
        assert_eq!(resources().len(), 5);
        assert_eq!(resource_templates().len(), 4);
        assert!(resources().iter().all(|r| r.mime_type == MIME_TYPE));
    }
}
