//! End-to-end tests for the read path: dimension resolution, traversal,
//! polymorphic type filters and property projection against MemoryBackend.

mod common;

use common::{de, en, graph};
use contentgraph_mcp::{DimensionSpacePoint, Error, NodeAggregateId, PropertyFilter};
use pretty_assertions::assert_eq;
use serde_json::json;

fn ids(records: &[contentgraph_mcp::NodeRecord]) -> Vec<&str> {
    records.iter().map(|r| r.aggregate_id.as_str()).collect()
}

// ============================================================================
// findChildren
// ============================================================================

#[tokio::test]
async fn test_find_children_polymorphic_filter() {
    let graph = graph();
    let children = graph
        .find_children(&en(), &"site-main".into(), "Example:Text", &PropertyFilter::All)
        .await
        .unwrap();
    // The headline is an Example:Text by inheritance.
    assert_eq!(ids(&children), vec!["text-hello", "headline"]);

    let headlines = graph
        .find_children(&en(), &"site-main".into(), "Example:Headline", &PropertyFilter::All)
        .await
        .unwrap();
    assert_eq!(ids(&headlines), vec!["headline"]);
}

#[tokio::test]
async fn test_find_children_is_direct_only() {
    let graph = graph();
    let children = graph
        .find_children(&en(), &"site-home".into(), "ContentGraph.Mcp:Mixin.Exposed", &PropertyFilter::All)
        .await
        .unwrap();
    assert_eq!(ids(&children), vec!["site-main", "page-about"]);
}

// ============================================================================
// findDescendants
// ============================================================================

#[tokio::test]
async fn test_find_descendants_stays_in_subtree() {
    let graph = graph();
    let all = graph
        .find_descendants(&en(), &"site-home".into(), "ContentGraph.Mcp:Mixin.Exposed", &PropertyFilter::All)
        .await
        .unwrap();
    assert_eq!(ids(&all), vec!["site-main", "text-hello", "headline", "page-about", "about-main"]);
    assert!(!ids(&all).contains(&"site-home"));

    let below_about = graph
        .find_descendants(&en(), &"page-about".into(), "ContentGraph.Mcp:Mixin.Exposed", &PropertyFilter::All)
        .await
        .unwrap();
    assert_eq!(ids(&below_about), vec!["about-main"]);
}

#[tokio::test]
async fn test_find_descendants_by_page_type() {
    let graph = graph();
    let pages = graph
        .find_descendants(&en(), &"site-home".into(), "Example:Page", &PropertyFilter::only(["title"]))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&pages).unwrap(),
        json!([{"aggregateId": "page-about", "properties": {"title": "About"}, "nodeTypeName": "Example:Page"}])
    );
}

// ============================================================================
// Projection
// ============================================================================

#[tokio::test]
async fn test_projection_allow_list_and_wildcard() {
    let graph = graph();
    let limited = graph
        .find_children(&en(), &"site-main".into(), "Example:Text", &PropertyFilter::only(["a", "c"]))
        .await
        .unwrap();
    assert_eq!(serde_json::Value::Object(limited[0].properties.clone()), json!({"a": 1, "c": 3}));
    // The headline carries neither property.
    assert!(limited[1].properties.is_empty());

    let all = graph
        .find_children(&en(), &"site-main".into(), "Example:Text", &PropertyFilter::All)
        .await
        .unwrap();
    assert_eq!(
        serde_json::Value::Object(all[0].properties.clone()),
        json!({"a": 1, "b": 2, "c": 3, "text": "Hello"})
    );
}

// ============================================================================
// Dimensions
// ============================================================================

#[tokio::test]
async fn test_fallback_variant_is_visible() {
    let graph = graph();
    let texts = graph
        .find_children(&de(), &"site-main".into(), "Example:Text", &PropertyFilter::only(["text"]))
        .await
        .unwrap();
    // No German variants: the English ones show through the fallback chain.
    assert_eq!(texts[0].properties["text"], json!("Hello"));

    let about = graph.get_node(&de(), &"page-about".into()).await.unwrap();
    assert_eq!(about.get("title"), Some(&contentgraph_mcp::Value::from("Über uns")));
}

#[tokio::test]
async fn test_unknown_preset_is_an_error() {
    let graph = graph();
    let fr = DimensionSpacePoint::new().with("language", "fr");
    let err = graph
        .find_children(&fr, &"site-main".into(), "Example:Text", &PropertyFilter::All)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownDimensionOrPreset(_)));

    let missing = graph
        .find_children(&DimensionSpacePoint::new(), &"site-main".into(), "Example:Text", &PropertyFilter::All)
        .await
        .unwrap_err();
    assert!(matches!(missing, Error::UnknownDimensionOrPreset(_)));
}

// ============================================================================
// Errors and scope
// ============================================================================

#[tokio::test]
async fn test_missing_root_is_node_not_found() {
    let graph = graph();
    let err = graph
        .find_descendants(&en(), &NodeAggregateId::from("nope"), "Example:Text", &PropertyFilter::All)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NodeNotFound(_)));
    assert_eq!(graph.security().active_bypass_count(), 0);
}

#[tokio::test]
async fn test_unknown_filter_type() {
    let graph = graph();
    let err = graph
        .find_children(&en(), &"site-main".into(), "Example:Nope", &PropertyFilter::All)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownNodeType(_)));
}

#[tokio::test]
async fn test_bypass_never_outlives_a_read() {
    let graph = graph();
    for _ in 0..3 {
        graph
            .find_children(&en(), &"site-main".into(), "Example:Text", &PropertyFilter::All)
            .await
            .unwrap();
        assert!(!graph.security().are_authorization_checks_disabled());
    }
}
