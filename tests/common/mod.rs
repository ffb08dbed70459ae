//! Shared fixture for the end-to-end suites.
//!
//! ```text
//! /sites
//! └── example        site-home   Example:Page        en: {title: "Home"}
//!     ├── main       site-main   Example:ContentCollection (tethered)
//!     │   ├── hello  text-hello  Example:Text        en: {text: "Hello", a, b, c}
//!     │   └── intro  headline    Example:Headline    en: {text: "Welcome", level: 1}
//!     └── about      page-about  Example:Page        en: {title: "About"}, de: {title: "Über uns"}
//!         └── main   about-main  Example:ContentCollection (tethered)
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use contentgraph_mcp::media::MemoryMediaRepository;
use contentgraph_mcp::model::{property_map, Asset, PropertyMap};
use contentgraph_mcp::sites::MemorySiteRepository;
use contentgraph_mcp::storage::NodeSeed;
use contentgraph_mcp::{
    AdapterConfig, ContentGraph, ContentRepositoryMcp, DimensionSpacePoint, MediaKind, MemoryBackend,
    NodeTypeManager, PresetCatalog, Site,
};

pub const WORKSPACE: &str = "user-admin";

pub const NODE_TYPES: &str = r#"{
    "ContentGraph.Mcp:Mixin.Exposed": {"abstract": true},
    "Example:Content": {"abstract": true, "superTypes": ["ContentGraph.Mcp:Mixin.Exposed"]},
    "Example:Text": {
        "superTypes": ["Example:Content"],
        "options": {"mcp": {"name": "Text", "description": "A paragraph of text"}},
        "properties": {"text": {"type": "string", "ui": {"label": "Text"}}}
    },
    "Example:Headline": {
        "superTypes": ["Example:Text"],
        "properties": {"level": {"type": "integer", "ui": {"label": "Level"}}}
    },
    "Example:Event": {
        "superTypes": ["Example:Content"],
        "properties": {
            "title": {"ui": {"label": "Title"}},
            "date": {"type": "DateTime", "ui": {"label": "Date"}},
            "image": {"type": "Image", "ui": {"label": "Image"}}
        }
    },
    "Example:ContentCollection": {
        "superTypes": ["ContentGraph.Mcp:Mixin.Exposed"],
        "constraints": {"nodeTypes": {"*": false, "Example:Content": true}}
    },
    "Example:Page": {
        "superTypes": ["ContentGraph.Mcp:Mixin.Exposed"],
        "properties": {"title": {"ui": {"label": "Title"}}, "_hiddenInMenu": {"type": "boolean"}},
        "childNodes": {"main": {"type": "Example:ContentCollection"}},
        "constraints": {"nodeTypes": {"Example:Page": true}}
    }
}"#;

pub const PRESETS: &str = r#"{
    "language": {
        "defaultPreset": "en",
        "presets": [
            {"key": "en", "label": "English", "values": ["en"]},
            {"key": "de", "label": "Deutsch", "values": ["de", "en"]}
        ]
    }
}"#;

pub fn en() -> DimensionSpacePoint {
    DimensionSpacePoint::new().with("language", "en")
}

pub fn de() -> DimensionSpacePoint {
    DimensionSpacePoint::new().with("language", "de")
}

pub fn graph() -> ContentGraph<MemoryBackend> {
    let node_types = Arc::new(NodeTypeManager::from_json_str(NODE_TYPES).unwrap());
    let presets = Arc::new(PresetCatalog::from_json_str(PRESETS).unwrap());
    let graph = ContentGraph::open_memory(node_types, presets);
    seed(graph.backend());
    graph
}

fn seed(backend: &MemoryBackend) {
    let sites = backend.sites_node_aggregate_id(WORKSPACE).unwrap();
    let insert = |parent: &str, seed: NodeSeed| {
        backend.insert_node(WORKSPACE, &parent.into(), seed).unwrap();
    };
    let everywhere = |id: &str, name: &str, node_type: &str| {
        NodeSeed::new(id, name, node_type).everywhere(PropertyMap::new())
    };

    backend
        .insert_node(
            WORKSPACE,
            &sites,
            NodeSeed::new("site-home", "example", "Example:Page").variant(en(), property_map([("title", "Home")])),
        )
        .unwrap();
    insert("site-home", everywhere("site-main", "main", "Example:ContentCollection"));
    insert(
        "site-main",
        NodeSeed::new("text-hello", "hello", "Example:Text").variant(
            en(),
            property_map([
                ("text", serde_json::json!("Hello")),
                ("a", serde_json::json!(1)),
                ("b", serde_json::json!(2)),
                ("c", serde_json::json!(3)),
            ]),
        ),
    );
    insert(
        "site-main",
        NodeSeed::new("headline", "intro", "Example:Headline").variant(
            en(),
            property_map([("text", serde_json::json!("Welcome")), ("level", serde_json::json!(1))]),
        ),
    );
    insert(
        "site-home",
        NodeSeed::new("page-about", "about", "Example:Page")
            .variant(en(), property_map([("title", "About")]))
            .variant(de(), property_map([("title", "Über uns")])),
    );
    insert("page-about", everywhere("about-main", "main", "Example:ContentCollection"));
}

pub fn media() -> MemoryMediaRepository {
    let media = MemoryMediaRepository::new("https://cdn.example.com/_Resources/Persistent/").unwrap();
    media.add_collection("col-marketing", "Marketing");
    media.add_tag("tag-hero", "Hero");
    media.add_asset(
        Asset::new("img-1", MediaKind::Image, "hero.jpg", "image/jpeg")
            .with_title("Hero")
            .in_collection("col-marketing")
            .tagged("tag-hero"),
    );
    media.add_asset(Asset::new("img-2", MediaKind::Image, "logo.png", "image/png").with_title("Logo"));
    media.add_asset(Asset::new("doc-1", MediaKind::Document, "terms.pdf", "application/pdf").in_collection("col-marketing"));
    media
}

pub fn mcp() -> ContentRepositoryMcp<MemoryBackend> {
    let sites = MemorySiteRepository::new();
    sites.add(Site::new("Example", "example"));
    sites.add(Site::new("Unpublished", "unpublished"));
    ContentRepositoryMcp::new(graph(), Arc::new(media()), Arc::new(sites), AdapterConfig::default())
}
