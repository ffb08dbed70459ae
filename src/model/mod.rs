//! # Content Graph Model
//!
//! DTOs that cross every boundary: engine ↔ context ↔ traversal ↔ protocol.
//!
//! Design rule: this module is pure data: no I/O, no state, no async.
//! Engine-specific bookkeeping (variants, workspaces) stays in `storage`.

pub mod node;
pub mod value;
pub mod property_map;
pub mod node_type;
pub mod dimension;
pub mod media;
pub mod site;

pub use node::{Node, NodeAggregateId};
pub use value::{Value, AssetReference};
pub use property_map::{PropertyMap, property_map};
pub use node_type::{
    NodeTypeDeclaration, PropertyDeclaration, PropertyType, PropertyUi,
    TetheredChildDeclaration, ConstraintDeclaration, NodeTypeOptions, McpOptions,
};
pub use dimension::{
    DimensionSpacePoint, ResolvedDimensionValues,
    PresetCatalog, DimensionDeclaration, Preset,
};
pub use media::{Asset, AssetCollection, Tag, MediaKind};
pub use site::Site;
