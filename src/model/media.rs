//! Media assets, collections and tags.

use serde::{Deserialize, Serialize};

/// The fixed set of asset kinds agents can filter by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Document,
    Image,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Audio,
        MediaKind::Document,
        MediaKind::Image,
        MediaKind::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "Audio",
            MediaKind::Document => "Document",
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
        }
    }

    /// Exact, case-sensitive match against the four literals.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub kind: MediaKind,
    pub title: String,
    pub caption: String,
    pub copyright_notice: String,
    /// IANA media type, e.g. `image/jpeg`.
    pub media_type: String,
    /// Stored file name; the repository turns it into a public URI.
    pub filename: String,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Asset {
    pub fn new(
        id: impl Into<String>,
        kind: MediaKind,
        filename: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: String::new(),
            caption: String::new(),
            copyright_notice: String::new(),
            media_type: media_type.into(),
            filename: filename.into(),
            collections: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn in_collection(mut self, collection_id: impl Into<String>) -> Self {
        self.collections.push(collection_id.into());
        self
    }

    pub fn tagged(mut self, tag_id: impl Into<String>) -> Self {
        self.tags.push(tag_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetCollection {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_parse_is_exact() {
        assert_eq!(MediaKind::parse("Image"), Some(MediaKind::Image));
        assert_eq!(MediaKind::parse("image"), None);
        assert_eq!(MediaKind::parse("Font"), None);
    }
}
