//! Book access abstraction.
//!
//! The extraction core never parses the EPUB container itself; it consumes
//! the capability set below. [`crate::epub::EpubBook`] provides the default
//! zip-backed implementation, and [`MemoryBook`] backs the tests.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Coarse classification of a manifest item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A content document (XHTML/HTML).
    Document,
    /// A raster or vector image.
    Image,
    /// A legacy NCX table of contents.
    Navigation,
    /// Anything else (CSS, fonts, audio, ...).
    Other,
}

/// One entry of the book's manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// Href as declared by the package (not normalized).
    pub href: String,
    pub media_type: String,
    /// Space-separated EPUB3 properties (`nav`, `cover-image`, ...).
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn new(href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            media_type: media_type.into(),
            properties: None,
        }
    }

    pub fn with_properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = Some(properties.into());
        self
    }

    /// Whether the item carries the given EPUB3 property.
    pub fn has_property(&self, name: &str) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == name))
    }

    pub fn kind(&self) -> ItemKind {
        let media_type = self.media_type.as_str();
        if media_type == "application/x-dtbncx+xml" {
            ItemKind::Navigation
        } else if media_type == "application/xhtml+xml" || media_type == "text/html" {
            ItemKind::Document
        } else if media_type.starts_with("image/") {
            ItemKind::Image
        } else {
            ItemKind::Other
        }
    }
}

/// Capability set the extraction core consumes.
pub trait BookAccessor {
    /// All manifest items, in declaration order.
    fn items(&self) -> &[ManifestItem];

    /// Look up a manifest item by its declared href (verbatim match).
    fn item_by_href(&self, href: &str) -> Option<&ManifestItem>;

    /// Read an item's raw bytes.
    fn read_item(&self, item: &ManifestItem) -> Result<Vec<u8>>;

    /// Hrefs of the reading order (spine), in order.
    fn spine(&self) -> &[String];
}

/// In-memory [`BookAccessor`] for assembling books programmatically.
#[derive(Debug, Clone, Default)]
pub struct MemoryBook {
    items: Vec<ManifestItem>,
    content: HashMap<String, Vec<u8>>,
    spine: Vec<String>,
}

impl MemoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a manifest item with its content.
    pub fn add_item(&mut self, item: ManifestItem, data: Vec<u8>) {
        self.content.insert(item.href.clone(), data);
        self.items.push(item);
    }

    /// Add an XHTML content document and append it to the spine.
    pub fn add_document(&mut self, href: impl Into<String>, data: impl Into<Vec<u8>>) {
        let href = href.into();
        self.add_item(
            ManifestItem::new(href.clone(), "application/xhtml+xml"),
            data.into(),
        );
        self.spine.push(href);
    }

    /// Add an image resource (media type guessed from the extension).
    pub fn add_image(&mut self, href: impl Into<String>, data: Vec<u8>) {
        let href = href.into();
        let media_type = if href.ends_with(".png") {
            "image/png"
        } else if href.ends_with(".gif") {
            "image/gif"
        } else if href.ends_with(".svg") {
            "image/svg+xml"
        } else {
            "image/jpeg"
        };
        self.add_item(ManifestItem::new(href, media_type), data);
    }

    /// Add an EPUB3 navigation document (not placed in the spine).
    pub fn add_nav_document(&mut self, href: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.add_item(
            ManifestItem::new(href, "application/xhtml+xml").with_properties("nav"),
            data.into(),
        );
    }

    /// Add a legacy NCX table of contents.
    pub fn add_ncx(&mut self, href: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.add_item(
            ManifestItem::new(href, "application/x-dtbncx+xml"),
            data.into(),
        );
    }

    /// Append an href to the spine without adding content.
    pub fn push_spine(&mut self, href: impl Into<String>) {
        self.spine.push(href.into());
    }
}

impl BookAccessor for MemoryBook {
    fn items(&self) -> &[ManifestItem] {
        &self.items
    }

    fn item_by_href(&self, href: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.href == href)
    }

    fn read_item(&self, item: &ManifestItem) -> Result<Vec<u8>> {
        self.content
            .get(&item.href)
            .cloned()
            .ok_or_else(|| Error::InvalidEpub(format!("no content for item: {}", item.href)))
    }

    fn spine(&self) -> &[String] {
        &self.spine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_classification() {
        assert_eq!(
            ManifestItem::new("a.xhtml", "application/xhtml+xml").kind(),
            ItemKind::Document
        );
        assert_eq!(
            ManifestItem::new("a.html", "text/html").kind(),
            ItemKind::Document
        );
        assert_eq!(
            ManifestItem::new("a.png", "image/png").kind(),
            ItemKind::Image
        );
        assert_eq!(
            ManifestItem::new("toc.ncx", "application/x-dtbncx+xml").kind(),
            ItemKind::Navigation
        );
        assert_eq!(
            ManifestItem::new("style.css", "text/css").kind(),
            ItemKind::Other
        );
    }

    #[test]
    fn test_has_property() {
        let item = ManifestItem::new("nav.xhtml", "application/xhtml+xml")
            .with_properties("nav scripted");
        assert!(item.has_property("nav"));
        assert!(item.has_property("scripted"));
        assert!(!item.has_property("cover-image"));
    }

    #[test]
    fn test_memory_book_round_trip() {
        let mut book = MemoryBook::new();
        book.add_document("ch1.xhtml", "<html><body/></html>");
        book.add_image("img/a.png", vec![1, 2, 3]);

        assert_eq!(book.spine(), &["ch1.xhtml".to_string()]);
        let item = book.item_by_href("img/a.png").unwrap();
        assert_eq!(book.read_item(item).unwrap(), vec![1, 2, 3]);
        assert!(book.item_by_href("missing.xhtml").is_none());
    }
}
