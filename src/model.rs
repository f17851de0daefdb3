//! Core data model for extracted documents.

use std::path::PathBuf;

/// Role of a paragraph within the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParagraphRole {
    /// Ordinary body text.
    #[default]
    Body,
    /// Heading with level 1-6. Headings are emitted as paragraphs so
    /// downstream consumers translate them like any other text run.
    Heading(u8),
}

/// One entry in the flat, ordered extraction stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    /// First item belonging to a navigation-declared chapter.
    ChapterStart {
        title: String,
        /// Normalized href of the spine document the chapter starts in.
        href: String,
    },
    /// A contiguous run of inline text collected between block boundaries.
    /// `text` is non-empty, trimmed, and has all internal whitespace runs
    /// collapsed to a single space.
    Paragraph { text: String, role: ParagraphRole },
    /// Reference to a stored, deduplicated image.
    Image {
        file_path: PathBuf,
        file_name: String,
        alt: String,
    },
}

/// The full extraction result: a flat ordered sequence of items.
///
/// Chapters are not nested structurally; a [`ContentItem::ChapterStart`]
/// marks a boundary and grouping is left to the consumer. Content appearing
/// before the first marker is valid leading material ("orphan" content).
#[derive(Debug, Clone, Default)]
pub struct StructuredDocument {
    pub items: Vec<ContentItem>,
}

impl StructuredDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Number of chapter boundaries in the stream.
    pub fn chapter_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, ContentItem::ChapterStart { .. }))
            .count()
    }

    /// All paragraph texts in document order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            ContentItem::Paragraph { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// All image filenames in document order (duplicates share a filename).
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            ContentItem::Image { file_name, .. } => Some(file_name.as_str()),
            _ => None,
        })
    }
}

/// A table-of-contents entry: normalized document href plus title.
///
/// Produced once by navigation resolution and read-only afterwards; the
/// assembler matches spine documents against `href` to place chapter starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub href: String,
    pub title: String,
}

impl NavEntry {
    pub fn new(href: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: title.into(),
        }
    }
}

/// A deduplicated image written by the image store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// 128-bit content digest, hex-encoded.
    pub hash: String,
    pub width: u32,
    pub height: u32,
    pub file_path: PathBuf,
    pub file_name: String,
}

/// One line of the image manifest log (side channel for auditing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLogEntry {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    /// Where the image was referenced from (document href + tag source).
    pub source: String,
    pub hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_accessors() {
        let doc = StructuredDocument {
            items: vec![
                ContentItem::Paragraph {
                    text: "orphan".into(),
                    role: ParagraphRole::Body,
                },
                ContentItem::ChapterStart {
                    title: "One".into(),
                    href: "ch1.xhtml".into(),
                },
                ContentItem::Paragraph {
                    text: "Title".into(),
                    role: ParagraphRole::Heading(1),
                },
                ContentItem::Image {
                    file_path: PathBuf::from("images/abc_10x10.jpg"),
                    file_name: "abc_10x10.jpg".into(),
                    alt: "Image".into(),
                },
            ],
        };

        assert_eq!(doc.len(), 4);
        assert_eq!(doc.chapter_count(), 1);
        assert_eq!(doc.paragraphs().collect::<Vec<_>>(), vec!["orphan", "Title"]);
        assert_eq!(doc.images().collect::<Vec<_>>(), vec!["abc_10x10.jpg"]);
    }
}
