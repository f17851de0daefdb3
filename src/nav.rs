//! Table-of-contents resolution.
//!
//! Resolution order, first success wins: EPUB3 nav document (manifest item
//! with the `nav` property), EPUB2 NCX (navigation media type), then a probe
//! of conventional filenames. Finding nothing is not an error; the book is
//! extracted without chapter boundaries.
//!
//! Every extracted href is normalized exactly like spine references are
//! (see [`crate::href::normalize_href`]), otherwise chapter markers silently
//! fail to align.

use crate::book::{BookAccessor, ItemKind, ManifestItem};
use crate::dom::{Element, parse_document};
use crate::href::{join_href, normalize_href};
use crate::model::NavEntry;
use crate::report::ExtractEvent;
use crate::walker::collapse_whitespace;

/// Conventional navigation filenames probed when the manifest declares
/// nothing, in priority order.
const NAV_PROBES: &[&str] = &[
    "nav.xhtml",
    "navigation-documents.xhtml",
    "toc.xhtml",
    "toc.ncx",
];

/// Extract the ordered chapter list from the book's navigation.
pub fn extract_chapters(
    book: &dyn BookAccessor,
    lenient: bool,
    events: &mut Vec<ExtractEvent>,
) -> Vec<NavEntry> {
    let Some((item, is_ncx)) = locate_nav_item(book) else {
        log::warn!("no navigation document found");
        events.push(ExtractEvent::NavigationMissing);
        return Vec::new();
    };

    log::debug!(
        "using {} navigation document: {}",
        if is_ncx { "NCX" } else { "nav" },
        item.href
    );

    let bytes = match book.read_item(item) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("failed to read navigation document {}: {e}", item.href);
            events.push(ExtractEvent::NavigationMissing);
            return Vec::new();
        }
    };

    let root = match parse_document(&bytes, lenient) {
        Ok(root) => root,
        Err(e) => {
            log::warn!("failed to parse navigation document {}: {e}", item.href);
            events.push(ExtractEvent::NavigationMissing);
            return Vec::new();
        }
    };

    let base = normalize_href(&item.href);
    let entries = if is_ncx {
        parse_ncx(&root, &base)
    } else {
        parse_nav_document(&root, &base)
    };

    if entries.is_empty() {
        events.push(ExtractEvent::NavigationMissing);
    }
    entries
}

/// Locate the navigation manifest item. Returns the item and whether it is
/// an NCX document.
fn locate_nav_item(book: &dyn BookAccessor) -> Option<(&ManifestItem, bool)> {
    // 1. EPUB3: manifest item flagged with the `nav` property.
    if let Some(item) = book.items().iter().find(|item| item.has_property("nav")) {
        return Some((item, false));
    }

    // 2. EPUB2: NCX media type.
    if let Some(item) = book
        .items()
        .iter()
        .find(|item| item.kind() == ItemKind::Navigation)
    {
        return Some((item, true));
    }

    // 3. Conventional filenames.
    for probe in NAV_PROBES {
        if let Some(item) = book.item_by_href(probe) {
            return Some((item, probe.ends_with(".ncx")));
        }
    }

    None
}

/// Parse an EPUB3 nav document: anchors inside `<nav epub:type="toc">`,
/// falling back to the first `<nav>`, then `<body>`.
fn parse_nav_document(root: &Element, base: &str) -> Vec<NavEntry> {
    let mut navs = Vec::new();
    root.find_all("nav", &mut navs);
    let container = navs
        .iter()
        .find(|nav| nav.attr("type") == Some("toc"))
        .copied()
        .or_else(|| navs.first().copied())
        .or_else(|| root.find("body"))
        .unwrap_or(root);

    let mut anchors = Vec::new();
    container.find_all("a", &mut anchors);

    let mut entries = Vec::new();
    for anchor in anchors {
        let Some(raw) = anchor.attr("href") else {
            continue;
        };
        // A same-document fragment does not start a new chapter.
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let href = normalize_href(&join_href(base, raw));
        if href.is_empty() {
            continue;
        }
        let title = entry_title(&anchor.text(), entries.len());
        entries.push(NavEntry::new(href, title));
    }
    entries
}

/// Parse an EPUB2 NCX: nested `navPoint` nodes flattened depth-first in
/// document order.
fn parse_ncx(root: &Element, base: &str) -> Vec<NavEntry> {
    let mut points = Vec::new();
    root.find_all("navpoint", &mut points);

    let mut entries = Vec::new();
    for point in points {
        let Some(raw) = point.find("content").and_then(|c| c.attr("src")) else {
            continue;
        };
        let href = normalize_href(&join_href(base, raw));
        if href.is_empty() {
            continue;
        }
        let label = point
            .find("navlabel")
            .and_then(|label| label.find("text"))
            .map(|text| text.text())
            .unwrap_or_default();
        let title = entry_title(&label, entries.len());
        entries.push(NavEntry::new(href, title));
    }
    entries
}

fn entry_title(raw: &str, index: usize) -> String {
    let title = collapse_whitespace(raw);
    if title.is_empty() {
        format!("Untitled {}", index + 1)
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::MemoryBook;

    fn chapters(book: &MemoryBook) -> (Vec<NavEntry>, Vec<ExtractEvent>) {
        let mut events = Vec::new();
        let entries = extract_chapters(book, true, &mut events);
        (entries, events)
    }

    const NAV_DOC: &str = r##"<html><body>
<nav epub:type="toc"><ol>
  <li><a href="ch1.xhtml">Chapter 1</a></li>
  <li><a href="ch2.xhtml#sec1">Chapter   2</a></li>
  <li><a href="#local">Same-document anchor</a></li>
  <li><a href="ch%203.xhtml">Chapter 3</a></li>
</ol></nav>
</body></html>"##;

    const NCX_DOC: &str = r#"<?xml version="1.0"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <navMap>
    <navPoint id="part1" playOrder="1">
      <navLabel><text>Part I</text></navLabel>
      <content src="part1.xhtml"/>
      <navPoint id="ch1" playOrder="2">
        <navLabel><text>Chapter 1</text></navLabel>
        <content src="text/ch1.xhtml#top"/>
      </navPoint>
    </navPoint>
    <navPoint id="ch2" playOrder="3">
      <navLabel><text>Chapter 2</text></navLabel>
      <content src="text/ch2.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

    #[test]
    fn test_epub3_nav_document() {
        let mut book = MemoryBook::new();
        book.add_nav_document("OEBPS/nav.xhtml", NAV_DOC);

        let (entries, events) = chapters(&book);

        assert!(events.is_empty());
        assert_eq!(
            entries,
            vec![
                NavEntry::new("OEBPS/ch1.xhtml", "Chapter 1"),
                NavEntry::new("OEBPS/ch2.xhtml", "Chapter 2"),
                NavEntry::new("OEBPS/ch 3.xhtml", "Chapter 3"),
            ]
        );
    }

    #[test]
    fn test_ncx_flattened_depth_first() {
        let mut book = MemoryBook::new();
        book.add_ncx("OEBPS/toc.ncx", NCX_DOC);

        let (entries, events) = chapters(&book);

        assert!(events.is_empty());
        assert_eq!(
            entries,
            vec![
                NavEntry::new("OEBPS/part1.xhtml", "Part I"),
                NavEntry::new("OEBPS/text/ch1.xhtml", "Chapter 1"),
                NavEntry::new("OEBPS/text/ch2.xhtml", "Chapter 2"),
            ]
        );
    }

    #[test]
    fn test_nav_property_preferred_over_ncx() {
        let mut book = MemoryBook::new();
        book.add_ncx("toc.ncx", NCX_DOC);
        book.add_nav_document("nav.xhtml", NAV_DOC);

        let (entries, _) = chapters(&book);
        assert_eq!(entries[0].href, "ch1.xhtml");
    }

    #[test]
    fn test_filename_probe_fallback() {
        let mut book = MemoryBook::new();
        // Declared without the nav property and with a generic media type,
        // so only the filename probe can find it.
        book.add_item(
            crate::book::ManifestItem::new("nav.xhtml", "application/xhtml+xml"),
            NAV_DOC.into(),
        );

        let (entries, _) = chapters(&book);
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_missing_navigation_degrades() {
        let (entries, events) = chapters(&MemoryBook::new());
        assert!(entries.is_empty());
        assert_eq!(events, vec![ExtractEvent::NavigationMissing]);
    }

    #[test]
    fn test_untitled_entries_get_fallback_titles() {
        let mut book = MemoryBook::new();
        book.add_nav_document(
            "nav.xhtml",
            r#"<html><body><nav epub:type="toc"><a href="a.xhtml"> </a></nav></body></html>"#,
        );

        let (entries, _) = chapters(&book);
        assert_eq!(entries, vec![NavEntry::new("a.xhtml", "Untitled 1")]);
    }
}
