//! Image source resolution.
//!
//! References found in content documents rarely match the manifest exactly:
//! they may be data URIs, percent-encoded, relative to the document, or
//! written against a different root folder than the manifest declares. The
//! resolver is an ordered chain of strategies; the first one that yields
//! bytes wins, and total failure is `None`, not an error.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::book::BookAccessor;
use crate::href::{join_href, normalize_href};

/// Root folders commonly used by EPUB packagers. Tried as prefixes when a
/// reference resolves nowhere else, to tolerate manifests with inconsistent
/// path normalization.
const COMMON_ROOTS: &[&str] = &["OEBPS", "OPS", "EPUB", "Text", "text", "Images", "images"];

/// Resolve a raw image reference against the book, in priority order:
/// data URI, verbatim manifest lookup, relative to the referencing document,
/// then common root-folder prefixes.
pub fn resolve_image_source(
    book: &dyn BookAccessor,
    raw: &str,
    base_href: &str,
) -> Option<Vec<u8>> {
    if raw.starts_with("data:") {
        return decode_data_uri(raw);
    }
    lookup_verbatim(book, raw)
        .or_else(|| lookup_relative(book, raw, base_href))
        .or_else(|| lookup_common_roots(book, raw))
}

/// Strategy 1: inline `data:` URI with a base64 payload.
pub(crate) fn decode_data_uri(raw: &str) -> Option<Vec<u8>> {
    let (header, payload) = raw.split_once(',')?;
    if !header.contains(";base64") {
        return None;
    }
    // Data URIs wrapped across lines are legal; strip the whitespace.
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64.decode(compact.as_bytes()).ok()
}

/// Strategy 2: the reference already names a manifest item.
pub(crate) fn lookup_verbatim(book: &dyn BookAccessor, raw: &str) -> Option<Vec<u8>> {
    read_candidate(book, raw)
}

/// Strategy 3: resolve relative to the referencing document's directory.
pub(crate) fn lookup_relative(
    book: &dyn BookAccessor,
    raw: &str,
    base_href: &str,
) -> Option<Vec<u8>> {
    let joined = join_href(&normalize_href(base_href), raw);
    read_candidate(book, &joined)
}

/// Strategy 4: retry under common content-root prefixes.
pub(crate) fn lookup_common_roots(book: &dyn BookAccessor, raw: &str) -> Option<Vec<u8>> {
    let bare = normalize_href(raw);
    if bare.is_empty() {
        return None;
    }
    for root in COMMON_ROOTS {
        if let Some(bytes) = read_candidate(book, &format!("{root}/{bare}")) {
            return Some(bytes);
        }
    }
    None
}

/// Try one candidate reference: verbatim first, then by comparing
/// normalized hrefs against every manifest item.
fn read_candidate(book: &dyn BookAccessor, candidate: &str) -> Option<Vec<u8>> {
    if let Some(item) = book.item_by_href(candidate) {
        return book.read_item(item).ok();
    }

    let normalized = normalize_href(candidate);
    if normalized.is_empty() {
        return None;
    }
    let item = book
        .items()
        .iter()
        .find(|item| normalize_href(&item.href) == normalized)?;
    book.read_item(item).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::MemoryBook;

    fn book_with(href: &str, data: &[u8]) -> MemoryBook {
        let mut book = MemoryBook::new();
        book.add_image(href, data.to_vec());
        book
    }

    #[test]
    fn test_data_uri() {
        // "hi" in base64
        let bytes = decode_data_uri("data:image/png;base64,aGk=").unwrap();
        assert_eq!(bytes, b"hi");

        // Not base64-encoded
        assert!(decode_data_uri("data:image/svg+xml,<svg/>").is_none());

        // Whitespace-wrapped payload
        let bytes = decode_data_uri("data:image/png;base64,aG\n k=").unwrap();
        assert_eq!(bytes, b"hi");
    }

    #[test]
    fn test_verbatim() {
        let book = book_with("images/a.png", b"png-bytes");
        assert_eq!(
            lookup_verbatim(&book, "images/a.png").unwrap(),
            b"png-bytes"
        );
        assert!(lookup_verbatim(&book, "images/b.png").is_none());
    }

    #[test]
    fn test_verbatim_percent_encoded() {
        let book = book_with("images/cover art.png", b"bytes");
        assert_eq!(
            lookup_verbatim(&book, "images/cover%20art.png").unwrap(),
            b"bytes"
        );
    }

    #[test]
    fn test_relative_to_document() {
        let book = book_with("OEBPS/images/a.png", b"bytes");
        assert_eq!(
            lookup_relative(&book, "../images/a.png", "OEBPS/text/ch1.xhtml").unwrap(),
            b"bytes"
        );
        assert_eq!(
            lookup_relative(&book, "images/a.png", "OEBPS/ch1.xhtml").unwrap(),
            b"bytes"
        );
    }

    #[test]
    fn test_common_roots() {
        let book = book_with("OEBPS/cover.jpg", b"bytes");
        assert_eq!(lookup_common_roots(&book, "cover.jpg").unwrap(), b"bytes");
        assert!(lookup_common_roots(&book, "missing.jpg").is_none());
    }

    #[test]
    fn test_chain_priority_and_fallthrough() {
        let book = book_with("Text/pic.png", b"bytes");
        // Neither verbatim nor relative resolves; the root fallback does.
        assert_eq!(
            resolve_image_source(&book, "pic.png", "chapter.xhtml").unwrap(),
            b"bytes"
        );
        assert!(resolve_image_source(&book, "nope.png", "chapter.xhtml").is_none());
    }
}
