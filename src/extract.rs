//! Document assembly.
//!
//! Drives navigation resolution and the content walker across the book's
//! reading order, inserting chapter-boundary markers where spine documents
//! match navigation entries. One pass, strictly sequential: chapter context
//! and the image dedup set both depend on spine order.

use std::collections::{HashMap, HashSet};

use crate::book::{BookAccessor, ItemKind, ManifestItem};
use crate::config::ExtractOptions;
use crate::dom::parse_document;
use crate::error::{Error, Result};
use crate::href::normalize_href;
use crate::images::ImageStore;
use crate::model::{ContentItem, ImageLogEntry, StructuredDocument};
use crate::nav;
use crate::report::ExtractEvent;
use crate::walker::{WalkContext, walk};

/// Result of one extraction run.
#[derive(Debug)]
pub struct Extraction {
    /// The flat, ordered document model.
    pub document: StructuredDocument,
    /// Image manifest log: one entry per distinct stored image.
    pub image_log: Vec<ImageLogEntry>,
    /// Every skip and degradation that occurred, in order.
    pub events: Vec<ExtractEvent>,
}

/// Extract a structured document from a book.
///
/// Always best-effort: per-item failures (bad image, malformed document)
/// are reported in [`Extraction::events`] and skipped. The only fatal
/// conditions are an unopenable book (the accessor's concern) and an empty
/// spine.
///
/// # Example
///
/// ```no_run
/// use libretto::{EpubBook, ExtractOptions, extract};
///
/// let book = EpubBook::open("book.epub")?;
/// let result = extract(&book, &ExtractOptions::default())?;
/// for text in result.document.paragraphs() {
///     println!("{text}");
/// }
/// # Ok::<(), libretto::Error>(())
/// ```
pub fn extract(book: &dyn BookAccessor, options: &ExtractOptions) -> Result<Extraction> {
    if book.spine().is_empty() {
        return Err(Error::EmptySpine);
    }

    let mut events = Vec::new();
    let mut store = ImageStore::new(&options.image_dir);
    let mut items: Vec<ContentItem> = Vec::new();

    let chapters = nav::extract_chapters(book, options.lenient_parser, &mut events);
    let chapter_titles: HashMap<&str, &str> = chapters
        .iter()
        .map(|entry| (entry.href.as_str(), entry.title.as_str()))
        .collect();
    log::info!("navigation declares {} chapters", chapters.len());

    let mut visited: HashSet<String> = HashSet::new();

    for spine_href in book.spine() {
        let Some(item) = book.item_by_href(spine_href) else {
            events.push(ExtractEvent::SpineItemMissing {
                href: spine_href.clone(),
            });
            continue;
        };

        if item.kind() != ItemKind::Document {
            log::debug!("skipping non-document spine item: {}", item.href);
            continue;
        }

        let href = normalize_href(&item.href);
        if !visited.insert(href.clone()) {
            events.push(ExtractEvent::DuplicateSpineEntry { href });
            continue;
        }

        if let Some(title) = chapter_titles.get(href.as_str()) {
            log::debug!("chapter start '{title}' at {href}");
            items.push(ContentItem::ChapterStart {
                title: (*title).to_string(),
                href: href.clone(),
            });
        }

        if let Err(reason) = process_document(book, item, &href, options, &mut store, &mut events, &mut items)
        {
            log::warn!("skipping document {href}: {reason}");
            events.push(ExtractEvent::DocumentSkipped { href, reason });
        }
    }

    log::info!(
        "extraction complete: {} items, {} images, {} events",
        items.len(),
        store.log().len(),
        events.len()
    );

    Ok(Extraction {
        document: StructuredDocument { items },
        image_log: store.into_log(),
        events,
    })
}

/// Parse and walk one spine document, appending its items.
///
/// Returns a failure reason instead of an [`Error`]: a single bad document
/// never aborts the run.
fn process_document(
    book: &dyn BookAccessor,
    item: &ManifestItem,
    href: &str,
    options: &ExtractOptions,
    store: &mut ImageStore,
    events: &mut Vec<ExtractEvent>,
    items: &mut Vec<ContentItem>,
) -> std::result::Result<(), String> {
    let bytes = book.read_item(item).map_err(|e| e.to_string())?;
    let root = parse_document(&bytes, options.lenient_parser).map_err(|e| e.to_string())?;

    // Walk <body> when present; documents without one still degrade to
    // walking whatever exists.
    let target = root.find("body").unwrap_or(&root);

    let mut ctx = WalkContext {
        book,
        options,
        store,
        events,
    };
    items.extend(walk(target, &mut ctx, href));
    Ok(())
}
