//! Content tree walker.
//!
//! The walker linearizes a document body into paragraphs and images using a
//! text accumulator: inline text piles up in a buffer, and block-level
//! elements flush it as a paragraph both before and after their own
//! (recursive) contents. Every tag name is classified explicitly; unlisted
//! tags are inline and recursed into, with any text merging back into the
//! current buffer while images still flush in position.

use crate::book::BookAccessor;
use crate::config::ExtractOptions;
use crate::dom::{Element, Node};
use crate::images::ImageStore;
use crate::model::{ContentItem, ParagraphRole};
use crate::report::ExtractEvent;
use crate::resolve::resolve_image_source;

/// Mutable extraction state threaded through the walk.
pub struct WalkContext<'a> {
    pub book: &'a dyn BookAccessor,
    pub options: &'a ExtractOptions,
    pub store: &'a mut ImageStore,
    pub events: &'a mut Vec<ExtractEvent>,
}

/// How encountering an element affects the text accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    /// Flushes the buffer, recursed into as a fresh walk.
    Block,
    /// Block whose paragraphs are tagged with a heading role.
    Heading(u8),
    /// Raster image reference.
    ImageTag,
    /// SVG container; embedded `<image>` descendants are processed.
    Svg,
    /// Appends a space to the buffer without flushing.
    LineBreak,
    /// Phonetic annotation rendered inline as `base(reading)`.
    Ruby,
    /// Contents never contribute text (scripts, styles).
    Skip,
    /// Everything else: recursed into, results merged inline.
    Inline,
}

fn classify(name: &str) -> Class {
    match name {
        "h1" => Class::Heading(1),
        "h2" => Class::Heading(2),
        "h3" => Class::Heading(3),
        "h4" => Class::Heading(4),
        "h5" => Class::Heading(5),
        "h6" => Class::Heading(6),
        "p" | "div" | "section" | "article" | "main" | "figure" | "figcaption" | "blockquote"
        | "pre" | "ul" | "ol" | "li" | "dl" | "dt" | "dd" | "table" | "hr" | "header"
        | "footer" | "aside" => Class::Block,
        "img" | "image" => Class::ImageTag,
        "svg" => Class::Svg,
        "br" => Class::LineBreak,
        "ruby" => Class::Ruby,
        "script" | "style" | "head" | "title" => Class::Skip,
        _ => Class::Inline,
    }
}

/// Walk an element's children, emitting paragraphs and images in document
/// order. An element with no text and no images yields an empty vec.
pub fn walk(element: &Element, ctx: &mut WalkContext, base_href: &str) -> Vec<ContentItem> {
    let mut items = Vec::new();
    let mut buffer = String::new();

    for child in &element.children {
        match child {
            Node::Text(text) => buffer.push_str(text),
            Node::Element(el) => match classify(&el.name) {
                Class::Block => {
                    flush(&mut buffer, &mut items);
                    items.extend(walk(el, ctx, base_href));
                    flush(&mut buffer, &mut items);
                }
                Class::Heading(level) => {
                    flush(&mut buffer, &mut items);
                    let mut nested = walk(el, ctx, base_href);
                    for item in &mut nested {
                        if let ContentItem::Paragraph { role, .. } = item {
                            *role = ParagraphRole::Heading(level);
                        }
                    }
                    items.extend(nested);
                    flush(&mut buffer, &mut items);
                }
                Class::ImageTag => {
                    flush(&mut buffer, &mut items);
                    if let Some(item) = process_image(el, ctx, base_href) {
                        items.push(item);
                    }
                }
                Class::Svg => {
                    flush(&mut buffer, &mut items);
                    let mut embedded = Vec::new();
                    el.find_all("image", &mut embedded);
                    for image in embedded {
                        if let Some(item) = process_image(image, ctx, base_href) {
                            items.push(item);
                        }
                    }
                }
                Class::LineBreak => {
                    if !buffer.is_empty() && !buffer.ends_with(char::is_whitespace) {
                        buffer.push(' ');
                    }
                }
                Class::Ruby => buffer.push_str(&render_ruby(el)),
                Class::Skip => {}
                Class::Inline => {
                    for item in walk(el, ctx, base_href) {
                        match item {
                            // Inline text merges back into the current run.
                            ContentItem::Paragraph { text, .. } => buffer.push_str(&text),
                            // Images keep their position even inside
                            // unexpected nesting.
                            image @ ContentItem::Image { .. } => {
                                flush(&mut buffer, &mut items);
                                items.push(image);
                            }
                            other => items.push(other),
                        }
                    }
                }
            },
        }
    }

    flush(&mut buffer, &mut items);
    items
}

/// Flush the accumulator as a body paragraph, dropping empty runs.
fn flush(buffer: &mut String, items: &mut Vec<ContentItem>) {
    let text = collapse_whitespace(buffer);
    buffer.clear();
    if !text.is_empty() {
        items.push(ContentItem::Paragraph {
            text,
            role: ParagraphRole::Body,
        });
    }
}

/// Trim and collapse every internal whitespace run to a single space.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve and store one image element, emitting an item on success.
fn process_image(el: &Element, ctx: &mut WalkContext, base_href: &str) -> Option<ContentItem> {
    let src = image_source(el)?;

    let Some(bytes) = resolve_image_source(ctx.book, src, base_href) else {
        ctx.events.push(ExtractEvent::ImageUnresolved {
            src: src.to_string(),
            doc: base_href.to_string(),
        });
        return None;
    };

    let width = el
        .attr("width")
        .or_else(|| el.attr("data-width"))
        .and_then(parse_dimension);
    let height = el
        .attr("height")
        .or_else(|| el.attr("data-height"))
        .and_then(parse_dimension);

    let source = format!("<{} src=\"{}\"> in {}", el.name, src, base_href);
    let stored = ctx
        .store
        .save(&bytes, &source, width, height, ctx.options, ctx.events)?;

    let alt = match el.attr("alt") {
        Some(alt) if !alt.trim().is_empty() => alt.trim().to_string(),
        _ => format!("Image from {base_href}"),
    };

    Some(ContentItem::Image {
        file_path: stored.file_path,
        file_name: stored.file_name,
        alt,
    })
}

/// Image source attribute, in priority order. `attr("href")` also matches
/// the SVG `xlink:href` form.
fn image_source(el: &Element) -> Option<&str> {
    el.attr("src")
        .or_else(|| el.attr("href"))
        .or_else(|| el.attr("data-src"))
        .filter(|src| !src.is_empty())
}

/// Parse a dimension attribute leniently: `"120"`, `"120px"`, `"120.0"`.
fn parse_dimension(value: &str) -> Option<u32> {
    let trimmed = value.trim().trim_end_matches("px").trim();
    let parsed: f64 = trimmed.parse().ok()?;
    if parsed.is_sign_negative() {
        return None;
    }
    Some(parsed as u32)
}

/// Render a ruby annotation as `base(reading)`, preferring fullwidth
/// parentheses when the markup carries fullwidth `rp` fallbacks.
fn render_ruby(el: &Element) -> String {
    let base = collapse_whitespace(&ruby_base_text(el));
    let reading = el
        .find("rt")
        .map(|rt| collapse_whitespace(&rt.text()))
        .unwrap_or_default();

    if !base.is_empty() && !reading.is_empty() {
        let mut fallbacks = Vec::new();
        el.find_all("rp", &mut fallbacks);
        let fullwidth = fallbacks.iter().any(|rp| rp.text().contains('（'));
        let (open, close) = if fullwidth { ('（', '）') } else { ('(', ')') };
        format!("{base}{open}{reading}{close}")
    } else if !base.is_empty() {
        base
    } else {
        collapse_whitespace(&el.text())
    }
}

/// Base text of a ruby element: everything except `rt`/`rp` subtrees.
fn ruby_base_text(el: &Element) -> String {
    let mut out = String::new();
    for child in &el.children {
        match child {
            Node::Text(text) => out.push_str(text),
            Node::Element(inner) if inner.name != "rt" && inner.name != "rp" => {
                out.push_str(&inner.text());
            }
            Node::Element(_) => {}
        }
    }
    out
}
