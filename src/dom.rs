//! Markup tree parsing.
//!
//! Content documents are parsed into a closed two-variant tree
//! ([`Node::Text`] / [`Node::Element`]) that the walker pattern-matches on.
//! Parsing is event-based via quick-xml; in lenient mode (the default) end
//! tag checking is relaxed so the tag soup found in real EPUBs still yields
//! a usable tree instead of a per-document failure.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};

/// A node in a parsed markup tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Element(Element),
}

/// An element with its (lowercased) local name, attributes, and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Look up an attribute by name. The lookup is namespace-insensitive:
    /// `attr("href")` matches both `href` and `xlink:href`, while
    /// `attr("xlink:href")` matches only the prefixed form.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name || key.rsplit(':').next() == Some(name))
            .map(|(_, value)| value.as_str())
    }

    /// First descendant element with the given local name, depth-first.
    pub fn find(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if let Node::Element(element) = child {
                if element.name == name {
                    return Some(element);
                }
                if let Some(found) = element.find(name) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// All descendant elements with the given local name, in document order.
    pub fn find_all<'a>(&'a self, name: &str, results: &mut Vec<&'a Element>) {
        for child in &self.children {
            if let Node::Element(element) = child {
                if element.name == name {
                    results.push(element);
                }
                element.find_all(name, results);
            }
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(text) => out.push_str(text),
            Node::Element(inner) => collect_text(inner, out),
        }
    }
}

/// HTML void elements: never pushed as open containers, even when the
/// document omits the self-closing slash.
fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "br" | "hr" | "img" | "meta" | "link" | "input" | "col" | "area" | "base" | "wbr"
    )
}

/// Parse a content document into a synthetic root element.
///
/// The returned element is an unnamed container whose children are the
/// document's top-level nodes; callers usually locate `<body>` inside it.
pub fn parse_document(bytes: &[u8], lenient: bool) -> Result<Element> {
    let content = decode_text(strip_bom(bytes), extract_xml_encoding(bytes));
    parse_str(&content, lenient)
}

fn parse_str(content: &str, lenient: bool) -> Result<Element> {
    let mut reader = Reader::from_str(content);
    if lenient {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = element_from_tag(e.name().as_ref(), e.attributes().flatten());
                if is_void_element(&element.name) {
                    push_child(&mut stack, Node::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Ok(Event::Empty(e)) => {
                let element = element_from_tag(e.name().as_ref(), e.attributes().flatten());
                push_child(&mut stack, Node::Element(element));
            }
            Ok(Event::End(e)) => {
                let name = local_name(e.name().as_ref()).to_ascii_lowercase();
                let name = String::from_utf8_lossy(&name);
                if is_void_element(&name) {
                    continue;
                }
                if stack.len() > 1 {
                    let element = stack.pop().unwrap_or_default();
                    push_child(&mut stack, Node::Element(element));
                }
            }
            Ok(Event::Text(e)) => {
                push_text(&mut stack, &String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::CData(e)) => {
                push_text(&mut stack, &String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    push_text(&mut stack, &resolved);
                }
            }
            Ok(Event::Comment(_))
            | Ok(Event::Decl(_))
            | Ok(Event::PI(_))
            | Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => {
                if lenient {
                    log::debug!("lenient parse stopped early: {e}");
                    break;
                }
                return Err(Error::Xml(e));
            }
        }
    }

    // Unclosed elements at EOF: fold each open element into its parent.
    while stack.len() > 1 {
        let element = stack.pop().unwrap_or_default();
        push_child(&mut stack, Node::Element(element));
    }

    Ok(stack.pop().unwrap_or_default())
}

fn element_from_tag<'a>(
    name: &[u8],
    attrs: impl Iterator<Item = quick_xml::events::attributes::Attribute<'a>>,
) -> Element {
    let mut element = Element {
        name: String::from_utf8_lossy(&local_name(name).to_ascii_lowercase()).into_owned(),
        ..Default::default()
    };
    for attr in attrs {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        element.attrs.push((key, value));
    }
    element
}

fn push_child(stack: &mut Vec<Element>, node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn push_text(stack: &mut Vec<Element>, text: &str) {
    if let Some(parent) = stack.last_mut() {
        // Merge adjacent text (entity refs split text into multiple events).
        if let Some(Node::Text(existing)) = parent.children.last_mut() {
            existing.push_str(text);
        } else {
            parent.children.push(Node::Text(text.to_string()));
        }
    }
}

/// Extract the local part of a namespaced XML name (`dc:title` -> `title`).
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve XML/HTML entity references the documents commonly use.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

/// Decode bytes to a string: UTF-8 first, then the hint encoding from the
/// XML declaration, then Windows-1252 (common in old ebooks).
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the encoding name from an `<?xml ... encoding="..."?>` declaration.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    if after_enc.is_empty() {
        return None;
    }

    let quote = after_enc[0];
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}
