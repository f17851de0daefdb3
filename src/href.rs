//! Href normalization and joining.
//!
//! Navigation entries and spine documents are matched by string equality,
//! so both sides must pass through the same normalization: percent-decode,
//! fragment strip, separator normalize, and `./`/`../` prefix removal.

use percent_encoding::percent_decode_str;

/// Normalize a document or asset reference for matching.
///
/// - strips any `#fragment`
/// - percent-decodes (`My%20Book.xhtml` -> `My Book.xhtml`)
/// - converts backslashes to forward slashes
/// - collapses `.` and `..` segments (leading `..` is dropped)
/// - strips any leading `/`
pub fn normalize_href(raw: &str) -> String {
    let without_fragment = raw.split('#').next().unwrap_or("");
    let decoded = percent_decode_str(without_fragment).decode_utf8_lossy();
    let forward = decoded.replace('\\', "/");
    collapse_segments(&forward)
}

/// Join a relative reference against a base document's path.
///
/// URL-join semantics: `join_href("OEBPS/text/ch1.xhtml", "../img/a.png")`
/// yields `OEBPS/img/a.png`. References starting with `/` are taken as
/// root-relative.
pub fn join_href(base: &str, reference: &str) -> String {
    if reference.starts_with('/') {
        return collapse_segments(reference);
    }
    match base.rfind('/') {
        Some(pos) => collapse_segments(&format!("{}/{}", &base[..pos], reference)),
        None => collapse_segments(reference),
    }
}

/// Resolve `.` and `..` path segments, dropping any that escape the root.
fn collapse_segments(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
