//! Structured extraction events.
//!
//! Recoverable failures never abort a run; each one is recorded as an event
//! so the caller can assess how complete the extracted document is. The
//! event list is owned by the extraction context and returned with the
//! result, replacing hidden ambient logging state.

use std::fmt;

/// One skip or degradation that occurred during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractEvent {
    /// No navigation document was found; chapters are not detected and all
    /// content is extracted without chapter markers.
    NavigationMissing,
    /// A content document could not be read or parsed and was skipped.
    DocumentSkipped { href: String, reason: String },
    /// A spine entry referenced an already-processed document.
    DuplicateSpineEntry { href: String },
    /// A spine entry referenced no manifest item.
    SpineItemMissing { href: String },
    /// An image reference resolved to nothing in the manifest.
    ImageUnresolved { src: String, doc: String },
    /// Image bytes could not be decoded; the image was dropped.
    ImageDecodeFailed { source: String, reason: String },
    /// An image fell below the configured minimum dimensions.
    ImageTooSmall {
        source: String,
        width: u32,
        height: u32,
    },
    /// A decoded image could not be encoded or written to disk.
    ImageWriteFailed { source: String, reason: String },
}

impl fmt::Display for ExtractEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractEvent::NavigationMissing => {
                write!(f, "no navigation document found; chapter detection disabled")
            }
            ExtractEvent::DocumentSkipped { href, reason } => {
                write!(f, "skipped document '{href}': {reason}")
            }
            ExtractEvent::DuplicateSpineEntry { href } => {
                write!(f, "skipped duplicate spine entry '{href}'")
            }
            ExtractEvent::SpineItemMissing { href } => {
                write!(f, "spine references missing manifest item '{href}'")
            }
            ExtractEvent::ImageUnresolved { src, doc } => {
                write!(f, "unresolved image reference '{src}' in '{doc}'")
            }
            ExtractEvent::ImageDecodeFailed { source, reason } => {
                write!(f, "failed to decode image from {source}: {reason}")
            }
            ExtractEvent::ImageTooSmall {
                source,
                width,
                height,
            } => {
                write!(f, "dropped image from {source}: {width}x{height} below minimum")
            }
            ExtractEvent::ImageWriteFailed { source, reason } => {
                write!(f, "failed to write image from {source}: {reason}")
            }
        }
    }
}
