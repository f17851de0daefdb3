//! # libretto
//!
//! Structural content extraction for EPUB ebooks.
//!
//! libretto walks a book's markup and produces a normalized, order-preserving
//! model of chapters, paragraphs, and images — a flat stream suitable for
//! machine translation and later reassembly. It is deliberately resilient:
//! malformed markup, duplicate images, inconsistent paths, and missing
//! navigation metadata all degrade gracefully instead of failing the run.
//!
//! ## Quick Start
//!
//! ```no_run
//! use libretto::{ContentItem, EpubBook, ExtractOptions, extract};
//!
//! let book = EpubBook::open("novel.epub")?;
//! let result = extract(&book, &ExtractOptions::default())?;
//!
//! for item in &result.document.items {
//!     match item {
//!         ContentItem::ChapterStart { title, .. } => println!("# {title}"),
//!         ContentItem::Paragraph { text, .. } => println!("{text}"),
//!         ContentItem::Image { file_name, .. } => println!("[image: {file_name}]"),
//!     }
//! }
//!
//! // Every skip/degradation is enumerated so completeness can be assessed.
//! for event in &result.events {
//!     eprintln!("warning: {event}");
//! }
//! # Ok::<(), libretto::Error>(())
//! ```
//!
//! ## Custom book sources
//!
//! The extractor consumes the [`BookAccessor`] trait rather than a concrete
//! container format. [`EpubBook`] is the zip-backed default; [`MemoryBook`]
//! assembles books programmatically (useful for tests and other formats).

pub mod book;
pub mod config;
pub mod dom;
pub mod epub;
pub mod error;
pub mod extract;
pub mod href;
pub mod images;
pub mod model;
pub mod nav;
pub mod report;
pub mod resolve;
pub mod walker;

pub use book::{BookAccessor, ItemKind, ManifestItem, MemoryBook};
pub use config::{ExtractOptions, ImageFormat};
pub use epub::EpubBook;
pub use error::{Error, Result};
pub use extract::{Extraction, extract};
pub use model::{
    ContentItem, ImageLogEntry, NavEntry, ParagraphRole, StoredImage, StructuredDocument,
};
pub use report::ExtractEvent;
