//! Error types for extraction operations.

use thiserror::Error;

/// Fatal errors that abort an extraction run.
///
/// Per-item failures (a bad image, a malformed document) are not errors;
/// they become [`ExtractEvent`](crate::ExtractEvent)s and the run continues.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Empty spine: the book declares no reading order")]
    EmptySpine,

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, Error>;
