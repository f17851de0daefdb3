//! Extraction configuration.

use std::path::PathBuf;

/// Output encoding for stored images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG, re-encoded at [`ExtractOptions::image_quality`].
    Jpeg,
    /// Lossless PNG (quality setting is ignored).
    Png,
}

impl ImageFormat {
    /// File extension used in generated filenames.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

/// Configuration for a single extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Images narrower than this are dropped (filters decorative icons).
    pub min_image_width: u32,
    /// Images shorter than this are dropped.
    pub min_image_height: u32,
    /// Output encoding for stored images.
    pub image_format: ImageFormat,
    /// JPEG quality, 1-100.
    pub image_quality: u8,
    /// Relax end-tag checking for the tag soup real EPUBs contain.
    pub lenient_parser: bool,
    /// Directory where deduplicated images are written.
    pub image_dir: PathBuf,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_image_width: 128,
            min_image_height: 128,
            image_format: ImageFormat::Jpeg,
            image_quality: 95,
            lenient_parser: true,
            image_dir: PathBuf::from("images"),
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum dimensions below which images are dropped.
    pub fn with_min_dimensions(mut self, width: u32, height: u32) -> Self {
        self.min_image_width = width;
        self.min_image_height = height;
        self
    }

    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    pub fn with_image_quality(mut self, quality: u8) -> Self {
        self.image_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = dir.into();
        self
    }

    /// Strict markup parsing: mismatched end tags become per-document
    /// failures instead of being repaired.
    pub fn with_strict_parser(mut self) -> Self {
        self.lenient_parser = false;
        self
    }
}
