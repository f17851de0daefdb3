//! Content-addressed image store.
//!
//! Images are deduplicated by a 128-bit content digest, filtered by minimum
//! dimensions, normalized to RGB on a white background, and written once
//! under a filename deterministic in `digest + width + height`. Every
//! failure is reported as an [`ExtractEvent`] and drops only the image.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;

use crate::config::{ExtractOptions, ImageFormat};
use crate::model::{ImageLogEntry, StoredImage};
use crate::report::ExtractEvent;

/// Deduplicating image store for one extraction run.
#[derive(Debug)]
pub struct ImageStore {
    dir: PathBuf,
    seen: HashMap<String, StoredImage>,
    log: Vec<ImageLogEntry>,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seen: HashMap::new(),
            log: Vec::new(),
        }
    }

    /// The image manifest log: one entry per distinct stored image.
    pub fn log(&self) -> &[ImageLogEntry] {
        &self.log
    }

    pub fn into_log(self) -> Vec<ImageLogEntry> {
        self.log
    }

    /// Save image bytes, returning the stored (possibly pre-existing) image.
    ///
    /// Declared dimensions come from markup attributes and win over decoded
    /// ones when present; they also allow rejecting undersized images
    /// without a decode. Returns `None` when the image is filtered out or
    /// cannot be processed; the reason is pushed onto `events`.
    pub fn save(
        &mut self,
        bytes: &[u8],
        source: &str,
        declared_width: Option<u32>,
        declared_height: Option<u32>,
        options: &ExtractOptions,
        events: &mut Vec<ExtractEvent>,
    ) -> Option<StoredImage> {
        let hash = content_digest(bytes);

        if let Some(existing) = self.seen.get(&hash) {
            log::debug!("image digest {hash} already stored as {}", existing.file_name);
            return Some(existing.clone());
        }

        // Fast reject before decoding, using declared attributes or header
        // dimensions when available.
        let sniffed = sniff_dimensions(bytes);
        let early_width = declared_width.or(sniffed.map(|(w, _)| w));
        let early_height = declared_height.or(sniffed.map(|(_, h)| h));
        if let (Some(width), Some(height)) = (early_width, early_height)
            && (width < options.min_image_width || height < options.min_image_height)
        {
            events.push(ExtractEvent::ImageTooSmall {
                source: source.to_string(),
                width,
                height,
            });
            return None;
        }

        let decoded = match image::load_from_memory(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                events.push(ExtractEvent::ImageDecodeFailed {
                    source: source.to_string(),
                    reason: e.to_string(),
                });
                return None;
            }
        };

        let width = declared_width.unwrap_or(decoded.width());
        let height = declared_height.unwrap_or(decoded.height());
        if width < options.min_image_width || height < options.min_image_height {
            events.push(ExtractEvent::ImageTooSmall {
                source: source.to_string(),
                width,
                height,
            });
            return None;
        }

        let normalized = flatten_to_rgb(decoded);
        let file_name = format!("{hash}_{width}x{height}.{}", options.image_format.extension());
        let file_path = self.dir.join(&file_name);

        if file_path.exists() {
            log::debug!("image file already exists, skipping write: {}", file_path.display());
        } else if let Err(e) = self.write_image(&file_path, &normalized, options) {
            events.push(ExtractEvent::ImageWriteFailed {
                source: source.to_string(),
                reason: e.to_string(),
            });
            return None;
        }

        let stored = StoredImage {
            hash: hash.clone(),
            width,
            height,
            file_path,
            file_name: file_name.clone(),
        };
        self.log.push(ImageLogEntry {
            file_name,
            width,
            height,
            source: source.to_string(),
            hash: hash.clone(),
        });
        self.seen.insert(hash, stored.clone());
        Some(stored)
    }

    fn write_image(
        &self,
        path: &std::path::Path,
        img: &image::RgbImage,
        options: &ExtractOptions,
    ) -> std::io::Result<()> {
        let mut encoded = Vec::new();
        let result = match options.image_format {
            ImageFormat::Jpeg => {
                JpegEncoder::new_with_quality(&mut encoded, options.image_quality)
                    .encode_image(img)
            }
            ImageFormat::Png => DynamicImage::ImageRgb8(img.clone())
                .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png),
        };
        result.map_err(std::io::Error::other)?;

        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, &encoded)
    }
}

/// Hex-encoded 128-bit content digest (leading 16 bytes of SHA-1).
pub fn content_digest(bytes: &[u8]) -> String {
    let digest = sha1_smol::Sha1::from(bytes).digest().bytes();
    digest[..16].iter().map(|b| format!("{b:02x}")).collect()
}

/// Composite any alpha channel onto a white background and convert to RGB8.
fn flatten_to_rgb(img: DynamicImage) -> image::RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = image::RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a)) / 255) as u8;
        out.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Parse width/height out of PNG, JPEG, or GIF headers without a full
/// decode. Returns `None` for unrecognized formats.
fn sniff_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    // PNG: width/height at bytes 16-23 in the IHDR chunk
    if data.len() >= 24 && data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        return Some((width, height));
    }

    // JPEG: parse SOF markers
    if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8 {
        return sniff_jpeg_dimensions(data);
    }

    // GIF: width/height at bytes 6-9 (little-endian)
    if data.len() >= 10 && data.starts_with(b"GIF") {
        let width = u16::from_le_bytes([data[6], data[7]]) as u32;
        let height = u16::from_le_bytes([data[8], data[9]]) as u32;
        return Some((width, height));
    }

    None
}

fn sniff_jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF markers (Start of Frame)
        if matches!(
            marker,
            0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE
                | 0xCF
        ) && i + 9 < data.len()
        {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            return Some((width, height));
        }

        if i + 3 < data.len() {
            let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + length;
        } else {
            break;
        }
    }
    None
}
