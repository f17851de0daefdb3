//! Zip-backed book access.
//!
//! [`EpubBook`] opens an EPUB container and exposes its manifest and spine
//! through the [`BookAccessor`] trait. This is the only place that touches
//! the container format; the extraction core works purely against the trait.

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::book::{BookAccessor, ManifestItem};
use crate::error::{Error, Result};
use crate::href::normalize_href;

/// An EPUB opened from a zip container, with manifest contents loaded
/// eagerly so subsequent reads are infallible lookups.
#[derive(Debug, Clone)]
pub struct EpubBook {
    items: Vec<ManifestItem>,
    content: HashMap<String, Vec<u8>>,
    spine: Vec<String>,
}

impl EpubBook {
    /// Open an EPUB file from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Open an EPUB from any `Read + Seek` source (e.g. an in-memory buffer).
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let opf_path = find_opf_path(&mut archive)?;
        let opf_dir = match opf_path.rfind('/') {
            Some(pos) => opf_path[..pos].to_string(),
            None => String::new(),
        };

        let opf_content = read_archive_string(&mut archive, &opf_path)?;
        let package = parse_opf(&opf_content)?;

        let mut content = HashMap::new();
        for item in &package.manifest {
            let path = archive_path(&opf_dir, &item.href);
            match read_archive_bytes(&mut archive, &path) {
                Ok(bytes) => {
                    content.insert(item.href.clone(), bytes);
                }
                Err(e) => {
                    log::warn!("manifest item '{}' not readable at '{path}': {e}", item.href);
                }
            }
        }

        let mut spine = Vec::new();
        for id in &package.spine_ids {
            match package.href_for_id(id) {
                Some(href) => spine.push(href.to_string()),
                None => log::warn!("spine references unknown manifest id '{id}'"),
            }
        }

        Ok(Self {
            items: package.manifest,
            content,
            spine,
        })
    }
}

impl BookAccessor for EpubBook {
    fn items(&self) -> &[ManifestItem] {
        &self.items
    }

    fn item_by_href(&self, href: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.href == href)
    }

    fn read_item(&self, item: &ManifestItem) -> Result<Vec<u8>> {
        self.content
            .get(&item.href)
            .cloned()
            .ok_or_else(|| Error::InvalidEpub(format!("no content for item: {}", item.href)))
    }

    fn spine(&self) -> &[String] {
        &self.spine
    }
}

/// Parsed OPF package: manifest in declaration order plus spine ids.
struct PackageData {
    manifest: Vec<ManifestItem>,
    ids: Vec<String>,
    spine_ids: Vec<String>,
}

impl PackageData {
    fn href_for_id(&self, id: &str) -> Option<&str> {
        self.ids
            .iter()
            .position(|candidate| candidate == id)
            .map(|index| self.manifest[index].href.as_str())
    }
}

/// Zip entry path for a manifest href: joined to the OPF directory,
/// percent-decoded, and normalized.
fn archive_path(opf_dir: &str, href: &str) -> String {
    if opf_dir.is_empty() {
        normalize_href(href)
    } else {
        normalize_href(&format!("{opf_dir}/{href}"))
    }
}

/// Parse META-INF/container.xml to find the OPF path.
fn find_opf_path<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let container = read_archive_string(archive, "META-INF/container.xml")?;

    let mut reader = Reader::from_str(&container);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"rootfile" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(String::from_utf8(attr.value.to_vec())?);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "No rootfile found in container.xml".into(),
    ))
}

/// Parse the OPF package document into manifest and spine.
fn parse_opf(content: &str) -> Result<PackageData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut manifest = Vec::new();
    let mut ids = Vec::new();
    let mut spine_ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"item" => {
                        let mut id = String::new();
                        let mut href = String::new();
                        let mut media_type = String::new();
                        let mut properties: Option<String> = None;

                        for attr in e.attributes().flatten() {
                            let value = String::from_utf8(attr.value.to_vec())?;
                            match attr.key.as_ref() {
                                b"id" => id = value,
                                b"href" => href = value,
                                b"media-type" => media_type = value,
                                b"properties" => properties = Some(value),
                                _ => {}
                            }
                        }

                        if !id.is_empty() && !href.is_empty() {
                            let mut item = ManifestItem::new(href, media_type);
                            item.properties = properties;
                            manifest.push(item);
                            ids.push(id);
                        }
                    }
                    b"itemref" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"idref" {
                                spine_ids.push(String::from_utf8(attr.value.to_vec())?);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(PackageData {
        manifest,
        ids,
        spine_ids,
    })
}

/// Extract local name from a namespaced XML name (`opf:item` -> `item`).
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

fn read_archive_bytes<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn read_archive_string<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let bytes = read_archive_bytes(archive, path)?;
    let text = crate::dom::decode_text(crate::dom::strip_bom(&bytes), None);
    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::ItemKind;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    const OPF: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <manifest>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="pic" href="images/pic.png" media-type="image/png"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
  </spine>
</package>"#;

    fn build_epub() -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        zip.start_file("META-INF/container.xml", deflated).unwrap();
        zip.write_all(CONTAINER_XML.as_bytes()).unwrap();
        zip.start_file("OEBPS/content.opf", deflated).unwrap();
        zip.write_all(OPF.as_bytes()).unwrap();
        zip.start_file("OEBPS/nav.xhtml", deflated).unwrap();
        zip.write_all(b"<html><body><nav epub:type=\"toc\"><a href=\"text/ch1.xhtml\">One</a></nav></body></html>")
            .unwrap();
        zip.start_file("OEBPS/text/ch1.xhtml", deflated).unwrap();
        zip.write_all(b"<html><body><p>Hello</p></body></html>").unwrap();
        zip.start_file("OEBPS/images/pic.png", deflated).unwrap();
        zip.write_all(&[1, 2, 3]).unwrap();

        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_open_manifest_and_spine() {
        let book = EpubBook::from_reader(Cursor::new(build_epub())).unwrap();

        assert_eq!(book.items().len(), 3);
        assert_eq!(book.spine(), &["text/ch1.xhtml".to_string()]);

        let nav = book.item_by_href("nav.xhtml").unwrap();
        assert!(nav.has_property("nav"));
        assert_eq!(nav.kind(), ItemKind::Document);

        let pic = book.item_by_href("images/pic.png").unwrap();
        assert_eq!(book.read_item(pic).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_document_content_readable() {
        let book = EpubBook::from_reader(Cursor::new(build_epub())).unwrap();
        let ch1 = book.item_by_href("text/ch1.xhtml").unwrap();
        let bytes = book.read_item(ch1).unwrap();
        assert!(bytes.starts_with(b"<html>"));
    }

    #[test]
    fn test_missing_container_rejected() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("mimetype", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        assert!(EpubBook::from_reader(Cursor::new(bytes)).is_err());
    }
}
