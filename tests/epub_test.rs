//! Full pipeline test: a real zip EPUB through [`EpubBook`] and [`extract`].

use std::io::{Cursor, Write};

use libretto::{ContentItem, EpubBook, ExtractOptions, ParagraphRole, extract};
use tempfile::TempDir;
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
    <item id="ch2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="pic" href="images/pic.png" media-type="image/png"/>
    <item id="css" href="style.css" media-type="text/css"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

const NAV: &str = r#"<html xmlns="http://www.w3.org/1999/xhtml"><body>
<nav epub:type="toc"><ol>
  <li><a href="text/ch1.xhtml">Chapter One</a></li>
  <li><a href="text/ch2.xhtml#start">Chapter Two</a></li>
</ol></nav>
</body></html>"#;

const CH1: &str = r#"<html><body>
<h1>Chapter One</h1>
<p>It was a <em>dark</em> and
stormy night.</p>
<img src="../images/pic.png" alt="a storm"/>
</body></html>"#;

// Deliberate tag soup: the lenient parser must still recover the text.
const CH2: &str = r#"<html><body>
<p>The next morning<br>everything was calm.
</body></html>"#;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([80, 90, 100]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

fn build_epub() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let deflated =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    zip.start_file("META-INF/container.xml", deflated).unwrap();
    zip.write_all(CONTAINER_XML.as_bytes()).unwrap();
    zip.start_file("OEBPS/content.opf", deflated).unwrap();
    zip.write_all(OPF.as_bytes()).unwrap();
    zip.start_file("OEBPS/nav.xhtml", deflated).unwrap();
    zip.write_all(NAV.as_bytes()).unwrap();
    zip.start_file("OEBPS/text/ch1.xhtml", deflated).unwrap();
    zip.write_all(CH1.as_bytes()).unwrap();
    zip.start_file("OEBPS/text/ch2.xhtml", deflated).unwrap();
    zip.write_all(CH2.as_bytes()).unwrap();
    zip.start_file("OEBPS/images/pic.png", deflated).unwrap();
    zip.write_all(&png_bytes(300, 200)).unwrap();
    zip.start_file("OEBPS/style.css", deflated).unwrap();
    zip.write_all(b"p { margin: 0 }").unwrap();

    zip.finish().unwrap().into_inner()
}

#[test]
fn full_pipeline_from_zip_container() {
    let dir = TempDir::new().unwrap();
    let book = EpubBook::from_reader(Cursor::new(build_epub())).unwrap();
    let options = ExtractOptions::default()
        .with_min_dimensions(100, 100)
        .with_image_dir(dir.path());

    let result = extract(&book, &options).unwrap();
    assert!(result.events.is_empty(), "unexpected events: {:?}", result.events);

    let items = &result.document.items;
    assert_eq!(
        items[0],
        ContentItem::ChapterStart {
            title: "Chapter One".into(),
            href: "text/ch1.xhtml".into(),
        }
    );
    assert_eq!(
        items[1],
        ContentItem::Paragraph {
            text: "Chapter One".into(),
            role: ParagraphRole::Heading(1),
        }
    );
    assert_eq!(
        items[2],
        ContentItem::Paragraph {
            text: "It was a dark and stormy night.".into(),
            role: ParagraphRole::Body,
        }
    );
    assert!(matches!(
        &items[3],
        ContentItem::Image { alt, .. } if alt == "a storm"
    ));
    // The fragment in the nav entry must not break chapter alignment.
    assert_eq!(
        items[4],
        ContentItem::ChapterStart {
            title: "Chapter Two".into(),
            href: "text/ch2.xhtml".into(),
        }
    );
    assert_eq!(
        items[5],
        ContentItem::Paragraph {
            text: "The next morning everything was calm.".into(),
            role: ParagraphRole::Body,
        }
    );
    assert_eq!(items.len(), 6);

    // The image was deduplicated, logged, and written to disk.
    assert_eq!(result.image_log.len(), 1);
    let entry = &result.image_log[0];
    assert_eq!((entry.width, entry.height), (300, 200));
    assert!(dir.path().join(&entry.file_name).exists());
}

#[test]
fn open_from_disk_matches_reader() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("book.epub");
    std::fs::write(&path, build_epub()).unwrap();

    let book = EpubBook::open(&path).unwrap();
    let result = extract(
        &book,
        &ExtractOptions::default().with_image_dir(dir.path().join("img")),
    )
    .unwrap();

    assert_eq!(result.document.chapter_count(), 2);
    assert_eq!(result.document.paragraphs().count(), 3);
}
