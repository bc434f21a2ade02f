//! EPUB 2 builder and PDF → EPUB.
//!
//! Container layout:
//!
//! ```text
//! mimetype                 stored, first entry
//! META-INF/container.xml   points at the package document
//! OEBPS/content.opf        metadata, manifest, spine
//! OEBPS/toc.ncx            navigation
//! OEBPS/style.css
//! OEBPS/chapter-N.xhtml
//! ```

use crate::archive::ZipBundle;
use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use crate::input::SelectedFile;
use crate::output::{derived_name, Artifact};
use crate::pdf::text::page_texts;
use crate::pdf::{run_blocking, PdfDocument};
use crate::ranges::PageSelection;
use crate::sitegen::escape_html;
use std::path::Path;
use tracing::{info, warn};

pub const EPUB_MIME: &str = "application/epub+zip";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const STYLE_CSS: &str = "body { font-family: serif; line-height: 1.5; margin: 1em; }
h1 { font-size: 1.4em; margin-bottom: 1em; }
p { margin: 0 0 0.8em 0; text-indent: 0; }
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    /// Plain text; blank lines separate paragraphs.
    pub text: String,
}

/// An in-memory book.
#[derive(Debug, Clone)]
pub struct EpubBook {
    pub title: String,
    pub author: String,
    pub language: String,
    /// `urn:uuid:` identifier, fresh per book.
    pub identifier: String,
    pub chapters: Vec<Chapter>,
}

impl EpubBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            language: "en".to_string(),
            identifier: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            chapters: Vec::new(),
        }
    }

    pub fn add_chapter(&mut self, title: impl Into<String>, text: impl Into<String>) {
        self.chapters.push(Chapter {
            title: title.into(),
            text: text.into(),
        });
    }

    /// Serialise to an `.epub` byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AxevoraError> {
        let mut zip = ZipBundle::new();
        zip.add_stored("mimetype", EPUB_MIME.as_bytes())?;
        zip.add("META-INF/container.xml", CONTAINER_XML.as_bytes())?;
        zip.add("OEBPS/content.opf", self.content_opf().as_bytes())?;
        zip.add("OEBPS/toc.ncx", self.toc_ncx().as_bytes())?;
        zip.add("OEBPS/style.css", STYLE_CSS.as_bytes())?;
        for (i, chapter) in self.chapters.iter().enumerate() {
            zip.add(&chapter_file(i), chapter_xhtml(chapter).as_bytes())?;
        }
        zip.finish()
    }

    fn content_opf(&self) -> String {
        let date = chrono::Utc::now().format("%Y-%m-%d");
        let mut manifest = String::new();
        let mut spine = String::new();
        for i in 0..self.chapters.len() {
            manifest.push_str(&format!(
                "    <item id=\"chapter-{n}\" href=\"chapter-{n}.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
                n = i + 1
            ));
            spine.push_str(&format!("    <itemref idref=\"chapter-{}\"/>\n", i + 1));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="BookId" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>{title}</dc:title>
    <dc:creator opf:role="aut">{author}</dc:creator>
    <dc:language>{lang}</dc:language>
    <dc:identifier id="BookId">{id}</dc:identifier>
    <dc:date>{date}</dc:date>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="style" href="style.css" media-type="text/css"/>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#,
            title = escape_xml(&self.title),
            author = escape_xml(&self.author),
            lang = escape_xml(&self.language),
            id = escape_xml(&self.identifier),
        )
    }

    fn toc_ncx(&self) -> String {
        let points: String = self
            .chapters
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    "    <navPoint id=\"nav-{n}\" playOrder=\"{n}\">\n      <navLabel><text>{t}</text></navLabel>\n      <content src=\"chapter-{n}.xhtml\"/>\n    </navPoint>\n",
                    n = i + 1,
                    t = escape_xml(&c.title)
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{id}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#,
            id = escape_xml(&self.identifier),
            title = escape_xml(&self.title),
        )
    }
}

/// Escape for XML text and drop characters XML 1.0 does not allow
/// (NUL, form feed and the other C0 controls PDF text often carries).
fn escape_xml(text: &str) -> String {
    let clean: String = text.chars().filter(|&c| is_xml_char(c)).collect();
    escape_html(&clean)
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn chapter_file(index: usize) -> String {
    format!("OEBPS/chapter-{}.xhtml", index + 1)
}

fn chapter_xhtml(chapter: &Chapter) -> String {
    let title = escape_xml(&chapter.title);
    let body: String = chapter
        .text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let lines: Vec<String> = p.lines().map(|l| escape_xml(l.trim())).collect();
            format!("<p>{}</p>\n", lines.join("<br/>"))
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title>{title}</title>
<link rel="stylesheet" type="text/css" href="style.css"/>
</head>
<body>
<h1>{title}</h1>
{body}</body>
</html>
"#
    )
}

/// Convert a PDF's text layer into an EPUB with one chapter per page.
///
/// Pages without text are skipped. The title and author come from the PDF's
/// Info dictionary, falling back to the file stem and "Unknown".
pub async fn pdf_to_epub(
    file: &SelectedFile,
    selection: &PageSelection,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    file.require_pdf()?;
    let name = file.name.clone();
    let bytes = file.bytes.clone();
    let password = config.password.clone();
    let selection = selection.clone();
    let callback = config.progress_callback.clone();
    let (info, pages) = run_blocking("epub", move || {
        let doc = PdfDocument::load_bytes(&name, &bytes, password.as_deref())?;
        let pages = page_texts(&doc, &selection, callback.as_ref())?;
        Ok((doc.info(), pages))
    })
    .await?;

    let title = info
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| {
            Path::new(&file.name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Untitled")
                .to_string()
        });
    let author = info
        .author
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut book = EpubBook::new(title, author);
    for page in pages {
        if page.text.is_empty() {
            warn!("Page {} has no text; left out of the EPUB", page.page);
            continue;
        }
        book.add_chapter(format!("Page {}", page.page), page.text);
    }
    if book.chapters.is_empty() {
        return Err(AxevoraError::UnsupportedFormat {
            name: file.name.clone(),
            detail: "no extractable text (scanned PDFs need OCR first)".into(),
        });
    }

    info!("Building EPUB '{}' with {} chapters", book.title, book.chapters.len());
    let bytes = book.to_bytes()?;
    Ok(Artifact::new(derived_name(&file.name, "", "epub"), EPUB_MIME, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::test_support::numbered_pdf_bytes;
    use std::io::{Cursor, Read};

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn mimetype_is_first_and_stored() {
        let mut book = EpubBook::new("T", "A");
        book.add_chapter("One", "hello");
        let bytes = book.to_bytes().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), zip::CompressionMethod::Stored);
    }

    #[test]
    fn package_lists_every_chapter() {
        let mut book = EpubBook::new("Tom & Jerry", "Hanna <Barbera>");
        book.add_chapter("One", "a");
        book.add_chapter("Two", "b");
        let bytes = book.to_bytes().unwrap();
        let opf = read_entry(&bytes, "OEBPS/content.opf");
        assert!(opf.contains("<dc:title>Tom &amp; Jerry</dc:title>"));
        assert!(opf.contains("Hanna &lt;Barbera&gt;"));
        assert!(opf.contains(r#"<itemref idref="chapter-2"/>"#));
        let ncx = read_entry(&bytes, "OEBPS/toc.ncx");
        assert_eq!(ncx.matches("<navPoint").count(), 2);
        assert!(read_entry(&bytes, "META-INF/container.xml").contains("OEBPS/content.opf"));
    }

    #[test]
    fn chapter_paragraphs() {
        let xhtml = chapter_xhtml(&Chapter {
            title: "P1".into(),
            text: "first line\nsecond\n\nnext <para>".into(),
        });
        assert!(xhtml.contains("<p>first line<br/>second</p>"));
        assert!(xhtml.contains("<p>next &lt;para&gt;</p>"));
    }

    #[test]
    fn chapter_drops_characters_illegal_in_xml() {
        let xhtml = chapter_xhtml(&Chapter {
            title: "Page\u{0} 1".into(),
            text: "Total\u{0}: 12\u{c}\n\u{1b}end \u{1F4D6}".into(),
        });
        assert!(xhtml.chars().all(is_xml_char));
        assert!(xhtml.contains("<title>Page 1</title>"));
        assert!(xhtml.contains("<p>Total: 12<br/>end \u{1F4D6}</p>"));
    }

    #[tokio::test]
    async fn pdf_pages_become_chapters() {
        let file = SelectedFile::from_bytes("novel.pdf", numbered_pdf_bytes(3));
        let out = pdf_to_epub(&file, &PageSelection::All, &ToolkitConfig::default())
            .await
            .unwrap();
        assert_eq!(out.file_name, "novel.epub");
        assert_eq!(out.mime, EPUB_MIME);
        let opf = read_entry(&out.bytes, "OEBPS/content.opf");
        assert!(opf.contains("<dc:title>novel</dc:title>"));
        assert!(read_entry(&out.bytes, "OEBPS/chapter-3.xhtml").contains("Page 3"));
    }
}
