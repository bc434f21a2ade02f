//! Tool catalog and `<head>` metadata.
//!
//! Every tool the toolkit exposes has one static [`ToolInfo`] entry. The SEO
//! head for a tool page is built as a [`HeadMetadata`] value and turned into
//! markup in exactly one place, [`HeadMetadata::render`].

use crate::input::FileKind;
use crate::sitegen::escape_html;
use serde::Serialize;
use serde_json::json;
use std::fmt;

pub const SITE_NAME: &str = "Axevora";
pub const DEFAULT_BASE_URL: &str = "https://axevora.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Pdf,
    Image,
    Audio,
    Video,
    Writing,
    Web,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Pdf => "PDF",
            Category::Image => "Image",
            Category::Audio => "Audio",
            Category::Video => "Video",
            Category::Writing => "Writing",
            Category::Web => "Web",
        })
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub slug: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
    /// Accepted input kinds; empty means the tool takes text, not a file.
    #[serde(skip)]
    pub inputs: &'static [FileKind],
}

impl ToolInfo {
    pub fn accepts(&self, kind: FileKind) -> bool {
        self.inputs.contains(&kind)
    }
}

const PDF: &[FileKind] = &[FileKind::Pdf];
const IMAGES: &[FileKind] = &[
    FileKind::Png,
    FileKind::Jpeg,
    FileKind::Gif,
    FileKind::WebP,
    FileKind::Bmp,
    FileKind::Tiff,
];
const AUDIO_VIDEO: &[FileKind] = &[FileKind::Audio, FileKind::Video];
const VIDEO: &[FileKind] = &[FileKind::Video];
const HTML: &[FileKind] = &[FileKind::Html];

macro_rules! tool {
    ($slug:literal, $name:literal, $cat:ident, $accepts:expr, $desc:literal, [$($kw:literal),* $(,)?]) => {
        ToolInfo {
            slug: $slug,
            name: $name,
            category: Category::$cat,
            description: $desc,
            keywords: &[$($kw),*],
            inputs: $accepts,
        }
    };
}

static TOOLS: &[ToolInfo] = &[
    tool!("merge-pdf", "Merge PDF", Pdf, PDF,
        "Combine several PDF files into one document in the order you choose.",
        ["merge pdf", "combine pdf", "join pdf"]),
    tool!("split-pdf", "Split PDF", Pdf, PDF,
        "Split a PDF into single pages or custom page ranges, downloaded as a zip.",
        ["split pdf", "separate pdf pages"]),
    tool!("delete-pdf-pages", "Delete PDF Pages", Pdf, PDF,
        "Remove unwanted pages from a PDF by page number or range.",
        ["delete pdf pages", "remove pages from pdf"]),
    tool!("extract-pdf-pages", "Extract PDF Pages", Pdf, PDF,
        "Copy selected pages of a PDF into a new document.",
        ["extract pdf pages", "select pdf pages"]),
    tool!("rearrange-pdf", "Rearrange PDF Pages", Pdf, PDF,
        "Reorder the pages of a PDF, duplicating pages if needed.",
        ["reorder pdf", "rearrange pdf pages"]),
    tool!("rotate-pdf", "Rotate PDF", Pdf, PDF,
        "Rotate all or some pages of a PDF by 90, 180 or 270 degrees.",
        ["rotate pdf", "turn pdf pages"]),
    tool!("protect-pdf", "Protect PDF", Pdf, PDF,
        "Encrypt a PDF with a password so it cannot be opened without it.",
        ["password protect pdf", "encrypt pdf"]),
    tool!("unlock-pdf", "Unlock PDF", Pdf, PDF,
        "Remove the password from a PDF you can open.",
        ["unlock pdf", "remove pdf password", "decrypt pdf"]),
    tool!("pdf-to-image", "PDF to Image", Pdf, PDF,
        "Render PDF pages to PNG, JPEG or WebP images.",
        ["pdf to jpg", "pdf to png", "pdf to image"]),
    tool!("image-to-pdf", "Image to PDF", Pdf, IMAGES,
        "Turn photos and scans into a PDF, one image per page.",
        ["jpg to pdf", "png to pdf", "image to pdf"]),
    tool!("pdf-to-text", "PDF to Text", Pdf, PDF,
        "Pull the text layer out of a PDF as a plain text file.",
        ["pdf to text", "pdf to txt", "extract text from pdf"]),
    tool!("pdf-to-epub", "PDF to EPUB", Pdf, PDF,
        "Convert a text PDF into an EPUB e-book for e-readers.",
        ["pdf to epub", "pdf to ebook"]),
    tool!("image-converter", "Image Converter", Image, IMAGES,
        "Convert images between PNG, JPEG, WebP, BMP, GIF and TIFF, with optional resizing.",
        ["image converter", "png to jpg", "webp to png", "resize image"]),
    tool!("audio-converter", "Audio Converter", Audio, AUDIO_VIDEO,
        "Convert audio to MP3, WAV, AAC, FLAC, OGG, Opus or M4A, or extract the soundtrack of a video.",
        ["audio converter", "mp3 converter", "wav to mp3", "video to mp3"]),
    tool!("video-converter", "Video Converter", Video, VIDEO,
        "Convert video between MP4, AVI, MOV, WebM and MKV.",
        ["video converter", "mov to mp4", "mp4 to webm"]),
    tool!("seo-analyzer", "SEO Analyzer", Web, HTML,
        "Score a web page's on-page SEO and list what to fix.",
        ["seo analyzer", "seo checker", "meta tag checker"]),
    tool!("website-generator", "Website Generator", Web, &[],
        "Describe your business and get a ready-to-host one-page website.",
        ["website generator", "ai website builder", "landing page generator"]),
    tool!("caption-generator", "Caption Generator", Writing, &[],
        "Write social media captions for Instagram, X, LinkedIn, Facebook and TikTok.",
        ["caption generator", "instagram captions", "social media captions"]),
];

/// Every tool, in menu order.
pub fn all_tools() -> &'static [ToolInfo] {
    TOOLS
}

pub fn find_tool(slug: &str) -> Option<&'static ToolInfo> {
    TOOLS.iter().find(|t| t.slug == slug)
}

pub fn tools_in(category: Category) -> impl Iterator<Item = &'static ToolInfo> {
    TOOLS.iter().filter(move |t| t.category == category)
}

/// Tools whose name, description or keywords contain every word of `query`.
pub fn search(query: &str) -> Vec<&'static ToolInfo> {
    let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if words.is_empty() {
        return Vec::new();
    }
    TOOLS
        .iter()
        .filter(|t| {
            let haystack = format!(
                "{} {} {}",
                t.name.to_lowercase(),
                t.description.to_lowercase(),
                t.keywords.join(" ")
            );
            words.iter().all(|w| haystack.contains(w.as_str()))
        })
        .collect()
}

/// `<head>` contents for one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadMetadata {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub canonical_url: String,
    pub og_image: Option<String>,
    /// Structured data emitted as `application/ld+json`.
    pub json_ld: serde_json::Value,
}

impl HeadMetadata {
    /// Metadata for a tool page under `base_url`.
    pub fn for_tool(tool: &ToolInfo, base_url: &str) -> Self {
        let canonical_url = format!("{}/tools/{}", base_url.trim_end_matches('/'), tool.slug);
        let title = format!("{} Online Free | {}", tool.name, SITE_NAME);
        let json_ld = json!({
            "@context": "https://schema.org",
            "@type": "WebApplication",
            "name": tool.name,
            "description": tool.description,
            "url": canonical_url,
            "applicationCategory": format!("{}Application", tool.category),
            "operatingSystem": "Any",
            "offers": { "@type": "Offer", "price": "0", "priceCurrency": "USD" },
        });
        Self {
            title,
            description: tool.description.to_string(),
            keywords: tool.keywords.iter().map(|k| k.to_string()).collect(),
            canonical_url,
            og_image: None,
            json_ld,
        }
    }

    /// Render as `<head>` child elements, one per line.
    pub fn render(&self) -> String {
        let title = escape_html(&self.title);
        let description = escape_html(&self.description);
        let canonical = escape_html(&self.canonical_url);
        let mut lines = vec![
            format!("<title>{title}</title>"),
            format!(r#"<meta name="description" content="{description}">"#),
        ];
        if !self.keywords.is_empty() {
            lines.push(format!(
                r#"<meta name="keywords" content="{}">"#,
                escape_html(&self.keywords.join(", "))
            ));
        }
        lines.push(format!(r#"<link rel="canonical" href="{canonical}">"#));
        lines.push(r#"<meta property="og:type" content="website">"#.to_string());
        lines.push(format!(r#"<meta property="og:site_name" content="{SITE_NAME}">"#));
        lines.push(format!(r#"<meta property="og:title" content="{title}">"#));
        lines.push(format!(r#"<meta property="og:description" content="{description}">"#));
        lines.push(format!(r#"<meta property="og:url" content="{canonical}">"#));
        if let Some(image) = &self.og_image {
            lines.push(format!(r#"<meta property="og:image" content="{}">"#, escape_html(image)));
        }
        lines.push(r#"<meta name="twitter:card" content="summary_large_image">"#.to_string());
        // `</` inside a script element would end it early.
        let ld = self.json_ld.to_string().replace("</", "<\\/");
        lines.push(format!(r#"<script type="application/ld+json">{ld}</script>"#));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seo::analyze_html;
    use std::collections::HashSet;

    #[test]
    fn slugs_are_unique() {
        let slugs: HashSet<_> = all_tools().iter().map(|t| t.slug).collect();
        assert_eq!(slugs.len(), all_tools().len());
    }

    #[test]
    fn lookup_and_filters() {
        let tool = find_tool("rotate-pdf").unwrap();
        assert!(tool.accepts(FileKind::Pdf));
        assert!(!tool.accepts(FileKind::Png));
        assert!(find_tool("nope").is_none());
        assert_eq!(tools_in(Category::Video).count(), 1);
        assert!(tools_in(Category::Pdf).all(|t| t.category == Category::Pdf));
    }

    #[test]
    fn search_matches_all_words() {
        let hits: Vec<_> = search("PDF password").iter().map(|t| t.slug).collect();
        assert!(hits.contains(&"protect-pdf"));
        assert!(hits.contains(&"unlock-pdf"));
        assert!(!hits.contains(&"merge-pdf"));
        assert!(search("   ").is_empty());
    }

    #[test]
    fn head_renders_core_tags() {
        let head = HeadMetadata::for_tool(find_tool("merge-pdf").unwrap(), "https://example.com/");
        let html = head.render();
        assert!(html.contains("<title>Merge PDF Online Free | Axevora</title>"));
        assert!(html.contains(r#"<link rel="canonical" href="https://example.com/tools/merge-pdf">"#));
        assert!(html.contains(r#"property="og:title""#));
        assert!(html.contains(r#""@type":"WebApplication""#));
    }

    #[test]
    fn head_escapes_values() {
        let mut head = HeadMetadata::for_tool(find_tool("seo-analyzer").unwrap(), DEFAULT_BASE_URL);
        head.title = r#"A "quoted" <b>title</b>"#.into();
        head.json_ld = json!({ "name": "</script><script>alert(1)" });
        let html = head.render();
        assert!(html.contains("A &quot;quoted&quot; &lt;b&gt;title&lt;/b&gt;"));
        assert!(!html.contains("</script><script>"));
    }

    #[test]
    fn rendered_head_passes_head_checks() {
        let head = HeadMetadata::for_tool(find_tool("image-to-pdf").unwrap(), DEFAULT_BASE_URL);
        let page = format!("<html lang=\"en\"><head>{}</head><body></body></html>", head.render());
        let report = analyze_html(&page);
        assert!(report.facts.title.is_some());
        assert!(report.facts.canonical.is_some());
        assert!(report.facts.og_title && report.facts.og_description);
    }
}
