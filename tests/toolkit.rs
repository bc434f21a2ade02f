//! Integration tests for the non-PDF tools: SEO, site generation, EPUB,
//! catalog and media conversion.
//!
//! Nothing here touches the network. The ffmpeg round-trip is gated behind
//! `E2E_ENABLED` and an ffmpeg on `PATH`.

use axevora::catalog::{find_tool, HeadMetadata, DEFAULT_BASE_URL};
use axevora::epub::EpubBook;
use axevora::media::{bundle_batch, convert_batch, AudioFormat};
use axevora::seo::{analyze_file, MIN_WORDS};
use axevora::sitegen::{Industry, Section, SiteStyle};
use axevora::{
    analyze_html, convert_media, generate_site, ConvertOptions, ItemError, OutputFormat,
    RasterFormat, SelectedFile, SiteRequest, ToolProgressCallback, ToolkitConfig,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn png(name: &str, w: u32, h: u32) -> SelectedFile {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 120, 200])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    SelectedFile::from_bytes(name, bytes)
}

fn zip_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}

#[derive(Default)]
struct StepCounter {
    starts: AtomicUsize,
    steps: AtomicUsize,
    errors: AtomicUsize,
}

impl ToolProgressCallback for StepCounter {
    fn on_task_start(&self, _task: &str, _total: usize) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn on_step_complete(&self, _step: usize, _total: usize) {
        self.steps.fetch_add(1, Ordering::SeqCst);
    }

    fn on_step_error(&self, _step: usize, _total: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

// ── SEO ──────────────────────────────────────────────────────────────────────

#[test]
fn seo_empty_document_scores_low() {
    let report = analyze_html("<html><body></body></html>");
    assert!(report.score <= 20, "score {}", report.score);
    assert!(report.issues.iter().any(|i| i.check == "title-missing"));
    assert_eq!(report.grade(), 'F');
}

#[test]
fn seo_generated_site_is_scored() {
    let site = generate_site(&SiteRequest::new("a yoga studio called Still Water in Bath"));
    let report = analyze_html(&site.html);
    assert_eq!(report.facts.h1_count, 1);
    assert!(report.facts.has_viewport);
    assert_eq!(report.facts.lang.as_deref(), Some("en"));
    assert!(report.facts.word_count < MIN_WORDS);
    assert!(report.score > 0 && report.score < 100);
}

#[test]
fn seo_from_selected_file() {
    let html = "<html lang=\"en\"><head><title>x</title></head><body><h1>a</h1></body></html>";
    let report = analyze_file(&SelectedFile::from_bytes("page.html", html.as_bytes().to_vec()));
    assert_eq!(report.facts.title.as_deref(), Some("x"));
}

// ── Site generator ───────────────────────────────────────────────────────────

#[test]
fn site_bundle_contents() {
    let mut req = SiteRequest::new(r#"My law firm "Hart & Moss" handles family cases"#);
    req.style = SiteStyle::Classic;
    req.sections = vec![Section::Hero, Section::Services, Section::Contact];
    let site = generate_site(&req);
    assert_eq!(site.business_name, "Hart & Moss");
    assert_eq!(site.industry, Industry::Legal);
    assert!(site.html.contains("Hart &amp; Moss"));
    assert!(site.css.contains("Georgia"));

    let zip = site.to_zip().unwrap();
    let mut names = zip_names(&zip.bytes);
    names.sort();
    assert_eq!(names, vec!["index.html", "script.js", "styles.css"]);
}

// ── EPUB ─────────────────────────────────────────────────────────────────────

#[test]
fn epub_container_layout() {
    let mut book = EpubBook::new("Field Notes", "A. Writer");
    book.add_chapter("Morning", "Birds.\n\nMore birds.");
    book.add_chapter("Evening", "Owls.");
    let bytes = book.to_bytes().unwrap();

    let names = zip_names(&bytes);
    assert_eq!(names[0], "mimetype");
    for expected in [
        "META-INF/container.xml",
        "OEBPS/content.opf",
        "OEBPS/toc.ncx",
        "OEBPS/style.css",
        "OEBPS/chapter-1.xhtml",
        "OEBPS/chapter-2.xhtml",
    ] {
        assert!(names.iter().any(|n| n == expected), "missing {expected}");
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut mimetype = String::new();
    archive
        .by_name("mimetype")
        .unwrap()
        .read_to_string(&mut mimetype)
        .unwrap();
    assert_eq!(mimetype, "application/epub+zip");
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[test]
fn every_tool_has_renderable_head() {
    for tool in axevora::all_tools() {
        let head = HeadMetadata::for_tool(tool, DEFAULT_BASE_URL);
        let html = head.render();
        assert!(html.contains(&format!("/tools/{}", tool.slug)));
        assert!(html.contains("application/ld+json"));
        assert!(!tool.keywords.is_empty(), "{} has no keywords", tool.slug);
    }
    assert!(find_tool("pdf-to-epub").is_some());
}

// ── Media ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn convert_png_to_webp() {
    let out = convert_media(
        &png("logo.png", 40, 20),
        &ConvertOptions::new(OutputFormat::Image(RasterFormat::WebP)),
        &ToolkitConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(out.file_name, "logo.webp");
    assert_eq!(
        image::guess_format(&out.bytes).unwrap(),
        ImageFormat::WebP
    );
}

#[tokio::test]
async fn batch_isolates_failures_and_keeps_order() {
    let counter = Arc::new(StepCounter::default());
    let config = ToolkitConfig::builder()
        .concurrency(2)
        .progress_callback(counter.clone())
        .build()
        .unwrap();
    let files = vec![
        png("a.png", 8, 8),
        SelectedFile::from_bytes("broken.png", b"\x89PNG\r\n\x1a\nnot really".to_vec()),
        png("c.png", 8, 8),
    ];
    let options = ConvertOptions::new(OutputFormat::Image(RasterFormat::Jpeg));
    let items = convert_batch(&files, &options, &config).await;

    let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["a.png", "broken.png", "c.png"]);
    assert!(items[0].result.is_ok());
    assert!(matches!(
        items[1].result,
        Err(ItemError::DecodeFailed { .. })
    ));
    assert!(items[2].result.is_ok());
    assert_eq!(counter.starts.load(Ordering::SeqCst), 1);
    assert_eq!(counter.errors.load(Ordering::SeqCst), 1);

    let bundle = bundle_batch(&items).unwrap();
    let mut names = zip_names(&bundle.bytes);
    names.sort();
    assert_eq!(names, vec!["a.jpg", "c.jpg"]);
}

#[tokio::test]
async fn heic_is_reported_unsupported() {
    let mut bytes = vec![0, 0, 0, 0x18];
    bytes.extend_from_slice(b"ftypheic");
    bytes.resize(64, 0);
    let err = convert_media(
        &SelectedFile::from_bytes("IMG_0001.HEIC", bytes),
        &ConvertOptions::new(OutputFormat::Image(RasterFormat::Jpeg)),
        &ToolkitConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(err.is_user_error());
    assert!(err.to_string().contains("HEIC"));
}

#[tokio::test]
async fn ffmpeg_wav_to_mp3() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run ffmpeg tests");
        return;
    }
    // 0.5 s of 8 kHz mono silence.
    let samples = 4000u32;
    let mut wav = Vec::new();
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + samples * 2).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&8000u32.to_le_bytes());
    wav.extend_from_slice(&16000u32.to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(samples * 2).to_le_bytes());
    wav.resize(wav.len() + (samples * 2) as usize, 0);

    let out = convert_media(
        &SelectedFile::from_bytes("tone.wav", wav),
        &ConvertOptions::new(OutputFormat::Audio(AudioFormat::Mp3)).bitrate_kbps(64),
        &ToolkitConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(out.file_name, "tone.mp3");
    assert!(!out.is_empty());
}
