//! Integration tests for the PDF page tools.
//!
//! Documents are built in memory with lopdf; page `i` (0-indexed) is
//! `100 + i` points wide, so page order survives as a list of widths.
//! Tests that rasterise need pdfium and are gated behind `E2E_ENABLED`.

use axevora::pdf::ops::{
    delete_pages, extract_pages, merge_pdfs, pdf_info, rearrange_pages, rotate_pages, split_pdf,
    SplitMode,
};
use axevora::pdf::security::{protect_pdf, unlock_pdf, ProtectOptions};
use axevora::{
    parse_ranges, AxevoraError, PageSelection, PdfDocument, SelectedFile, ToolkitConfig,
};
use lopdf::{Dictionary, Document, Object, Stream};
use std::collections::BTreeSet;
use std::io::{Cursor, Read};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn sample_pdf(name: &str, pages: usize) -> SelectedFile {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for i in 0..pages {
        let content = format!("BT /F1 12 Tf 10 10 Td (Page {}) Tj ET", i + 1);
        let content_id =
            doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content.into_bytes())));
        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(100 + i as i64),
                Object::Integer(200),
            ]),
        );
        page.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }
    let mut tree = Dictionary::new();
    tree.set("Type", Object::Name(b"Pages".to_vec()));
    tree.set("Count", Object::Integer(pages as i64));
    tree.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(tree));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    SelectedFile::from_bytes(name, bytes)
}

/// Page widths of a serialised PDF, in page order.
fn widths(bytes: &[u8]) -> Vec<i64> {
    let doc = PdfDocument::load_bytes("out.pdf", bytes, None).unwrap();
    doc.info()
        .page_sizes
        .iter()
        .map(|(w, _)| w.round() as i64)
        .collect()
}

fn rotations(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|id| {
            doc.get_dictionary(*id)
                .ok()
                .and_then(|d| d.get(b"Rotate").ok())
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0)
        })
        .collect()
}

fn config() -> ToolkitConfig {
    ToolkitConfig::default()
}

// ── Page selection ───────────────────────────────────────────────────────────

#[test]
fn range_parser_examples() {
    assert_eq!(parse_ranges("1,2,3", 5), BTreeSet::from([0, 1, 2]));
    assert_eq!(parse_ranges("2-4", 5), BTreeSet::from([1, 2, 3]));
    assert_eq!(parse_ranges("1, 3-5, 10", 5), BTreeSet::from([0, 2, 3, 4]));
    assert!(parse_ranges("", 5).is_empty());
    assert!(parse_ranges("5-2", 5).is_empty());
}

// ── Rearrange ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rearrange_ten_pages_by_order() {
    let file = sample_pdf("report.pdf", 10);
    let out = rearrange_pages(&file, &PageSelection::parse("3,1,2"), &config())
        .await
        .unwrap();
    assert_eq!(out.file_name, "report-rearranged.pdf");
    assert_eq!(out.mime, "application/pdf");
    // Source pages [2, 0, 1].
    assert_eq!(widths(&out.bytes), vec![102, 100, 101]);
}

#[test]
fn rearrange_keeps_duplicates_blocking() {
    let file = sample_pdf("a.pdf", 3);
    let out = tokio_test::block_on(rearrange_pages(
        &file,
        &PageSelection::parse("2,2,1"),
        &config(),
    ))
    .unwrap();
    assert_eq!(widths(&out.bytes), vec![101, 101, 100]);
}

#[tokio::test]
async fn rearrange_with_nothing_valid_is_a_user_error() {
    let file = sample_pdf("a.pdf", 3);
    let err = rearrange_pages(&file, &PageSelection::parse("7,9"), &config())
        .await
        .unwrap_err();
    assert!(matches!(err, AxevoraError::EmptySelection { total: 3, .. }));
    assert!(err.is_user_error());
}

// ── Delete / extract ─────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_and_extract_partition_the_document() {
    let file = sample_pdf("doc.pdf", 6);
    let selection = PageSelection::parse("2, 4-5");

    let kept = delete_pages(&file, &selection, &config()).await.unwrap();
    let removed = extract_pages(&file, &selection, &config()).await.unwrap();
    assert_eq!(kept.file_name, "doc-trimmed.pdf");
    assert_eq!(removed.file_name, "doc-extracted.pdf");

    let kept: BTreeSet<i64> = widths(&kept.bytes).into_iter().collect();
    let removed: BTreeSet<i64> = widths(&removed.bytes).into_iter().collect();
    let all: BTreeSet<i64> = (100..106).collect();
    assert!(kept.is_disjoint(&removed));
    assert_eq!(kept.union(&removed).copied().collect::<BTreeSet<_>>(), all);
    assert_eq!(removed, BTreeSet::from([101, 103, 104]));
}

#[tokio::test]
async fn deleting_every_page_is_rejected() {
    let file = sample_pdf("doc.pdf", 3);
    let err = delete_pages(&file, &PageSelection::parse("1-3"), &config())
        .await
        .unwrap_err();
    assert!(matches!(err, AxevoraError::CannotDeleteAllPages { total: 3 }));
}

// ── Rotate ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rotate_selected_pages() {
    let file = sample_pdf("scan.pdf", 3);
    let out = rotate_pages(&file, &PageSelection::parse("1,3"), -90, &config())
        .await
        .unwrap();
    assert_eq!(out.file_name, "scan-rotated.pdf");
    assert_eq!(rotations(&out.bytes), vec![270, 0, 270]);
}

#[tokio::test]
async fn rotate_rejects_odd_angles() {
    let file = sample_pdf("scan.pdf", 1);
    let err = rotate_pages(&file, &PageSelection::All, 45, &config())
        .await
        .unwrap_err();
    assert!(matches!(err, AxevoraError::InvalidRotation { degrees: 45 }));
}

// ── Split / merge ────────────────────────────────────────────────────────────

#[tokio::test]
async fn split_by_ranges_makes_one_file_per_token() {
    let file = sample_pdf("book.pdf", 5);
    let out = split_pdf(&file, &SplitMode::Ranges("1-2, 4, 9".into()), &config())
        .await
        .unwrap();
    assert_eq!(out.file_name, "book-split.zip");

    let mut archive = zip::ZipArchive::new(Cursor::new(out.bytes)).unwrap();
    assert_eq!(archive.len(), 2);
    let mut part = Vec::new();
    archive
        .by_name("book-part-1.pdf")
        .unwrap()
        .read_to_end(&mut part)
        .unwrap();
    assert_eq!(widths(&part), vec![100, 101]);
}

#[tokio::test]
async fn merge_keeps_input_order() {
    let a = sample_pdf("a.pdf", 2);
    let b = sample_pdf("b.pdf", 3);
    let out = merge_pdfs(&[b, a], &config()).await.unwrap();
    assert_eq!(out.file_name, "merged.pdf");
    assert_eq!(widths(&out.bytes), vec![100, 101, 102, 100, 101]);
}

#[tokio::test]
async fn merge_needs_two_files() {
    let err = merge_pdfs(&[sample_pdf("a.pdf", 1)], &config())
        .await
        .unwrap_err();
    assert!(matches!(err, AxevoraError::NotEnoughFiles { needed: 2, got: 1, .. }));
}

// ── Protect / unlock ─────────────────────────────────────────────────────────

#[tokio::test]
async fn protect_then_unlock() {
    let file = sample_pdf("secret.pdf", 2);
    let locked = protect_pdf(&file, &ProtectOptions::new("pw"), &config())
        .await
        .unwrap();
    assert_eq!(locked.file_name, "secret-protected.pdf");

    let locked_file = SelectedFile::from_bytes(&locked.file_name, locked.bytes.clone());
    let err = pdf_info(&locked_file, &config()).await.unwrap_err();
    assert!(matches!(err, AxevoraError::PasswordRequired { .. }));

    let opened = PdfDocument::load_bytes("secret.pdf", &locked.bytes, Some("pw")).unwrap();
    assert_eq!(opened.page_count(), 2);

    let unlocked = unlock_pdf(&locked_file, "pw", &config()).await.unwrap();
    assert_eq!(widths(&unlocked.bytes), vec![100, 101]);

    let unlocked_file = SelectedFile::from_bytes(&unlocked.file_name, unlocked.bytes);
    let info = pdf_info(&unlocked_file, &config()).await.unwrap();
    assert_eq!(info.page_count, 2);
    assert!(!info.was_encrypted);
}

#[tokio::test]
async fn page_tools_open_locked_files_with_configured_password() {
    let file = sample_pdf("secret.pdf", 3);
    let locked = protect_pdf(&file, &ProtectOptions::new("pw"), &config())
        .await
        .unwrap();
    let locked = SelectedFile::from_bytes("secret.pdf", locked.bytes);
    let with_password = ToolkitConfig::builder().password("pw").build().unwrap();

    let info = pdf_info(&locked, &with_password).await.unwrap();
    assert_eq!(info.page_count, 3);
    assert!(info.was_encrypted);

    let out = rearrange_pages(&locked, &PageSelection::parse("3,1"), &with_password)
        .await
        .unwrap();
    assert_eq!(widths(&out.bytes), vec![102, 100]);

    let wrong = ToolkitConfig::builder().password("nope").build().unwrap();
    let err = pdf_info(&locked, &wrong).await.unwrap_err();
    assert!(matches!(err, AxevoraError::WrongPassword { .. }));
}

#[tokio::test]
async fn protect_rejects_empty_password() {
    let file = sample_pdf("a.pdf", 1);
    let err = protect_pdf(&file, &ProtectOptions::new(""), &config())
        .await
        .unwrap_err();
    assert!(matches!(err, AxevoraError::EmptyPassword));
}

// ── Input validation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn non_pdf_input_is_rejected() {
    let file = SelectedFile::from_bytes("notes.pdf", b"hello world".to_vec());
    let err = pdf_info(&file, &config()).await.unwrap_err();
    assert!(matches!(err, AxevoraError::NotAPdf { .. }));
    assert!(err.is_user_error());
}

// ── Rendering (needs pdfium) ─────────────────────────────────────────────────

#[tokio::test]
async fn render_single_page_to_png() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run pdfium tests");
        return;
    }
    let file = sample_pdf("slides.pdf", 2);
    let out = axevora::pdf::render::pdf_to_images(
        &file,
        &PageSelection::parse("2"),
        axevora::RasterFormat::Png,
        &config(),
    )
    .await
    .unwrap();
    assert_eq!(out.file_name, "slides-page-2.png");
    assert!(image::load_from_memory(&out.bytes).is_ok());
}
