//! PDF → plain text.
//!
//! Text comes from the content streams via lopdf, so scanned pages without a
//! text layer come back empty; that is reported, not treated as an error.

use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use crate::input::SelectedFile;
use crate::output::{derived_name, Artifact};
use crate::pdf::{run_blocking, PdfDocument};
use crate::progress::ProgressCallback;
use crate::ranges::{PageSelection, SelectionPolicy};
use tracing::{info, warn};

/// Text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-indexed page number.
    pub page: usize,
    pub text: String,
}

/// Extract per-page text for the selected pages.
pub async fn extract_page_texts(
    file: &SelectedFile,
    selection: &PageSelection,
    config: &ToolkitConfig,
) -> Result<Vec<PageText>, AxevoraError> {
    file.require_pdf()?;
    let name = file.name.clone();
    let bytes = file.bytes.clone();
    let password = config.password.clone();
    let selection = selection.clone();
    let callback = config.progress_callback.clone();

    run_blocking("text", move || {
        let doc = PdfDocument::load_bytes(&name, &bytes, password.as_deref())?;
        page_texts(&doc, &selection, callback.as_ref())
    })
    .await
}

/// Per-page text of an already loaded document. Runs on the calling thread.
pub(crate) fn page_texts(
    doc: &PdfDocument,
    selection: &PageSelection,
    callback: Option<&ProgressCallback>,
) -> Result<Vec<PageText>, AxevoraError> {
    let pages = selection.resolve(doc.page_count(), SelectionPolicy::Set)?;
    let steps = pages.len();
    if let Some(cb) = callback {
        cb.on_task_start("text", steps);
    }

    let mut out = Vec::with_capacity(steps);
    for (step, idx) in pages.into_iter().enumerate() {
        let text = match doc.page_text(idx) {
            Ok(t) => t,
            Err(e) => {
                warn!("No text for page {}: {}", idx + 1, e);
                if let Some(cb) = callback {
                    cb.on_step_error(step + 1, steps, &e.to_string());
                }
                String::new()
            }
        };
        out.push(PageText {
            page: idx + 1,
            text: normalise(&text),
        });
        if let Some(cb) = callback {
            cb.on_step_complete(step + 1, steps);
        }
    }
    if let Some(cb) = callback {
        cb.on_task_complete(steps, out.iter().filter(|p| !p.text.is_empty()).count());
    }
    Ok(out)
}

/// Extract text into a single `.txt` artifact with a header per page.
pub async fn pdf_to_text(
    file: &SelectedFile,
    selection: &PageSelection,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    let pages = extract_page_texts(file, selection, config).await?;
    let empty = pages.iter().filter(|p| p.text.is_empty()).count();
    if empty > 0 {
        warn!("{} of {} pages have no text layer", empty, pages.len());
    }
    let text = join_pages(&pages);
    info!("Extracted {} chars of text from '{}'", text.len(), file.name);
    Ok(Artifact::new(
        derived_name(&file.name, "", "txt"),
        "text/plain; charset=utf-8",
        text.into_bytes(),
    ))
}

/// Render pages as `--- Page N ---` blocks.
pub fn join_pages(pages: &[PageText]) -> String {
    let mut out = String::new();
    for p in pages {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("--- Page {} ---\n", p.page));
        out.push_str(&p.text);
        out.push('\n');
    }
    out
}

/// Trim trailing spaces per line and collapse runs of blank lines.
fn normalise(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::test_support::numbered_pdf_bytes;

    #[test]
    fn normalise_collapses_blank_lines() {
        assert_eq!(normalise("a  \n\n\n\nb\n"), "a\n\nb");
        assert_eq!(normalise("   "), "");
    }

    #[test]
    fn join_adds_headers() {
        let pages = vec![
            PageText { page: 1, text: "one".into() },
            PageText { page: 3, text: "three".into() },
        ];
        assert_eq!(join_pages(&pages), "--- Page 1 ---\none\n\n--- Page 3 ---\nthree\n");
    }

    #[tokio::test]
    async fn extracts_text_of_selected_pages() {
        let file = SelectedFile::from_bytes("doc.pdf", numbered_pdf_bytes(3));
        let pages = extract_page_texts(&file, &PageSelection::parse("2"), &ToolkitConfig::default())
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page, 2);
        assert!(pages[0].text.contains("Page 2"), "got {:?}", pages[0].text);
    }
}
