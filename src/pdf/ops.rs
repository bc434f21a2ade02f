//! Page tools: delete, extract, rearrange, rotate, split, merge.
//!
//! Each tool turns the user's selection into a list of source page indices
//! and hands it to [`PdfDocument::assemble`]:
//!
//! | tool      | target pages                                   |
//! |-----------|------------------------------------------------|
//! | delete    | complement of the selection                    |
//! | extract   | the selection, ascending                       |
//! | rearrange | the selection as typed, repeats allowed        |
//! | split     | one document per page, or per range token      |
//! | rotate    | identity; rotation applied to the selection    |
//! | merge     | every page of every file, in file order        |

use crate::archive::ZipBundle;
use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use crate::input::SelectedFile;
use crate::output::{derived_name, Artifact};
use crate::pdf::{run_blocking, PdfDocument, PdfInfo};
use crate::ranges::{complement, parse_ranges, PageSelection, SelectionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// How [`split_pdf`] divides the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMode {
    /// One single-page PDF per page.
    EveryPage,
    /// One PDF per comma-separated token, e.g. `"1-3, 4, 5-9"` → three files.
    Ranges(String),
}

/// Load the file with the configured password, off the async runtime.
async fn load(file: &SelectedFile, config: &ToolkitConfig) -> Result<PdfDocument, AxevoraError> {
    file.require_pdf()?;
    let name = file.name.clone();
    let bytes = file.bytes.clone();
    let password = config.password.clone();
    run_blocking("load", move || {
        PdfDocument::load_bytes(&name, &bytes, password.as_deref())
    })
    .await
}

fn started(config: &ToolkitConfig, task: &str, steps: usize) {
    if let Some(cb) = &config.progress_callback {
        cb.on_task_start(task, steps);
    }
}

fn finished(config: &ToolkitConfig, steps: usize) {
    if let Some(cb) = &config.progress_callback {
        cb.on_step_complete(steps, steps);
        cb.on_task_complete(steps, steps);
    }
}

/// Document facts (page count, sizes, info dictionary).
pub async fn pdf_info(file: &SelectedFile, config: &ToolkitConfig) -> Result<PdfInfo, AxevoraError> {
    let doc = load(file, config).await?;
    Ok(doc.info())
}

/// Build a document from `order` and serialise it as `<stem>-<suffix>.pdf`.
async fn assemble_artifact(
    doc: PdfDocument,
    order: Vec<usize>,
    suffix: &'static str,
) -> Result<Artifact, AxevoraError> {
    let file_name = derived_name(doc.name(), suffix, "pdf");
    let bytes = run_blocking(suffix, move || doc.assemble(&order)?.to_bytes()).await?;
    Ok(Artifact::pdf(file_name, bytes))
}

/// Remove the selected pages.
///
/// Fails with [`AxevoraError::CannotDeleteAllPages`] if nothing would remain.
pub async fn delete_pages(
    file: &SelectedFile,
    selection: &PageSelection,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    let doc = load(file, config).await?;
    let total = doc.page_count();
    let removed: BTreeSet<usize> = selection
        .resolve(total, SelectionPolicy::Set)?
        .into_iter()
        .collect();
    let kept = complement(&removed, total);
    if kept.is_empty() {
        return Err(AxevoraError::CannotDeleteAllPages { total });
    }

    started(config, "delete", 1);
    info!("Deleting {} of {} pages from '{}'", removed.len(), total, file.name);
    let artifact = assemble_artifact(doc, kept, "trimmed").await?;
    finished(config, 1);
    Ok(artifact)
}

/// Keep only the selected pages, in ascending order.
pub async fn extract_pages(
    file: &SelectedFile,
    selection: &PageSelection,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    let doc = load(file, config).await?;
    let pages = selection.resolve(doc.page_count(), SelectionPolicy::Set)?;

    started(config, "extract", 1);
    info!("Extracting {} pages from '{}'", pages.len(), file.name);
    let artifact = assemble_artifact(doc, pages, "extracted").await?;
    finished(config, 1);
    Ok(artifact)
}

/// Reorder pages exactly as typed; `"3,1,2"` puts page 3 first, repeats
/// duplicate a page and unlisted pages are dropped.
pub async fn rearrange_pages(
    file: &SelectedFile,
    order: &PageSelection,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    let doc = load(file, config).await?;
    let pages = order.resolve(doc.page_count(), SelectionPolicy::Ordered)?;

    started(config, "rearrange", 1);
    info!("Rearranging '{}' into {} pages", file.name, pages.len());
    let artifact = assemble_artifact(doc, pages, "rearranged").await?;
    finished(config, 1);
    Ok(artifact)
}

/// Rotate the selected pages by `degrees` (a multiple of 90, may be negative).
pub async fn rotate_pages(
    file: &SelectedFile,
    selection: &PageSelection,
    degrees: i32,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    if degrees % 90 != 0 {
        return Err(AxevoraError::InvalidRotation { degrees });
    }
    let mut doc = load(file, config).await?;
    let pages = selection.resolve(doc.page_count(), SelectionPolicy::Set)?;

    started(config, "rotate", 1);
    info!("Rotating {} pages of '{}' by {}°", pages.len(), file.name, degrees);
    let file_name = derived_name(doc.name(), "rotated", "pdf");
    let bytes = run_blocking("rotate", move || {
        doc.rotate(&pages, degrees)?;
        doc.to_bytes()
    })
    .await?;
    finished(config, 1);
    Ok(Artifact::pdf(file_name, bytes))
}

/// Page groups for a split, 0-indexed. Empty groups are dropped.
pub fn split_groups(mode: &SplitMode, page_count: usize) -> Vec<Vec<usize>> {
    match mode {
        SplitMode::EveryPage => (0..page_count).map(|p| vec![p]).collect(),
        SplitMode::Ranges(text) => text
            .split(',')
            .map(|token| parse_ranges(token, page_count).into_iter().collect::<Vec<_>>())
            .filter(|group| !group.is_empty())
            .collect(),
    }
}

/// Split into several PDFs bundled as a zip.
///
/// Entries are named `<stem>-part-N.pdf` with N starting at 1.
pub async fn split_pdf(
    file: &SelectedFile,
    mode: &SplitMode,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    let doc = load(file, config).await?;
    let total = doc.page_count();
    let groups = split_groups(mode, total);
    if groups.is_empty() {
        return Err(AxevoraError::EmptySelection {
            input: match mode {
                SplitMode::EveryPage => "every page".into(),
                SplitMode::Ranges(text) => text.clone(),
            },
            total,
        });
    }

    let steps = groups.len();
    started(config, "split", steps);
    info!("Splitting '{}' into {} parts", file.name, steps);

    let callback = config.progress_callback.clone();
    let stem_name = file.name.clone();
    let bytes = run_blocking("split", move || {
        let mut bundle = ZipBundle::new();
        for (i, group) in groups.iter().enumerate() {
            let part = doc.assemble(group)?.to_bytes()?;
            let entry = derived_name(&stem_name, &format!("part-{}", i + 1), "pdf");
            bundle.add(&entry, &part)?;
            if let Some(cb) = &callback {
                cb.on_step_complete(i + 1, steps);
            }
        }
        bundle.finish()
    })
    .await?;

    if let Some(cb) = &config.progress_callback {
        cb.on_task_complete(steps, steps);
    }
    Ok(Artifact::zip(derived_name(&file.name, "split", "zip"), bytes))
}

/// Concatenate PDFs in the given order.
pub async fn merge_pdfs(
    files: &[SelectedFile],
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    if files.len() < 2 {
        return Err(AxevoraError::NotEnoughFiles {
            operation: "Merge".into(),
            needed: 2,
            got: files.len(),
        });
    }

    let steps = files.len() + 1;
    started(config, "merge", steps);
    let mut docs = Vec::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        match load(file, config).await {
            Ok(doc) => docs.push(doc),
            Err(e) => {
                warn!("Merge aborted at '{}': {}", file.name, e);
                if let Some(cb) = &config.progress_callback {
                    cb.on_step_error(i + 1, steps, &e.to_string());
                    cb.on_task_complete(steps, i);
                }
                return Err(e);
            }
        }
        if let Some(cb) = &config.progress_callback {
            cb.on_step_complete(i + 1, steps);
        }
    }

    let page_total: usize = docs.iter().map(PdfDocument::page_count).sum();
    info!("Merging {} files, {} pages", docs.len(), page_total);
    let bytes = run_blocking("merge", move || PdfDocument::merge(docs)?.to_bytes()).await?;
    finished(config, steps);
    Ok(Artifact::pdf("merged.pdf", bytes))
}
