//! PDF rasterisation: render selected pages to `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## DPI and the pixel cap
//!
//! Pages are scaled by `render_dpi / 72`. `max_rendered_pixels` then caps the
//! longest edge regardless of physical size, so an A0 poster does not
//! produce a 12,000 × 17,000 px bitmap.

use crate::archive::ZipBundle;
use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use crate::input::SelectedFile;
use crate::output::{derived_name, Artifact};
use crate::pdf::encode::{encode_image, RasterFormat};
use crate::pdf::run_blocking;
use crate::progress::ProgressCallback;
use crate::ranges::{PageSelection, SelectionPolicy};
use image::DynamicImage;
use pdfium_render::prelude::{PdfRenderConfig, Pdfium};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Environment variable naming the directory that holds the pdfium library.
pub const PDFIUM_PATH_ENV: &str = "AXEVORA_PDFIUM_PATH";

/// Everything a render needs, detached from the borrowed config.
#[derive(Clone)]
pub(crate) struct RenderJob {
    pub name: String,
    pub bytes: Vec<u8>,
    pub dpi: u32,
    pub max_pixels: u32,
    pub password: Option<String>,
    pub library_path: Option<PathBuf>,
}

impl RenderJob {
    pub(crate) fn new(file: &SelectedFile, config: &ToolkitConfig) -> Self {
        Self {
            name: file.name.clone(),
            bytes: file.bytes.clone(),
            dpi: config.render_dpi,
            max_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
            library_path: config.pdfium_library_path.clone(),
        }
    }
}

/// Bind pdfium from the configured directory, `AXEVORA_PDFIUM_PATH`, or the
/// system library search path, in that order.
pub(crate) fn bind_pdfium(library_path: Option<&PathBuf>) -> Result<Pdfium, AxevoraError> {
    let dir = library_path
        .cloned()
        .or_else(|| std::env::var_os(PDFIUM_PATH_ENV).map(PathBuf::from));

    let bindings = match dir {
        Some(dir) => {
            let lib = Pdfium::pdfium_platform_library_name_at_path(&dir);
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(lib)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| AxevoraError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Number of pages as pdfium sees them.
pub(crate) fn page_count_blocking(job: &RenderJob) -> Result<usize, AxevoraError> {
    let pdfium = bind_pdfium(job.library_path.as_ref())?;
    let document = pdfium
        .load_pdf_from_byte_slice(&job.bytes, job.password.as_deref())
        .map_err(|e| load_error(&job.name, job.password.is_some(), format!("{e:?}")))?;
    Ok(document.pages().len() as usize)
}

fn load_error(name: &str, had_password: bool, err_str: String) -> AxevoraError {
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            AxevoraError::WrongPassword {
                name: name.to_string(),
            }
        } else {
            AxevoraError::PasswordRequired {
                name: name.to_string(),
            }
        }
    } else {
        AxevoraError::CorruptPdf {
            name: name.to_string(),
            detail: err_str,
        }
    }
}

/// Render the given 0-indexed pages, calling `on_page` with each image as it
/// is produced. Out-of-range indices are skipped with a warning.
pub(crate) fn render_each_blocking(
    job: &RenderJob,
    page_indices: &[usize],
    mut on_page: impl FnMut(usize, DynamicImage) -> Result<(), AxevoraError>,
) -> Result<(), AxevoraError> {
    let pdfium = bind_pdfium(job.library_path.as_ref())?;
    let document = pdfium
        .load_pdf_from_byte_slice(&job.bytes, job.password.as_deref())
        .map_err(|e| load_error(&job.name, job.password.is_some(), format!("{e:?}")))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded for rendering: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(job.dpi as f32 / 72.0)
        .set_maximum_width(job.max_pixels as i32)
        .set_maximum_height(job.max_pixels as i32);

    for &idx in page_indices {
        if idx >= total_pages {
            warn!(
                "Skipping page {} (out of range, total={})",
                idx + 1,
                total_pages
            );
            continue;
        }

        let page = pages
            .get(idx as u16)
            .map_err(|e| AxevoraError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            AxevoraError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        on_page(idx, image)?;
    }

    Ok(())
}

/// Rasterise selected pages of a PDF into images.
///
/// # Returns
/// A vector of `(page_index_0based, DynamicImage)` tuples.
pub async fn render_pages(
    file: &SelectedFile,
    config: &ToolkitConfig,
    page_indices: &[usize],
) -> Result<Vec<(usize, DynamicImage)>, AxevoraError> {
    file.require_pdf()?;
    let job = RenderJob::new(file, config);
    let indices = page_indices.to_vec();
    run_blocking("render", move || {
        let mut out = Vec::with_capacity(indices.len());
        render_each_blocking(&job, &indices, |idx, img| {
            out.push((idx, img));
            Ok(())
        })?;
        Ok(out)
    })
    .await
}

/// Convert selected pages to images.
///
/// One page yields the image itself; several pages yield a zip of
/// `<stem>-page-N.<ext>` entries.
pub async fn pdf_to_images(
    file: &SelectedFile,
    selection: &PageSelection,
    format: RasterFormat,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    file.require_pdf()?;
    let job = RenderJob::new(file, config);

    let count_job = job.clone();
    let total = run_blocking("page count", move || page_count_blocking(&count_job)).await?;
    let pages = selection.resolve(total, SelectionPolicy::Set)?;

    let steps = pages.len();
    let callback: Option<ProgressCallback> = config.progress_callback.clone();
    if let Some(cb) = &callback {
        cb.on_task_start("render", steps);
    }
    info!("Rendering {} of {} pages of '{}' as {:?}", steps, total, file.name, format);

    let quality = config.jpeg_quality;
    let stem = file.name.clone();
    let cb = callback.clone();
    let mut encoded = run_blocking("render", move || {
        let mut out: Vec<(usize, Vec<u8>)> = Vec::with_capacity(steps);
        render_each_blocking(&job, &pages, |idx, img| {
            out.push((idx, encode_image(&img, format, quality)?));
            if let Some(cb) = &cb {
                cb.on_step_complete(out.len(), steps);
            }
            Ok(())
        })?;
        Ok(out)
    })
    .await?;

    if let Some(cb) = &callback {
        cb.on_task_complete(steps, encoded.len());
    }

    if encoded.len() == 1 {
        let (idx, bytes) = encoded.remove(0);
        let name = derived_name(&stem, &format!("page-{}", idx + 1), format.extension());
        return Ok(Artifact::new(name, format.mime(), bytes));
    }

    let bytes = run_blocking("zip", move || {
        let mut bundle = ZipBundle::new();
        for (idx, bytes) in &encoded {
            let entry = derived_name(&stem, &format!("page-{}", idx + 1), format.extension());
            bundle.add_stored(&entry, bytes)?;
        }
        bundle.finish()
    })
    .await?;
    Ok(Artifact::zip(derived_name(&file.name, "images", "zip"), bytes))
}
