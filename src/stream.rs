//! Streaming render API: emit page images as they complete.
//!
//! ## Why stream?
//!
//! Rendering a long document takes a while. A streams-based API lets callers
//! show thumbnails immediately, drive progress bars, or write pages to disk
//! incrementally instead of buffering every image in memory.
//!
//! Unlike the eager [`crate::pdf::render::pdf_to_images`], which returns only
//! after all pages finish, [`render_stream`] yields [`RenderedPage`] items as
//! pdfium produces them, in page order. A failure ends the stream with one
//! `Err` item.

use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use crate::input::SelectedFile;
use crate::output::{derived_name, Artifact};
use crate::pdf::encode::{encode_image, RasterFormat};
use crate::pdf::render::{page_count_blocking, render_each_blocking, RenderJob};
use crate::pdf::run_blocking;
use crate::ranges::{PageSelection, SelectionPolicy};
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// Pages buffered ahead of a slow consumer.
const CHANNEL_CAPACITY: usize = 4;

/// One encoded page image.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-indexed page number.
    pub page: usize,
    pub width: u32,
    pub height: u32,
    pub format: RasterFormat,
    pub bytes: Vec<u8>,
}

impl RenderedPage {
    /// Wrap as an artifact named after the source file.
    pub fn into_artifact(self, source_name: &str) -> Artifact {
        let name = derived_name(
            source_name,
            &format!("page-{}", self.page),
            self.format.extension(),
        );
        Artifact::new(name, self.format.mime(), self.bytes)
    }
}

/// A boxed stream of rendered pages.
pub type PageImageStream = Pin<Box<dyn Stream<Item = Result<RenderedPage, AxevoraError>> + Send>>;

/// Render selected pages, streaming each one as soon as it is encoded.
///
/// # Returns
/// - `Ok(PageImageStream)`: a stream of `Result<RenderedPage, AxevoraError>`
/// - `Err(AxevoraError)`: fatal error before rendering started (not a PDF,
///   pdfium missing, empty selection, wrong password)
///
/// # Example
/// ```rust,no_run
/// use axevora::{render_stream, PageSelection, RasterFormat, SelectedFile, ToolkitConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let file = SelectedFile::from_bytes("doc.pdf", std::fs::read("doc.pdf")?);
/// let config = ToolkitConfig::default();
/// let mut pages = render_stream(&file, &PageSelection::All, RasterFormat::Png, &config).await?;
/// while let Some(page) = pages.next().await {
///     let page = page?;
///     println!("page {}: {}x{}", page.page, page.width, page.height);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn render_stream(
    file: &SelectedFile,
    selection: &PageSelection,
    format: RasterFormat,
    config: &ToolkitConfig,
) -> Result<PageImageStream, AxevoraError> {
    file.require_pdf()?;
    let job = RenderJob::new(file, config);

    let count_job = job.clone();
    let total = run_blocking("page count", move || page_count_blocking(&count_job)).await?;
    let pages = selection.resolve(total, SelectionPolicy::Set)?;
    info!("Streaming {} pages of '{}'", pages.len(), file.name);

    let quality = config.jpeg_quality;
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        let result = render_each_blocking(&job, &pages, |idx, img| {
            let bytes = encode_image(&img, format, quality)?;
            let page = RenderedPage {
                page: idx + 1,
                width: img.width(),
                height: img.height(),
                format,
                bytes,
            };
            if tx.blocking_send(Ok(page)).is_err() {
                // Receiver dropped; stop rendering.
                return Err(AxevoraError::Internal("stream closed".into()));
            }
            Ok(())
        });
        if let Err(e) = result {
            debug!("Render stream ended: {}", e);
            let _ = tx.blocking_send(Err(e));
        }
    });

    Ok(Box::pin(ReceiverStream::new(rx)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_page_artifact_name() {
        let page = RenderedPage {
            page: 3,
            width: 1,
            height: 1,
            format: RasterFormat::Jpeg,
            bytes: vec![1, 2, 3],
        };
        let a = page.into_artifact("report.pdf");
        assert_eq!(a.file_name, "report-page-3.jpg");
        assert_eq!(a.mime, "image/jpeg");
    }

    #[tokio::test]
    async fn non_pdf_fails_before_streaming() {
        let file = SelectedFile::from_bytes("a.txt", b"plain".to_vec());
        let result = render_stream(&file, &PageSelection::All, RasterFormat::Png, &ToolkitConfig::default()).await;
        assert!(matches!(result, Err(AxevoraError::NotAPdf { .. })));
    }
}
