//! PDF tools.
//!
//! ```text
//! SelectedFile ──► document::PdfDocument::load (lopdf)
//!                      │
//!                      ├─ ops        delete / extract / rearrange / rotate / split / merge
//!                      ├─ security   protect / unlock
//!                      ├─ text       PDF → plain text
//!                      └─ render     PDF → page images (pdfium) ──► encode
//! images ──► images::images_to_pdf
//! ```
//!
//! lopdf and pdfium are synchronous; every public entry point here is async
//! and moves the work onto the blocking pool with [`run_blocking`].

pub mod document;
pub mod encode;
pub mod images;
pub mod ops;
pub mod render;
pub mod security;
pub mod text;

pub use document::{PdfDocument, PdfInfo};

use crate::error::AxevoraError;

/// Run CPU-bound document work on tokio's blocking pool.
pub(crate) async fn run_blocking<T, F>(task: &'static str, f: F) -> Result<T, AxevoraError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AxevoraError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AxevoraError::Internal(format!("{task} task panicked: {e}")))?
}
