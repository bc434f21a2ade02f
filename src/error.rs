//! Error types for the axevora toolkit.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AxevoraError`] — **Fatal**: the operation cannot produce an artifact
//!   (bad page range, wrong password, corrupt PDF, ffmpeg missing). Returned as
//!   `Err(AxevoraError)` from every tool entry point.
//!
//! * [`ItemError`] — **Non-fatal**: one file of a batch failed while the other
//!   files converted fine. Stored inside [`crate::media::BatchItem`] so the
//!   caller can report "3 of 5 files converted".
//!
//! Fatal errors are further split by [`AxevoraError::is_user_error`]: input
//! problems are detected before any library call and leave no state behind;
//! everything else is a library or runtime failure.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the axevora library.
#[derive(Debug, Error)]
pub enum AxevoraError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file was read but this tool does not accept its format.
    #[error("Unsupported file '{name}': {detail}")]
    UnsupportedFormat { name: String, detail: String },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: [u8; 4] },

    // ── Selection errors ──────────────────────────────────────────────────
    /// The page-range text produced no valid page.
    #[error("No valid pages in '{input}' (document has {total} pages)\nUse numbers and ranges such as 1,3-5.")]
    EmptySelection { input: String, total: usize },

    /// A page number exceeds the document's page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Delete was asked to remove every page.
    #[error("Cannot delete all {total} pages: at least one page must remain")]
    CannotDeleteAllPages { total: usize },

    /// Rotation angle is not a multiple of 90.
    #[error("Rotation must be a multiple of 90 degrees, got {degrees}")]
    InvalidRotation { degrees: i32 },

    /// Operation needs more input files than were given.
    #[error("{operation} needs at least {needed} files, got {got}")]
    NotEnoughFiles {
        operation: String,
        needed: usize,
        got: usize,
    },

    // ── Password errors ───────────────────────────────────────────────────
    /// Protect / unlock was called with an empty password.
    #[error("Password must not be empty")]
    EmptyPassword,

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { name: String, detail: String },

    /// The document library failed while rewriting or serialising a PDF.
    #[error("PDF write failed: {0}")]
    PdfWriteFailed(String),

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF rendering needs the pdfium shared library.\n\
  • Install it system-wide (libpdfium.so / libpdfium.dylib / pdfium.dll), or\n\
  • Set AXEVORA_PDFIUM_PATH=/directory/containing/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Media errors ──────────────────────────────────────────────────────
    /// An external executable (ffmpeg, ffprobe) could not be started.
    #[error("'{tool}' is not available: {detail}\nInstall it or set --ffmpeg / AXEVORA_FFMPEG.")]
    ToolNotFound { tool: String, detail: String },

    /// The transcoding engine ran but failed.
    #[error("Conversion failed: {detail}")]
    TranscodeFailed { detail: String },

    /// Image decoding or encoding failed.
    #[error("Image processing failed: {0}")]
    ImageFailed(String),

    // ── Remote errors ─────────────────────────────────────────────────────
    /// The remote text-generation endpoint could not be reached or errored.
    #[error("Request to {service} failed: {reason}")]
    RequestFailed { service: String, reason: String },

    /// The remote endpoint answered with an empty body.
    #[error("{service} returned an empty response")]
    EmptyResponse { service: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Zip assembly failed.
    #[error("Archive error: {0}")]
    Archive(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AxevoraError {
    /// `true` for problems with what the user typed or picked.
    ///
    /// These are raised before any library call, so the operation left no
    /// state behind and the user can simply correct the input and retry.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AxevoraError::FileNotFound { .. }
                | AxevoraError::PermissionDenied { .. }
                | AxevoraError::InvalidInput { .. }
                | AxevoraError::UnsupportedFormat { .. }
                | AxevoraError::NotAPdf { .. }
                | AxevoraError::EmptySelection { .. }
                | AxevoraError::PageOutOfRange { .. }
                | AxevoraError::CannotDeleteAllPages { .. }
                | AxevoraError::InvalidRotation { .. }
                | AxevoraError::NotEnoughFiles { .. }
                | AxevoraError::EmptyPassword
                | AxevoraError::PasswordRequired { .. }
                | AxevoraError::InvalidConfig(_)
        )
    }
}

impl From<zip::result::ZipError> for AxevoraError {
    fn from(e: zip::result::ZipError) -> Self {
        AxevoraError::Archive(e.to_string())
    }
}

impl From<image::ImageError> for AxevoraError {
    fn from(e: image::ImageError) -> Self {
        AxevoraError::ImageFailed(e.to_string())
    }
}

/// A non-fatal error for a single file of a batch.
///
/// The batch continues with the remaining files.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The file could not be decoded.
    #[error("{name}: could not be read: {detail}")]
    DecodeFailed { name: String, detail: String },

    /// The file decoded but the conversion failed.
    #[error("{name}: conversion failed: {detail}")]
    ConvertFailed { name: String, detail: String },
}
