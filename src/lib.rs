//! # axevora
//!
//! A toolkit of file conversion utilities: PDF page tools, image / audio /
//! video conversion, PDF → EPUB, an on-page SEO analyzer, a social caption
//! generator and a one-page website generator.
//!
//! ## Why this crate?
//!
//! Each tool is a thin wrapper: it takes one selected file plus a few
//! settings, hands the real work to a proven library or engine, and returns
//! the output bytes as an [`Artifact`] ready to download. The wrappers share
//! one page-range parser, one error type and one progress callback, so every
//! tool behaves the same way on bad input.
//!
//! ## Tool Overview
//!
//! ```text
//! SelectedFile (path or URL)
//!  │
//!  ├─ pdf::ops       delete / extract / rearrange / rotate / split / merge   (lopdf)
//!  ├─ pdf::security  protect / unlock                                          (lopdf)
//!  ├─ pdf::render    PDF → PNG / JPEG / WebP pages                            (pdfium)
//!  ├─ pdf::images    images → PDF                                             (image + lopdf)
//!  ├─ pdf::text      PDF → text,  epub: PDF → EPUB                            (lopdf + zip)
//!  ├─ media          image, audio and video conversion                        (image, ffmpeg)
//!  └─ seo            HTML → 0–100 score and issue list                        (html5ever)
//!
//! text prompt
//!  ├─ caption        prompt → remote text endpoint → caption
//!  └─ sitegen        business name + industry → HTML / CSS / JS bundle
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axevora::{pdf::ops::rearrange_pages, resolve_input, PageSelection, ToolkitConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ToolkitConfig::default();
//!     let file = resolve_input("report.pdf", config.download_timeout_secs).await?;
//!     let out = rearrange_pages(&file, &PageSelection::parse("3,1,2"), &config).await?;
//!     out.write_to(&out.file_name).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `axevora` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! axevora = { version = "0.4", default-features = false }
//! ```
//!
//! ## External Engines
//!
//! | Engine | Needed by | Located via |
//! |--------|-----------|-------------|
//! | pdfium | PDF → image, `render_stream` | `AXEVORA_PDFIUM_PATH` or system library |
//! | ffmpeg / ffprobe | audio and video conversion | `PATH`, `AXEVORA_FFMPEG`, `AXEVORA_FFPROBE` |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archive;
pub mod caption;
pub mod catalog;
pub mod config;
pub mod epub;
pub mod error;
pub mod input;
pub mod media;
pub mod output;
pub mod pdf;
pub mod progress;
pub mod ranges;
pub mod seo;
pub mod sitegen;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use caption::{generate_caption, generate_captions, CaptionRequest};
pub use catalog::{all_tools, find_tool, HeadMetadata, ToolInfo};
pub use config::{ToolkitConfig, ToolkitConfigBuilder};
pub use epub::pdf_to_epub;
pub use error::{AxevoraError, ItemError};
pub use input::{resolve_input, FileKind, SelectedFile};
pub use media::{convert_batch, convert_media, ConvertOptions, MediaConverter, OutputFormat};
pub use output::Artifact;
pub use pdf::encode::RasterFormat;
pub use pdf::{PdfDocument, PdfInfo};
pub use progress::{NoopProgressCallback, ProgressCallback, ToolProgressCallback};
pub use ranges::{format_ranges, parse_ranges, PageSelection, SelectionPolicy};
pub use seo::{analyze_html, SeoReport};
pub use sitegen::{generate_site, GeneratedSite, SiteRequest};
pub use stream::render_stream;
