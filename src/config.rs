//! Configuration shared by every tool operation.
//!
//! All toolkit-wide knobs live in [`ToolkitConfig`], built via its
//! [`ToolkitConfigBuilder`]. Per-operation settings (output format, bitrate,
//! rotation angle, …) are passed to the operation itself; this struct only
//! holds what stays the same across a session: rendering quality, external
//! tool locations, endpoints and timeouts.

use crate::error::AxevoraError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default public text-generation endpoint used by the caption generator.
///
/// The prompt is appended URL-encoded; the response body is plain text.
pub const DEFAULT_CAPTION_ENDPOINT: &str = "https://text.pollinations.ai/";

/// Toolkit-wide configuration.
///
/// Built via [`ToolkitConfig::builder()`] or using [`ToolkitConfig::default()`].
///
/// # Example
/// ```rust
/// use axevora::ToolkitConfig;
///
/// let config = ToolkitConfig::builder()
///     .render_dpi(200)
///     .jpeg_quality(85)
///     .ffmpeg_path("/usr/local/bin/ffmpeg")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ToolkitConfig {
    /// DPI used when rasterising PDF pages to images. Range: 72–400. Default: 150.
    pub render_dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// Caps A0 posters and other oversized pages independent of DPI.
    pub max_rendered_pixels: u32,

    /// JPEG quality for image outputs and image→PDF embedding. Range: 1–100. Default: 90.
    pub jpeg_quality: u8,

    /// Number of files converted at once in batch mode. Default: 4.
    pub concurrency: usize,

    /// ffmpeg executable. Default: `ffmpeg` (looked up on `PATH`).
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable. Default: `ffprobe`.
    pub ffprobe_path: PathBuf,

    /// Directory containing the pdfium shared library. `None` = system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Caption endpoint; the URL-encoded prompt is appended. Default: [`DEFAULT_CAPTION_ENDPOINT`].
    pub caption_endpoint: String,

    /// Timeout for caption requests in seconds. Default: 60.
    pub http_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// User password for encrypted input PDFs.
    pub password: Option<String>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            render_dpi: 150,
            max_rendered_pixels: 2000,
            jpeg_quality: 90,
            concurrency: 4,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            pdfium_library_path: None,
            caption_endpoint: DEFAULT_CAPTION_ENDPOINT.to_string(),
            http_timeout_secs: 60,
            download_timeout_secs: 120,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ToolkitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolkitConfig")
            .field("render_dpi", &self.render_dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("concurrency", &self.concurrency)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("caption_endpoint", &self.caption_endpoint)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ToolProgressCallback>"),
            )
            .finish()
    }
}

impl ToolkitConfig {
    /// Create a new builder for `ToolkitConfig`.
    pub fn builder() -> ToolkitConfigBuilder {
        ToolkitConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ToolkitConfig`].
#[derive(Debug)]
pub struct ToolkitConfigBuilder {
    config: ToolkitConfig,
}

impl ToolkitConfigBuilder {
    pub fn render_dpi(mut self, dpi: u32) -> Self {
        self.config.render_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffmpeg_path = path.into();
        self
    }

    pub fn ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffprobe_path = path.into();
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn caption_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.caption_endpoint = endpoint.into();
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.config.http_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ToolkitConfig, AxevoraError> {
        let c = &self.config;
        if c.render_dpi < 72 || c.render_dpi > 400 {
            return Err(AxevoraError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.render_dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(AxevoraError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if !(c.caption_endpoint.starts_with("http://") || c.caption_endpoint.starts_with("https://"))
        {
            return Err(AxevoraError::InvalidConfig(format!(
                "Caption endpoint must be an HTTP(S) URL, got '{}'",
                c.caption_endpoint
            )));
        }
        if c.http_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(AxevoraError::InvalidConfig(
                "Timeouts must be at least 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
