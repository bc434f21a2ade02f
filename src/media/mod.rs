//! Media conversion: one async call from a selected file to an artifact.
//!
//! ```text
//! SelectedFile + ConvertOptions
//!        │
//!        ▼
//!   convert_media ──► pick a MediaConverter
//!                        ├─ ImageConverter   (image crate, in-process)
//!                        └─ FfmpegConverter  (ffmpeg child process)
//!        │
//!        ▼
//!     Artifact (bytes, file name, MIME)
//! ```
//!
//! The converter is an opaque async capability behind [`MediaConverter`].
//! Failures surface as [`AxevoraError::TranscodeFailed`] (or a more specific
//! input error); there is no retry and no partial output.

pub mod ffmpeg;
pub mod image;

pub use self::ffmpeg::FfmpegConverter;
pub use self::image::ImageConverter;

use crate::archive::ZipBundle;
use crate::config::ToolkitConfig;
use crate::error::{AxevoraError, ItemError};
use crate::input::{FileKind, SelectedFile};
use crate::output::Artifact;
use crate::pdf::encode::RasterFormat;
use crate::progress::ProgressCallback;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Audio container/codec targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Aac,
    Flac,
    Ogg,
    Opus,
    M4a,
}

/// Video container targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoFormat {
    Mp4,
    Avi,
    Mov,
    WebM,
    Mkv,
}

/// Any output a media conversion can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    Image(RasterFormat),
    Audio(AudioFormat),
    Video(VideoFormat),
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Image(f) => f.extension(),
            OutputFormat::Audio(f) => match f {
                AudioFormat::Mp3 => "mp3",
                AudioFormat::Wav => "wav",
                AudioFormat::Aac => "aac",
                AudioFormat::Flac => "flac",
                AudioFormat::Ogg => "ogg",
                AudioFormat::Opus => "opus",
                AudioFormat::M4a => "m4a",
            },
            OutputFormat::Video(f) => match f {
                VideoFormat::Mp4 => "mp4",
                VideoFormat::Avi => "avi",
                VideoFormat::Mov => "mov",
                VideoFormat::WebM => "webm",
                VideoFormat::Mkv => "mkv",
            },
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Image(f) => f.mime(),
            OutputFormat::Audio(f) => match f {
                AudioFormat::Mp3 => "audio/mpeg",
                AudioFormat::Wav => "audio/wav",
                AudioFormat::Aac => "audio/aac",
                AudioFormat::Flac => "audio/flac",
                AudioFormat::Ogg => "audio/ogg",
                AudioFormat::Opus => "audio/opus",
                AudioFormat::M4a => "audio/mp4",
            },
            OutputFormat::Video(f) => match f {
                VideoFormat::Mp4 => "video/mp4",
                VideoFormat::Avi => "video/x-msvideo",
                VideoFormat::Mov => "video/quicktime",
                VideoFormat::WebM => "video/webm",
                VideoFormat::Mkv => "video/x-matroska",
            },
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, OutputFormat::Image(_))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = AxevoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().trim_start_matches('.').to_ascii_lowercase();
        let format = match lower.as_str() {
            "mp3" => OutputFormat::Audio(AudioFormat::Mp3),
            "wav" => OutputFormat::Audio(AudioFormat::Wav),
            "aac" => OutputFormat::Audio(AudioFormat::Aac),
            "flac" => OutputFormat::Audio(AudioFormat::Flac),
            "ogg" => OutputFormat::Audio(AudioFormat::Ogg),
            "opus" => OutputFormat::Audio(AudioFormat::Opus),
            "m4a" => OutputFormat::Audio(AudioFormat::M4a),
            "mp4" => OutputFormat::Video(VideoFormat::Mp4),
            "avi" => OutputFormat::Video(VideoFormat::Avi),
            "mov" => OutputFormat::Video(VideoFormat::Mov),
            "webm" => OutputFormat::Video(VideoFormat::WebM),
            "mkv" => OutputFormat::Video(VideoFormat::Mkv),
            other => OutputFormat::Image(other.parse::<RasterFormat>().map_err(|_| {
                AxevoraError::UnsupportedFormat {
                    name: s.to_string(),
                    detail: "unknown output format".into(),
                }
            })?),
        };
        Ok(format)
    }
}

/// Per-conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertOptions {
    pub output_format: OutputFormat,
    /// Target bitrate for audio/video in kbit/s. `None` = encoder default.
    pub bitrate_kbps: Option<u32>,
    /// JPEG quality override (1–100). `None` = [`ToolkitConfig::jpeg_quality`].
    pub quality: Option<u8>,
    /// Downscale images wider than this.
    pub max_width: Option<u32>,
    /// Downscale images taller than this.
    pub max_height: Option<u32>,
}

impl ConvertOptions {
    pub fn new(output_format: OutputFormat) -> Self {
        Self {
            output_format,
            bitrate_kbps: None,
            quality: None,
            max_width: None,
            max_height: None,
        }
    }

    pub fn bitrate_kbps(mut self, kbps: u32) -> Self {
        self.bitrate_kbps = Some(kbps);
        self
    }

    pub fn quality(mut self, q: u8) -> Self {
        self.quality = Some(q.clamp(1, 100));
        self
    }

    pub fn max_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }
}

/// An opaque conversion capability.
///
/// Implementations report progress as 0–100 through
/// [`crate::progress::ToolProgressCallback::on_percent`].
pub trait MediaConverter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this converter handles `input` → `output`.
    fn supports(&self, input: FileKind, output: OutputFormat) -> bool;

    fn convert<'a>(
        &'a self,
        file: &'a SelectedFile,
        options: &'a ConvertOptions,
        progress: Option<&'a ProgressCallback>,
    ) -> BoxFuture<'a, Result<Artifact, AxevoraError>>;
}

/// Choose the converter for a file and options.
pub fn converter_for(
    file: &SelectedFile,
    options: &ConvertOptions,
    config: &ToolkitConfig,
) -> Result<Box<dyn MediaConverter>, AxevoraError> {
    let candidates: [Box<dyn MediaConverter>; 2] = [
        Box::new(ImageConverter::from_config(config)),
        Box::new(FfmpegConverter::from_config(config)),
    ];
    if file.kind == FileKind::Heic {
        return Err(AxevoraError::UnsupportedFormat {
            name: file.name.clone(),
            detail: "HEIC images are not supported; export as JPEG or PNG first".into(),
        });
    }
    candidates
        .into_iter()
        .find(|c| c.supports(file.kind, options.output_format))
        .ok_or_else(|| AxevoraError::UnsupportedFormat {
            name: file.name.clone(),
            detail: format!("cannot convert {:?} input to {}", file.kind, options.output_format),
        })
}

/// Convert one file.
///
/// Progress goes to `config.progress_callback` as a single percent task.
pub async fn convert_media(
    file: &SelectedFile,
    options: &ConvertOptions,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    let converter = converter_for(file, options, config)?;
    let progress = config.progress_callback.as_ref();
    if let Some(cb) = progress {
        cb.on_task_start("convert", 0);
    }
    info!(
        "Converting '{}' to {} with {}",
        file.name,
        options.output_format,
        converter.name()
    );
    let result = converter.convert(file, options, progress).await;
    if let Some(cb) = progress {
        cb.on_task_complete(1, usize::from(result.is_ok()));
    }
    result
}

/// Outcome for one file of a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Input file name.
    pub name: String,
    pub result: Result<Artifact, ItemError>,
}

/// Convert several files, up to `config.concurrency` at once.
///
/// One file failing does not stop the others. Results come back in input
/// order.
pub async fn convert_batch(
    files: &[SelectedFile],
    options: &ConvertOptions,
    config: &ToolkitConfig,
) -> Vec<BatchItem> {
    let total = files.len();
    let callback = config.progress_callback.clone();
    if let Some(cb) = &callback {
        cb.on_task_start("batch convert", total);
    }

    // Each item converts without the shared callback so per-file percentages
    // don't interleave; the batch reports steps instead.
    let mut item_config = config.clone();
    item_config.progress_callback = None;
    let item_config = &item_config;

    let mut done = 0usize;
    let mut indexed: Vec<(usize, BatchItem)> = stream::iter(files.iter().enumerate())
        .map(|(i, file)| async move {
            let result = convert_media(file, options, item_config)
                .await
                .map_err(|e| item_error(file, e));
            (
                i,
                BatchItem {
                    name: file.name.clone(),
                    result,
                },
            )
        })
        .buffer_unordered(config.concurrency.max(1))
        .inspect(|(_, item)| {
            done += 1;
            if let Some(cb) = &callback {
                match &item.result {
                    Ok(_) => cb.on_step_complete(done, total),
                    Err(e) => cb.on_step_error(done, total, &e.to_string()),
                }
            }
        })
        .collect()
        .await;

    indexed.sort_by_key(|(i, _)| *i);
    let items: Vec<BatchItem> = indexed.into_iter().map(|(_, item)| item).collect();
    let ok = items.iter().filter(|i| i.result.is_ok()).count();
    if ok < total {
        warn!("{} of {} files failed to convert", total - ok, total);
    }
    if let Some(cb) = &callback {
        cb.on_task_complete(total, ok);
    }
    items
}

fn item_error(file: &SelectedFile, e: AxevoraError) -> ItemError {
    match e {
        AxevoraError::UnsupportedFormat { detail, .. } => ItemError::DecodeFailed {
            name: file.name.clone(),
            detail,
        },
        other => ItemError::ConvertFailed {
            name: file.name.clone(),
            detail: other.to_string(),
        },
    }
}

/// Zip the successful outputs of a batch. Duplicate names get a numeric suffix.
pub fn bundle_batch(items: &[BatchItem]) -> Result<Artifact, AxevoraError> {
    let mut bundle = ZipBundle::new();
    let mut used = std::collections::HashSet::new();
    for item in items {
        let Ok(artifact) = &item.result else {
            continue;
        };
        let mut name = artifact.file_name.clone();
        let mut n = 2;
        while !used.insert(name.clone()) {
            name = match artifact.file_name.rsplit_once('.') {
                Some((stem, ext)) => format!("{stem}-{n}.{ext}"),
                None => format!("{}-{n}", artifact.file_name),
            };
            n += 1;
        }
        bundle.add(&name, &artifact.bytes)?;
    }
    Ok(Artifact::zip("converted.zip", bundle.finish()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::encode::encode_image;
    use ::image::{DynamicImage, Rgb, RgbImage};

    fn png(name: &str) -> SelectedFile {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])));
        SelectedFile::from_bytes(name, encode_image(&img, RasterFormat::Png, 90).unwrap())
    }

    #[test]
    fn parse_output_formats() {
        assert_eq!("MP3".parse::<OutputFormat>().unwrap(), OutputFormat::Audio(AudioFormat::Mp3));
        assert_eq!(".webm".parse::<OutputFormat>().unwrap(), OutputFormat::Video(VideoFormat::WebM));
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Image(RasterFormat::Jpeg));
        assert!("docx".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn extension_and_mime_agree() {
        let f = OutputFormat::Audio(AudioFormat::M4a);
        assert_eq!(f.extension(), "m4a");
        assert_eq!(f.mime(), "audio/mp4");
    }

    #[test]
    fn converter_selection() {
        let config = ToolkitConfig::default();
        let img = png("a.png");
        let c = converter_for(&img, &ConvertOptions::new("webp".parse().unwrap()), &config).unwrap();
        assert_eq!(c.name(), "image");

        let audio = SelectedFile::from_bytes("a.wav", b"RIFF\0\0\0\0WAVEfmt ".to_vec());
        let c = converter_for(&audio, &ConvertOptions::new("mp3".parse().unwrap()), &config).unwrap();
        assert_eq!(c.name(), "ffmpeg");

        let err = converter_for(&img, &ConvertOptions::new("mp3".parse().unwrap()), &config).err().expect("expected error");
        assert!(matches!(err, AxevoraError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn batch_keeps_order_and_isolates_failures() {
        let config = ToolkitConfig::builder().concurrency(2).build().unwrap();
        let files = vec![
            png("one.png"),
            SelectedFile::from_bytes("broken.png", b"\x89PNG\r\n\x1a\nnope".to_vec()),
            png("three.png"),
        ];
        let items = convert_batch(&files, &ConvertOptions::new("jpg".parse().unwrap()), &config).await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].name, "one.png");
        assert!(items[0].result.is_ok());
        assert!(matches!(items[1].result, Err(ItemError::DecodeFailed { .. })));
        assert!(items[2].result.is_ok());

        let zip = bundle_batch(&items).unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(zip.bytes)).unwrap();
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn bundle_renames_duplicates() {
        let a = Artifact::new("x.jpg", "image/jpeg", vec![1]);
        let items = vec![
            BatchItem { name: "x.png".into(), result: Ok(a.clone()) },
            BatchItem { name: "x.bmp".into(), result: Ok(a) },
        ];
        let zip = bundle_batch(&items).unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(zip.bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"x.jpg"));
        assert!(names.contains(&"x-2.jpg"));
    }
}
