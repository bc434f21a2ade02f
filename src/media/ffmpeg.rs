//! Audio/video transcoding through an `ffmpeg` child process.
//!
//! The input is written to a temporary directory, ffmpeg runs with
//! `-progress pipe:1` so machine-readable `key=value` progress blocks arrive
//! on stdout, and the output file is read back once ffmpeg exits. Percentages
//! are `out_time / duration`, where the duration comes from `ffprobe`. When
//! the duration is unknown only 0 and 100 are reported.
//!
//! The child is spawned with `kill_on_drop`, so dropping the conversion
//! future stops ffmpeg.

use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use crate::input::{FileKind, SelectedFile};
use crate::media::{AudioFormat, ConvertOptions, MediaConverter, OutputFormat, VideoFormat};
use crate::output::{derived_name, Artifact};
use crate::progress::{PercentReporter, ProgressCallback};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Bytes of ffmpeg's stderr kept for error messages.
const STDERR_TAIL: usize = 1500;

/// Transcodes with an external ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegConverter {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &ToolkitConfig) -> Self {
        Self::new(&config.ffmpeg_path, &config.ffprobe_path)
    }

    /// Media duration in seconds, or `None` if ffprobe is missing or unsure.
    pub async fn probe_duration(&self, input: &Path) -> Option<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(input)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| debug!("ffprobe unavailable: {}", e))
            .ok()?;
        if !output.status.success() {
            return None;
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Run ffmpeg from `input` to `output`, forwarding progress.
    async fn run(
        &self,
        input: &Path,
        output: &Path,
        codec: &[String],
        duration: Option<f64>,
        reporter: &mut PercentReporter<'_>,
    ) -> Result<(), AxevoraError> {
        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-hide_banner", "-nostdin", "-y", "-i"])
            .arg(input)
            .args(["-progress", "pipe:1", "-nostats"])
            .args(codec)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!("Running {:?}", command);

        let mut child = command.spawn().map_err(|e| spawn_error(&self.ffmpeg, e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AxevoraError::Internal("ffmpeg stdout not captured".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AxevoraError::Internal("ffmpeg stderr not captured".into()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| AxevoraError::TranscodeFailed {
                detail: format!("reading ffmpeg progress: {e}"),
            })?
        {
            match parse_progress_line(&line) {
                ProgressLine::OutTimeMicros(us) => {
                    if let Some(p) = percent_of(us, duration) {
                        reporter.report(p);
                    }
                }
                ProgressLine::End => reporter.report(100),
                ProgressLine::Other => {}
            }
        }

        let status = child.wait().await.map_err(|e| AxevoraError::TranscodeFailed {
            detail: format!("waiting for ffmpeg: {e}"),
        })?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if !status.success() {
            warn!("ffmpeg exited with {}", status);
            return Err(AxevoraError::TranscodeFailed {
                detail: format!("ffmpeg exited with {status}: {}", tail(&stderr_text, STDERR_TAIL)),
            });
        }
        Ok(())
    }
}

fn spawn_error(tool: &Path, e: std::io::Error) -> AxevoraError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AxevoraError::ToolNotFound {
            tool: tool.display().to_string(),
            detail: "executable not found".into(),
        }
    } else {
        AxevoraError::ToolNotFound {
            tool: tool.display().to_string(),
            detail: e.to_string(),
        }
    }
}

/// First line of `<tool> -version`, e.g. `ffmpeg version 6.1.1`.
pub async fn tool_version(tool: &Path) -> Result<String, AxevoraError> {
    let output = Command::new(tool)
        .arg("-version")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| spawn_error(tool, e))?;
    let text = String::from_utf8_lossy(&output.stdout);
    Ok(text.lines().next().unwrap_or_default().trim().to_string())
}

/// One line of ffmpeg `-progress` output, reduced to what matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLine {
    /// Output timestamp in microseconds.
    OutTimeMicros(u64),
    /// `progress=end`.
    End,
    Other,
}

/// Parse a `key=value` progress line.
///
/// Both `out_time_us` and the misnamed `out_time_ms` carry microseconds.
pub fn parse_progress_line(line: &str) -> ProgressLine {
    let Some((key, value)) = line.trim().split_once('=') else {
        return ProgressLine::Other;
    };
    match key {
        "out_time_us" | "out_time_ms" => value
            .trim()
            .parse::<u64>()
            .map(ProgressLine::OutTimeMicros)
            .unwrap_or(ProgressLine::Other),
        "progress" if value.trim() == "end" => ProgressLine::End,
        _ => ProgressLine::Other,
    }
}

/// `out_us` as a percentage of `duration` seconds, capped at 99 until ffmpeg
/// reports the end.
pub fn percent_of(out_us: u64, duration: Option<f64>) -> Option<u8> {
    let duration = duration?;
    let pct = (out_us as f64 / 1_000_000.0) / duration * 100.0;
    Some(pct.clamp(0.0, 99.0) as u8)
}

/// ffmpeg arguments selecting codecs for `output`.
pub fn codec_args(
    input: FileKind,
    output: OutputFormat,
    bitrate_kbps: Option<u32>,
) -> Result<Vec<String>, AxevoraError> {
    let mut args: Vec<&str> = Vec::new();
    let mut lossy_audio = true;
    let mut video_bitrate = false;

    match output {
        OutputFormat::Audio(format) => {
            args.push("-vn");
            let codec = match format {
                AudioFormat::Mp3 => "libmp3lame",
                AudioFormat::Wav => {
                    lossy_audio = false;
                    "pcm_s16le"
                }
                AudioFormat::Aac | AudioFormat::M4a => "aac",
                AudioFormat::Flac => {
                    lossy_audio = false;
                    "flac"
                }
                AudioFormat::Ogg => "libvorbis",
                AudioFormat::Opus => "libopus",
            };
            args.extend(["-c:a", codec]);
        }
        OutputFormat::Video(format) => {
            if input != FileKind::Video {
                return Err(AxevoraError::UnsupportedFormat {
                    name: output.extension().to_string(),
                    detail: "video output needs a video input".into(),
                });
            }
            video_bitrate = true;
            match format {
                VideoFormat::Mp4 | VideoFormat::Mov => args.extend([
                    "-c:v", "libx264", "-preset", "medium", "-pix_fmt", "yuv420p", "-c:a", "aac",
                    "-movflags", "+faststart",
                ]),
                VideoFormat::Mkv => args.extend(["-c:v", "libx264", "-preset", "medium", "-c:a", "aac"]),
                VideoFormat::WebM => {
                    args.extend(["-c:v", "libvpx-vp9", "-row-mt", "1", "-c:a", "libopus"])
                }
                VideoFormat::Avi => args.extend(["-c:v", "mpeg4", "-q:v", "5", "-c:a", "libmp3lame"]),
            }
        }
        OutputFormat::Image(_) => {
            return Err(AxevoraError::UnsupportedFormat {
                name: output.extension().to_string(),
                detail: "image outputs are handled natively".into(),
            });
        }
    }

    let mut args: Vec<String> = args.into_iter().map(String::from).collect();
    if let Some(kbps) = bitrate_kbps.filter(|k| *k > 0) {
        if video_bitrate {
            args.extend(["-b:v".to_string(), format!("{kbps}k")]);
        } else if lossy_audio {
            args.extend(["-b:a".to_string(), format!("{kbps}k")]);
        }
    }
    Ok(args)
}

fn tail(text: &str, max: usize) -> &str {
    let text = text.trim();
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

impl MediaConverter for FfmpegConverter {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn supports(&self, input: FileKind, output: OutputFormat) -> bool {
        match output {
            OutputFormat::Audio(_) => input.is_media(),
            OutputFormat::Video(_) => input == FileKind::Video,
            OutputFormat::Image(_) => false,
        }
    }

    fn convert<'a>(
        &'a self,
        file: &'a SelectedFile,
        options: &'a ConvertOptions,
        progress: Option<&'a ProgressCallback>,
    ) -> BoxFuture<'a, Result<Artifact, AxevoraError>> {
        Box::pin(async move {
            let codec = codec_args(file.kind, options.output_format, options.bitrate_kbps)?;
            let mut reporter = PercentReporter::new(progress);
            reporter.report(0);

            let dir = tempfile::tempdir()
                .map_err(|e| AxevoraError::Internal(format!("tempdir: {e}")))?;
            let in_ext = file.extension().unwrap_or_else(|| "bin".to_string());
            let input = dir.path().join(format!("input.{in_ext}"));
            let output = dir
                .path()
                .join(format!("output.{}", options.output_format.extension()));

            tokio::fs::write(&input, &file.bytes)
                .await
                .map_err(|e| AxevoraError::Internal(format!("staging input: {e}")))?;

            let duration = self.probe_duration(&input).await;
            info!(
                "Transcoding '{}' → {} (duration {:?}s)",
                file.name, options.output_format, duration
            );

            self.run(&input, &output, &codec, duration, &mut reporter).await?;

            let bytes = tokio::fs::read(&output)
                .await
                .map_err(|e| AxevoraError::TranscodeFailed {
                    detail: format!("ffmpeg produced no output: {e}"),
                })?;
            if bytes.is_empty() {
                return Err(AxevoraError::TranscodeFailed {
                    detail: "ffmpeg produced an empty file".into(),
                });
            }
            reporter.report(100);

            Ok(Artifact::new(
                derived_name(&file.name, "", options.output_format.extension()),
                options.output_format.mime(),
                bytes,
            ))
        })
    }
}
