//! Input resolution: turn a user-supplied path or URL into a [`SelectedFile`].
//!
//! Every tool operates on exactly one selected file at a time. The file is
//! read fully into memory (the browser equivalent is a `File` blob) and its
//! kind is sniffed from magic bytes first, then from the extension, so a
//! mislabelled `scan.png` that is really a JPEG still decodes correctly.

use crate::error::AxevoraError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Broad classification of a selected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Pdf,
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Tiff,
    Heic,
    Audio,
    Video,
    Html,
    Text,
    Unknown,
}

impl FileKind {
    /// `true` for raster formats the `image` crate can decode.
    pub fn is_decodable_image(self) -> bool {
        matches!(
            self,
            FileKind::Png
                | FileKind::Jpeg
                | FileKind::Gif
                | FileKind::WebP
                | FileKind::Bmp
                | FileKind::Tiff
        )
    }

    pub fn is_media(self) -> bool {
        matches!(self, FileKind::Audio | FileKind::Video)
    }

    /// Best-effort MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Png => "image/png",
            FileKind::Jpeg => "image/jpeg",
            FileKind::Gif => "image/gif",
            FileKind::WebP => "image/webp",
            FileKind::Bmp => "image/bmp",
            FileKind::Tiff => "image/tiff",
            FileKind::Heic => "image/heic",
            FileKind::Audio => "audio/mpeg",
            FileKind::Video => "video/mp4",
            FileKind::Html => "text/html",
            FileKind::Text => "text/plain",
            FileKind::Unknown => "application/octet-stream",
        }
    }
}

/// A user-supplied file held for the duration of one operation.
#[derive(Clone)]
pub struct SelectedFile {
    /// File name without directories, e.g. `report.pdf`.
    pub name: String,
    /// Full contents.
    pub bytes: Vec<u8>,
    /// Sniffed kind.
    pub kind: FileKind,
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .field("kind", &self.kind)
            .finish()
    }
}

impl SelectedFile {
    /// Wrap in-memory bytes, sniffing the kind.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let kind = sniff_kind(&name, &bytes);
        Self { name, bytes, kind }
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn mime(&self) -> &'static str {
        self.kind.mime()
    }

    /// Lower-cased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Fail with [`AxevoraError::NotAPdf`] unless the bytes open with `%PDF-`.
    pub fn require_pdf(&self) -> Result<(), AxevoraError> {
        if self.bytes.starts_with(PDF_MAGIC) {
            return Ok(());
        }
        let mut magic = [0u8; 4];
        let n = self.bytes.len().min(4);
        magic[..n].copy_from_slice(&self.bytes[..n]);
        Err(AxevoraError::NotAPdf {
            name: self.name.clone(),
            magic,
        })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a [`SelectedFile`].
///
/// If the input is a URL, download it. If the input is a local file, validate
/// it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SelectedFile, AxevoraError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Read a local file fully into memory.
async fn read_local(path_str: &str) -> Result<SelectedFile, AxevoraError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(AxevoraError::PermissionDenied { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AxevoraError::FileNotFound { path });
        }
        Err(_) if path.is_dir() => {
            return Err(AxevoraError::InvalidInput {
                input: path_str.to_string(),
            });
        }
        Err(_) => return Err(AxevoraError::FileNotFound { path }),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path_str.to_string());
    let file = SelectedFile::from_bytes(name, bytes);
    debug!("Resolved local file: {} ({:?}, {} bytes)", path.display(), file.kind, file.size());
    Ok(file)
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<SelectedFile, AxevoraError> {
    info!("Downloading: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AxevoraError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AxevoraError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AxevoraError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AxevoraError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AxevoraError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes as {}", bytes.len(), filename);
    Ok(SelectedFile::from_bytes(filename, bytes.to_vec()))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "download".to_string()
}

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Sniff the file kind from magic bytes, falling back to the extension.
///
/// A `.pdf` name alone never makes a file a PDF; only the header does.
pub fn sniff_kind(name: &str, bytes: &[u8]) -> FileKind {
    if bytes.starts_with(PDF_MAGIC) {
        return FileKind::Pdf;
    }
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return FileKind::Png;
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return FileKind::Jpeg;
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return FileKind::Gif;
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" {
        match &bytes[8..12] {
            b"WEBP" => return FileKind::WebP,
            b"WAVE" => return FileKind::Audio,
            b"AVI " => return FileKind::Video,
            _ => {}
        }
    }
    if bytes.starts_with(b"BM") && bytes.len() > 14 {
        return FileKind::Bmp;
    }
    if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        return FileKind::Tiff;
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return match &bytes[8..12] {
            b"heic" | b"heix" | b"mif1" | b"msf1" | b"hevc" => FileKind::Heic,
            b"M4A " | b"M4B " => FileKind::Audio,
            _ => FileKind::Video,
        };
    }
    if bytes.starts_with(b"ID3")
        || bytes.starts_with(b"fLaC")
        || bytes.starts_with(b"OggS")
        || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)
    {
        return FileKind::Audio;
    }
    if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return FileKind::Video;
    }
    kind_from_extension(name)
}

fn kind_from_extension(name: &str) -> FileKind {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => FileKind::Png,
        "jpg" | "jpeg" => FileKind::Jpeg,
        "gif" => FileKind::Gif,
        "webp" => FileKind::WebP,
        "bmp" => FileKind::Bmp,
        "tif" | "tiff" => FileKind::Tiff,
        "heic" | "heif" => FileKind::Heic,
        "mp3" | "wav" | "aac" | "flac" | "ogg" | "opus" | "m4a" | "wma" => FileKind::Audio,
        "mp4" | "avi" | "mov" | "webm" | "mkv" | "flv" | "wmv" | "m4v" => FileKind::Video,
        "html" | "htm" => FileKind::Html,
        "txt" | "md" => FileKind::Text,
        _ => FileKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn sniff_by_magic_beats_extension() {
        assert_eq!(sniff_kind("scan.png", &[0xFF, 0xD8, 0xFF, 0xE0]), FileKind::Jpeg);
        assert_eq!(sniff_kind("x.bin", b"%PDF-1.7\n"), FileKind::Pdf);
        assert_eq!(sniff_kind("a", b"RIFF\0\0\0\0WEBPVP8 "), FileKind::WebP);
        assert_eq!(sniff_kind("a", b"RIFF\0\0\0\0WAVEfmt "), FileKind::Audio);
        assert_eq!(sniff_kind("a", b"\0\0\0\x18ftypheic"), FileKind::Heic);
        assert_eq!(sniff_kind("a", b"\0\0\0\x18ftypisom"), FileKind::Video);
    }

    #[test]
    fn sniff_falls_back_to_extension() {
        assert_eq!(sniff_kind("page.HTML", b"<!doctype html>"), FileKind::Html);
        assert_eq!(sniff_kind("clip.mov", b"\0\0\0\0"), FileKind::Video);
        assert_eq!(sniff_kind("notes", b"hello"), FileKind::Unknown);
    }

    #[test]
    fn require_pdf_reports_magic() {
        let f = SelectedFile::from_bytes("a.png", b"\x89PNG\r\n\x1a\n".to_vec());
        match f.require_pdf() {
            Err(AxevoraError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn pdf_extension_does_not_override_content() {
        let f = SelectedFile::from_bytes("notes.pdf", b"hello world".to_vec());
        assert_eq!(f.kind, FileKind::Unknown);
        match f.require_pdf() {
            Err(AxevoraError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"hell"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn require_pdf_handles_tiny_files() {
        let f = SelectedFile::from_bytes("a", b"x".to_vec());
        assert!(f.require_pdf().is_err());
    }

    #[test]
    fn filename_from_url() {
        assert_eq!(extract_filename("https://x.org/files/a.pdf?x=1"), "a.pdf");
        assert_eq!(extract_filename("https://x.org/"), "download");
    }

    #[tokio::test]
    async fn missing_local_file() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, AxevoraError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn local_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.4\n").unwrap();
        let f = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(f.name, "doc.pdf");
        assert_eq!(f.kind, FileKind::Pdf);
        assert_eq!(f.size(), 9);
    }
}
