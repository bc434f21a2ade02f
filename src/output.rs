//! Tool outputs: the bytes a user would download.
//!
//! Every operation resolves to an [`Artifact`]: output bytes plus the file
//! name and MIME type a browser download would carry. Callers either write it
//! to disk ([`Artifact::write_to`]) or embed it ([`Artifact::data_url`]).

use crate::error::AxevoraError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Output of one tool operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Suggested download file name, e.g. `report-rotated.pdf`.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub mime: String,
    /// Output bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Shorthand for a PDF artifact.
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, "application/pdf", bytes)
    }

    /// Shorthand for a zip bundle.
    pub fn zip(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, "application/zip", bytes)
    }

    /// Size of the output in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:` URL carrying the whole artifact, base64-encoded.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// Write the artifact to `path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<(), AxevoraError> {
        let path = path.as_ref();
        let fail = |e: std::io::Error| AxevoraError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(fail)?;
            }
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = std::path::PathBuf::from(tmp_name);

        tokio::fs::write(&tmp_path, &self.bytes).await.map_err(fail)?;
        tokio::fs::rename(&tmp_path, path).await.map_err(fail)?;

        info!("Wrote {} ({} bytes)", path.display(), self.bytes.len());
        Ok(())
    }
}

/// Derive an output file name from an input name.
///
/// `derived_name("report.pdf", "rotated", "pdf")` → `report-rotated.pdf`.
pub fn derived_name(input_name: &str, suffix: &str, extension: &str) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("output");
    if suffix.is_empty() {
        format!("{stem}.{extension}")
    } else {
        format!("{stem}-{suffix}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_roundtrips_through_base64() {
        let a = Artifact::new("a.txt", "text/plain", b"hello".to_vec());
        let url = a.data_url();
        assert_eq!(url, "data:text/plain;base64,aGVsbG8=");
    }

    #[test]
    fn derived_names() {
        assert_eq!(derived_name("report.pdf", "rotated", "pdf"), "report-rotated.pdf");
        assert_eq!(derived_name("song.flac", "", "mp3"), "song.mp3");
        assert_eq!(derived_name("", "x", "zip"), "output-x.zip");
        assert_eq!(derived_name("dir/a.b.c.png", "small", "jpg"), "a.b-small.jpg");
    }

    #[tokio::test]
    async fn write_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.pdf");
        let a = Artifact::pdf("out.pdf", b"%PDF-1.5".to_vec());
        a.write_to(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5");
        assert!(!dir.path().join("nested/out.pdf.tmp").exists());
    }
}
