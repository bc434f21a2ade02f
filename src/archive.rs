//! In-memory zip bundles.
//!
//! Split results, multi-page renders, generated sites and EPUB files are all
//! zip containers assembled from named byte buffers.

use crate::error::AxevoraError;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builder for a zip archive held in memory.
pub struct ZipBundle {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    entries: usize,
}

impl Default for ZipBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipBundle {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            entries: 0,
        }
    }

    /// Add a deflate-compressed entry.
    pub fn add(&mut self, name: &str, bytes: &[u8]) -> Result<(), AxevoraError> {
        self.add_with(name, bytes, CompressionMethod::Deflated)
    }

    /// Add an uncompressed entry (EPUB `mimetype`, already-compressed images).
    pub fn add_stored(&mut self, name: &str, bytes: &[u8]) -> Result<(), AxevoraError> {
        self.add_with(name, bytes, CompressionMethod::Stored)
    }

    fn add_with(
        &mut self,
        name: &str,
        bytes: &[u8],
        method: CompressionMethod,
    ) -> Result<(), AxevoraError> {
        let options = SimpleFileOptions::default().compression_method(method);
        self.writer.start_file(name, options)?;
        self.writer
            .write_all(bytes)
            .map_err(|e| AxevoraError::Archive(format!("writing '{name}': {e}")))?;
        self.entries += 1;
        Ok(())
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Finish the central directory and return the archive bytes.
    pub fn finish(self) -> Result<Vec<u8>, AxevoraError> {
        let cursor = self.writer.finish()?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn entries_read_back_in_order() {
        let mut bundle = ZipBundle::new();
        bundle.add_stored("mimetype", b"application/epub+zip").unwrap();
        bundle.add("a/b.txt", b"hello hello hello").unwrap();
        assert_eq!(bundle.len(), 2);
        let bytes = bundle.finish().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        {
            let first = archive.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), CompressionMethod::Stored);
        }
        let mut text = String::new();
        archive
            .by_name("a/b.txt")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "hello hello hello");
    }

    #[test]
    fn empty_bundle_is_valid_zip() {
        let bytes = ZipBundle::new().finish().unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
