//! In-memory ZIP archive codec.
//!
//! Every exporter and importer moves datasets through this module: export
//! packages a directory tree of entries into deflate-compressed ZIP bytes,
//! import unpacks ZIP bytes into an ordered path-to-content map. Paths use
//! `/` separators and may be nested; binary entries round-trip byte-exact.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::LabelpackError;

/// A decoded archive: an ordered mapping from entry path to raw bytes.
///
/// Directory entries are skipped during decoding; only files are kept.
/// Iteration order is lexicographic by path, which keeps every downstream
/// scan deterministic regardless of the order entries were packed in.
#[derive(Clone, Debug, Default)]
pub struct Archive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl Archive {
    /// Decodes a ZIP archive from raw bytes.
    ///
    /// A corrupt archive is a fatal [`LabelpackError::ArchiveRead`]; no
    /// partial content is returned.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LabelpackError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))
            .map_err(|source| LabelpackError::ArchiveRead { source })?;

        let mut entries = BTreeMap::new();
        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .map_err(|source| LabelpackError::ArchiveRead { source })?;
            if entry.is_dir() {
                continue;
            }

            let path = entry.name().to_string();
            let mut content = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut content).map_err(LabelpackError::Io)?;
            entries.insert(path, content);
        }

        Ok(Self { entries })
    }

    /// Iterates over all entry paths in lexicographic order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the raw bytes of an entry, if present.
    pub fn bytes(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Returns an entry decoded as text, if present.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected; label and
    /// manifest files from third-party tools are not always clean.
    pub fn text(&self, path: &str) -> Option<String> {
        self.entries
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Finds the first entry path satisfying a predicate.
    pub fn find_path(&self, mut predicate: impl FnMut(&str) -> bool) -> Option<&str> {
        self.paths().find(|path| predicate(path))
    }

    /// Number of file entries in the archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the archive holds no file entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a ZIP archive in memory, entry by entry.
#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binary entry at the given path.
    pub fn add(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.entries.push((path.into(), bytes.into()));
        self
    }

    /// Adds a text entry at the given path.
    pub fn add_text(&mut self, path: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.entries.push((path.into(), text.into().into_bytes()));
        self
    }

    /// Serializes all entries into deflate-compressed ZIP bytes.
    ///
    /// Entries are written in insertion order, so identical inputs produce
    /// identical archives.
    pub fn finish(self) -> Result<Vec<u8>, LabelpackError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (path, content) in self.entries {
            writer
                .start_file(&path, options)
                .map_err(|source| LabelpackError::ArchiveWrite {
                    path: path.clone(),
                    source,
                })?;
            writer.write_all(&content).map_err(LabelpackError::Io)?;
        }

        let cursor = writer
            .finish()
            .map_err(|source| LabelpackError::ArchiveWrite {
                path: String::new(),
                source,
            })?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_binary_content() {
        let payload: Vec<u8> = (0u16..600).map(|v| (v % 251) as u8).collect();

        let mut builder = ArchiveBuilder::new();
        builder.add("images/photo.bin", payload.clone());
        builder.add_text("README.md", "# hello\n");
        let bytes = builder.finish().expect("build archive");

        let archive = Archive::from_bytes(&bytes).expect("decode archive");
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.bytes("images/photo.bin"), Some(payload.as_slice()));
        assert_eq!(archive.text("README.md").as_deref(), Some("# hello\n"));
    }

    #[test]
    fn nested_paths_are_preserved() {
        let mut builder = ArchiveBuilder::new();
        builder.add_text("ImageSets/Main/train.txt", "img001");
        let bytes = builder.finish().expect("build archive");

        let archive = Archive::from_bytes(&bytes).expect("decode archive");
        assert_eq!(
            archive.text("ImageSets/Main/train.txt").as_deref(),
            Some("img001")
        );
    }

    #[test]
    fn paths_iterate_in_lexicographic_order() {
        let mut builder = ArchiveBuilder::new();
        builder.add_text("labels/a.txt", "");
        builder.add_text("classes.txt", "");
        builder.add_text("images/a.jpg", "");
        let bytes = builder.finish().expect("build archive");

        let archive = Archive::from_bytes(&bytes).expect("decode archive");
        let paths: Vec<&str> = archive.paths().collect();
        assert_eq!(paths, vec!["classes.txt", "images/a.jpg", "labels/a.txt"]);
    }

    #[test]
    fn corrupt_archive_is_a_fatal_error() {
        let err = Archive::from_bytes(b"this is not a zip file").unwrap_err();
        assert!(matches!(err, LabelpackError::ArchiveRead { .. }));
    }
}
