//! Source text owned by a build pass, indexed for line/column lookup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque identifier for a source file held by a [`SourceDb`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct FileId(u32);

impl FileId {
    /// A dummy file ID used for diagnostics without a source location.
    pub const DUMMY: FileId = FileId(u32::MAX);

    /// Creates a `FileId` from a raw `u32` value.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw `u32` value of this `FileId`.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// A byte offset range within a source file. `start` is inclusive, `end` exclusive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Span {
    /// The source file this span belongs to.
    pub file: FileId,
    /// Byte offset of the start of the span.
    pub start: u32,
    /// Byte offset of the end of the span.
    pub end: u32,
}

impl Span {
    /// A dummy span used when no source location is available.
    pub const DUMMY: Span = Span {
        file: FileId::DUMMY,
        start: 0,
        end: 0,
    };

    /// Creates a new span in the given file with the given byte range.
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Returns `true` if this is the dummy span.
    pub fn is_dummy(&self) -> bool {
        self.file == FileId::DUMMY
    }
}

/// A source file with precomputed line starts.
pub struct SourceFile {
    /// Path shown in rendered diagnostics (project-relative where possible).
    pub path: PathBuf,
    /// The full text content of the file.
    pub content: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(path: PathBuf, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        Self {
            path,
            content,
            line_starts,
        }
    }

    /// Converts a byte offset into 1-indexed (line, column) coordinates.
    ///
    /// Offsets past the end of the file resolve to the last position.
    pub fn line_col(&self, byte_offset: u32) -> (u32, u32) {
        let offset = byte_offset.min(self.content.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line = (line_idx as u32) + 1;
        let col = offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Returns the full line of text containing `byte_offset`, without the newline.
    pub fn line_text(&self, byte_offset: u32) -> &str {
        let (line, _) = self.line_col(byte_offset);
        let start = self.line_starts[(line - 1) as usize] as usize;
        let end = self
            .line_starts
            .get(line as usize)
            .map_or(self.content.len(), |next| (*next as usize).saturating_sub(1));
        self.content
            .get(start..end)
            .unwrap_or_default()
            .trim_end_matches('\r')
    }
}

fn compute_line_starts(content: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push((i + 1) as u32);
        }
    }
    starts
}

/// The sources that produced diagnostics during one build pass.
#[derive(Default)]
pub struct SourceDb {
    files: Vec<SourceFile>,
}

impl SourceDb {
    /// Creates an empty source database.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Adds a source file and returns its [`FileId`].
    pub fn add_source(&mut self, path: impl Into<PathBuf>, content: String) -> FileId {
        let id = FileId::from_raw(self.files.len() as u32);
        self.files.push(SourceFile::new(path.into(), content));
        id
    }

    /// Returns the [`SourceFile`] for `id`, or `None` for unknown or dummy IDs.
    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.as_raw() as usize)
    }

    /// Number of files held.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no files have been added.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file(content: &str) -> SourceFile {
        SourceFile::new(PathBuf::from("src/a.ts"), content.to_string())
    }

    #[test]
    fn line_starts_computation() {
        let f = make_file("abc\ndef\nghi");
        assert_eq!(f.line_starts, vec![0, 4, 8]);
    }

    #[test]
    fn line_col_resolution() {
        let f = make_file("abc\ndef\nghi");
        assert_eq!(f.line_col(0), (1, 1));
        assert_eq!(f.line_col(4), (2, 1));
        assert_eq!(f.line_col(5), (2, 2));
        assert_eq!(f.line_col(8), (3, 1));
    }

    #[test]
    fn line_col_clamps_past_end() {
        let f = make_file("ab");
        assert_eq!(f.line_col(99), (1, 3));
    }

    #[test]
    fn line_text_extraction() {
        let f = make_file("const a = 1;\r\nconst b = ;\nlast");
        assert_eq!(f.line_text(0), "const a = 1;");
        assert_eq!(f.line_text(16), "const b = ;");
        assert_eq!(f.line_text(30), "last");
    }

    #[test]
    fn dummy_span() {
        assert!(Span::DUMMY.is_dummy());
        assert!(!Span::new(FileId::from_raw(0), 0, 1).is_dummy());
    }

    #[test]
    fn db_lookup() {
        let mut db = SourceDb::new();
        let a = db.add_source("a.ts", "one".to_string());
        let b = db.add_source("b.ts", "two".to_string());
        assert_ne!(a, b);
        assert_eq!(db.len(), 2);
        assert_eq!(db.get_file(b).unwrap().content, "two");
        assert!(db.get_file(FileId::DUMMY).is_none());
    }
}
