//! SourceMap - owns the byte buffers of every file registered for one
//! compilation, and answers line/column queries for [`Span`](super::Span)s.

use super::FileId;
use std::path::{Path, PathBuf};

/// One loaded source file: its path, its owned text, and the byte offset of
/// the start of each line (for O(log n) line/column lookup).
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(path: PathBuf, content: String) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { path, content, line_starts }
    }

    /// Converts a byte offset to a 1-based (line, column) pair.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        let column = self.content[line_start as usize..offset as usize].chars().count() as u32 + 1;
        (line_idx as u32 + 1, column)
    }

    /// Returns the raw text of one (1-based) source line, without the
    /// trailing newline — used to render the underline under a diagnostic.
    pub fn line_text(&self, line: u32) -> &str {
        let idx = line.saturating_sub(1) as usize;
        let start = self.line_starts.get(idx).copied().unwrap_or(0) as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&e| e as usize)
            .unwrap_or(self.content.len());
        self.content[start..end].trim_end_matches(['\n', '\r'])
    }
}

/// Owns every [`SourceFile`] loaded during one compilation.
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file's contents and returns the [`FileId`] assigned to it.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, content: String) -> FileId {
        let id = FileId::new(self.files.len() as u32);
        self.files.push(SourceFile::new(path.into(), content));
        id
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.index()]
    }

    pub fn path(&self, id: FileId) -> &Path {
        &self.files[id.index()].path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_tracks_newlines() {
        let mut map = SourceMap::new();
        let id = map.add_file("t.bas", "DIM x\nDIM y\n".to_string());
        let file = map.file(id);
        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(6), (2, 1));
    }

    #[test]
    fn line_text_strips_newline() {
        let mut map = SourceMap::new();
        let id = map.add_file("t.bas", "FIRST\nSECOND".to_string());
        let file = map.file(id);
        assert_eq!(file.line_text(1), "FIRST");
        assert_eq!(file.line_text(2), "SECOND");
    }
}
