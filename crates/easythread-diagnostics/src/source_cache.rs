//! Source file cache used to resolve spans for rendering.

use crate::span::{FileId, Location, Span};
use std::path::{Path, PathBuf};

/// A cached source file with its line index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub source: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(id: FileId, path: PathBuf, source: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                source
                    .match_indices('\n')
                    .map(|(i, _)| (i + 1) as u32),
            )
            .collect();
        Self {
            id,
            path,
            source,
            line_starts,
        }
    }

    /// 1-indexed line and column of a byte offset.
    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        ((line_idx + 1) as u32, offset - line_start + 1)
    }

    /// Text of a 1-indexed line without its terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        let idx = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(idx)? as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&e| e as usize)
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches(['\n', '\r']))
    }
}

/// Files registered for diagnostic rendering, indexed by [`FileId`].
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Vec<SourceFile>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Register a file. Re-adding a path returns its existing id.
    pub fn add_file(&mut self, path: impl AsRef<Path>, source: String) -> FileId {
        let path = path.as_ref();
        if let Some(file) = self.files.iter().find(|f| f.path == path) {
            return file.id;
        }
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile::new(id, path.to_path_buf(), source));
        id
    }

    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    /// Resolve a span's start to a [`Location`].
    pub fn location(&self, span: Span) -> Option<Location> {
        if span.is_dummy() {
            return None;
        }
        let file = self.get_file(span.file_id)?;
        let (line, column) = file.line_column(span.start);
        Some(Location {
            file: file.path.to_string_lossy().into_owned(),
            line,
            column,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("a.ts", "// @easythread\nfunction f() {}\n".to_string());
        let file = cache.get_file(id).unwrap();

        assert_eq!(file.line_column(0), (1, 1));
        assert_eq!(file.line_column(15), (2, 1));
        assert_eq!(file.line_column(24), (2, 10));
    }

    #[test]
    fn test_line_text() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("a.ts", "one\r\ntwo\nthree".to_string());
        let file = cache.get_file(id).unwrap();

        assert_eq!(file.line_text(1), Some("one"));
        assert_eq!(file.line_text(2), Some("two"));
        assert_eq!(file.line_text(3), Some("three"));
        assert_eq!(file.line_text(0), None);
        assert_eq!(file.line_text(4), None);
    }

    #[test]
    fn test_add_file_dedups_paths() {
        let mut cache = SourceCache::new();
        let a = cache.add_file("a.ts", String::new());
        let b = cache.add_file("b.ts", String::new());
        assert_ne!(a, b);
        assert_eq!(cache.add_file("a.ts", String::new()), a);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_location() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("src/app.tsx", "let x = 1;\nlet y = 2;".to_string());
        let loc = cache.location(Span::new(id, 15, 16)).unwrap();
        assert_eq!(loc.to_string(), "src/app.tsx:2:5");
        assert!(cache.location(Span::DUMMY).is_none());
    }
}
