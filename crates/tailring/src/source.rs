//! Byte-addressable span sources with independent per-worker readers.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A seekable stream of span lines of known length.
///
/// Every call to [`open_at`](SpanSource::open_at) must return a reader that is
/// independent of all others, so workers can read their ranges in parallel.
pub trait SpanSource: Send + Sync {
    /// Total length in bytes. Failing here aborts the ingestion run.
    fn byte_len(&self) -> io::Result<u64>;

    /// Opens a fresh reader positioned at `offset`.
    fn open_at(&self, offset: u64) -> io::Result<Box<dyn Read + Send>>;
}

/// Span file on local disk; each reader gets its own file handle.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SpanSource for FileSource {
    fn byte_len(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn open_at(&self, offset: u64) -> io::Result<Box<dyn Read + Send>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(Box::new(file))
    }
}

/// In-memory span data shared between readers.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }
}

impl From<&str> for MemorySource {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

impl From<String> for MemorySource {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

impl SpanSource for MemorySource {
    fn byte_len(&self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn open_at(&self, offset: u64) -> io::Result<Box<dyn Read + Send>> {
        let mut cursor = Cursor::new(Arc::clone(&self.data));
        cursor.set_position(offset.min(self.data.len() as u64));
        Ok(Box::new(cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_source_readers_are_independent() {
        let source = MemorySource::from("0123456789");
        assert_eq!(source.byte_len().unwrap(), 10);

        let mut a = String::new();
        let mut b = String::new();
        source.open_at(2).unwrap().read_to_string(&mut a).unwrap();
        source.open_at(7).unwrap().read_to_string(&mut b).unwrap();
        assert_eq!(a, "23456789");
        assert_eq!(b, "789");
    }

    #[test]
    fn test_memory_source_offset_past_end_reads_nothing() {
        let source = MemorySource::from("abc");
        let mut out = Vec::new();
        source.open_at(99).unwrap().read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_file_source() {
        let path = std::env::temp_dir().join(format!("tailring-source-{}.data", std::process::id()));
        File::create(&path).unwrap().write_all(b"T1|a\nT2|b\n").unwrap();

        let source = FileSource::new(&path);
        assert_eq!(source.byte_len().unwrap(), 10);
        let mut rest = String::new();
        source.open_at(5).unwrap().read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "T2|b\n");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_fails_length() {
        let source = FileSource::new("/nonexistent/tailring/trace.data");
        assert!(source.byte_len().is_err());
    }
}
