//! Byte sources
//!
//! A container file is decoded from one immutable, contiguous byte range.
//! Files are memory-mapped; buffers that already live in memory are wrapped
//! without copying. Both are cheap to clone and can be read from many
//! threads at once.

use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::error::SourceError;

/// Immutable bytes of one container file.
#[derive(Debug, Clone)]
pub enum ByteSource {
    /// Memory-mapped file
    Mmap { map: Arc<Mmap>, path: PathBuf },
    /// In-memory buffer
    Bytes(Bytes),
}

impl ByteSource {
    /// Memory-map the file at `path`.
    ///
    /// Empty files are returned as an empty in-memory source, since a
    /// zero-length mapping is not portable.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let io_error = |source| SourceError::Io {
            path: path.display().to_string(),
            source,
        };

        let file = File::open(&path).map_err(io_error)?;
        let len = file.metadata().map_err(io_error)?.len();
        if len == 0 {
            debug!(path = %path.display(), "opened empty file");
            return Ok(ByteSource::Bytes(Bytes::new()));
        }

        // Safety: the mapping is read-only. Truncating the file while it is
        // mapped is undefined behaviour that callers must avoid.
        let map = unsafe { MmapOptions::new().map(&file) }.map_err(io_error)?;
        debug!(path = %path.display(), len, "memory-mapped file");
        Ok(ByteSource::Mmap {
            map: Arc::new(map),
            path,
        })
    }

    /// Wrap bytes already in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        ByteSource::Bytes(bytes.into())
    }

    /// Path of a mapped file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ByteSource::Mmap { path, .. } => Some(path.as_path()),
            ByteSource::Bytes(_) => None,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            ByteSource::Mmap { map, .. } => &map[..],
            ByteSource::Bytes(bytes) => &bytes[..],
        }
    }
}

impl Deref for ByteSource {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for ByteSource {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        ByteSource::from_bytes(bytes)
    }
}

impl From<Bytes> for ByteSource {
    fn from(bytes: Bytes) -> Self {
        ByteSource::Bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_maps_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Obj\x01payload").unwrap();
        file.flush().unwrap();

        let source = ByteSource::open(file.path()).unwrap();
        assert_eq!(&source[..], b"Obj\x01payload");
        assert_eq!(source.path(), Some(file.path()));
    }

    #[test]
    fn test_open_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = ByteSource::open(file.path()).unwrap();
        assert!(source.is_empty());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ByteSource::open(dir.path().join("missing.avro")).unwrap_err();
        assert!(err.to_string().contains("missing.avro"));
    }

    #[test]
    fn test_from_bytes_is_shared() {
        let source = ByteSource::from(vec![1u8, 2, 3]);
        let clone = source.clone();
        assert_eq!(source.as_slice(), clone.as_slice());
        assert_eq!(source.len(), 3);
    }
}
