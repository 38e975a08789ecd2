//! Entry points for decoding container files into tables
//!
//! `decode_file` and `decode_bytes` use the default configuration. Use
//! [`TableReader`] to choose the decoding strategy or schema strictness.
//!
//! # Example
//! ```no_run
//! use avro_columnar::{decode_file, Parallelism, ReaderConfig, TableReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = decode_file("events.avro")?;
//! println!("{} rows", table.num_rows());
//!
//! let reader = TableReader::new(ReaderConfig::new().with_parallelism(Parallelism::Threads(4)));
//! let table = reader.read_file("events.avro")?;
//! let ids = table.column("id").and_then(|c| c.i64_values());
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use tracing::debug;

use crate::config::ReaderConfig;
use crate::error::ReaderError;
use crate::source::ByteSource;
use crate::table::{assemble, Table};

/// Decode the container file at `path` with the default configuration.
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<Table, ReaderError> {
    TableReader::default().read_file(path)
}

/// Decode a container file held in memory with the default configuration.
pub fn decode_bytes(bytes: &[u8]) -> Result<Table, ReaderError> {
    TableReader::default().read_bytes(bytes)
}

/// Configured container file decoder.
#[derive(Debug, Clone, Default)]
pub struct TableReader {
    config: ReaderConfig,
}

impl TableReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Memory-map and decode the file at `path`.
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> Result<Table, ReaderError> {
        let source = ByteSource::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), bytes = source.len(), "decoding file");
        self.read_source(&source)
    }

    /// Decode a container file held in memory.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<Table, ReaderError> {
        assemble(bytes, &self.config)
    }

    /// Decode the bytes of an opened source. The table owns all of its
    /// buffers, so the source can be dropped afterwards.
    pub fn read_source(&self, source: &ByteSource) -> Result<Table, ReaderError> {
        assemble(source.as_slice(), &self.config)
    }
}
