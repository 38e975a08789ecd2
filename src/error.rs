//! Error types for Avro container decoding
//!
//! Errors are layered the same way the reader is: `DecodeError` comes out of
//! the binary cursor and value decoder, `SchemaError` out of schema parsing,
//! `CodecError` out of block decompression. `ReaderError` is what callers see;
//! it wraps the lower layers with the block index and byte offset at which
//! decoding stopped.

use std::io;
use thiserror::Error;

/// Errors that can occur during schema parsing
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema text is not valid JSON
    #[error("Invalid schema JSON: {0}")]
    InvalidJson(String),
    /// JSON is valid but does not describe a schema
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Reference to a named type that was never defined
    #[error("Undefined named type: {0}")]
    UndefinedName(String),
    /// A named type was defined twice
    #[error("Named type defined more than once: {0}")]
    DuplicateName(String),
    /// Two union members share the same type tag
    #[error("Union contains duplicate member '{member}' at position {position}")]
    DuplicateUnionMember { member: String, position: usize },
    /// A union directly contains another union
    #[error("Union contains nested union at position {0}")]
    NestedUnion(usize),
    /// A named type refers to itself
    #[error("Recursive type '{0}' cannot be laid out as columns")]
    RecursiveType(String),
}

/// Errors that can occur during codec operations
#[derive(Debug, Error)]
pub enum CodecError {
    /// Codec name is not one of the supported algorithms
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),
    /// The block payload could not be decompressed
    #[error("{codec} decompression failed: {message}")]
    Decompression {
        codec: &'static str,
        message: String,
    },
}

/// Errors raised by the binary cursor and the value decoder
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bytes left for the requested read
    #[error("Unexpected end of data")]
    UnexpectedEof,
    /// Varint continuation chain longer than 10 bytes
    #[error("Malformed varint: continuation chain exceeds 10 bytes")]
    MalformedVarint,
    /// Negative length prefix on bytes or string
    #[error("Negative length: {0}")]
    NegativeLength(i64),
    /// Enum index outside the symbol list
    #[error("Enum index {index} out of range for {len} symbols")]
    IndexOutOfRange { index: i64, len: usize },
    /// Union branch index outside the member list
    #[error("Union branch {index} out of range for {len} members")]
    InvalidUnionBranch { index: i64, len: usize },
    /// A long value does not fit into an int
    #[error("Integer overflow: {0} does not fit in i32")]
    IntOverflow(i64),
    /// String bytes are not valid UTF-8
    #[error("Invalid UTF-8 in string value")]
    InvalidUtf8,
    /// Decimal unscaled value wider than 128 bits
    #[error("Decimal value of {len} bytes does not fit in 128 bits")]
    DecimalOverflow { len: usize },
    /// More zero-width items claimed than one block may produce
    #[error("{count} zero-width items exceed the limit of {limit} per block")]
    TooManyItems { count: usize, limit: usize },
    /// A decoded value does not have the shape its column builder expects
    #[error("Cannot append a {found} value to a {expected} column")]
    ValueMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// A column does not satisfy its layout invariants, or two columns being
/// concatenated do not share a layout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Column layout error at '{path}': {message}")]
pub struct LayoutError {
    pub path: String,
    pub message: String,
}

impl LayoutError {
    pub(crate) fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors from opening the underlying byte source
#[derive(Debug, Error)]
pub enum SourceError {
    /// IO error while opening or mapping the file
    #[error("Failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Coarse classification of a [`ReaderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unresolvable schema
    Schema,
    /// Bad magic, sync mismatch, bad block framing
    Framing,
    /// Malformed value encoding inside a block
    Encoding,
    /// Codec named in the header is not supported
    UnsupportedCodec,
    /// Block payload failed to decompress
    Codec,
    /// Byte source ended before the file did
    UnexpectedEof,
    /// The file could not be opened
    Source,
    /// Decoded fragments could not be assembled into a table
    Internal,
}

/// Top-level reader error type
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Writer schema could not be parsed
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// File does not start with the container magic
    #[error("Invalid magic bytes: expected 'Obj\\x01', found {0:?}")]
    BadMagic([u8; 4]),

    /// Header metadata has no `avro.schema` entry
    #[error("Header metadata is missing the 'avro.schema' entry")]
    MissingSchema,

    /// Header metadata is structurally invalid
    #[error("Invalid header metadata at offset {offset}: {message}")]
    InvalidMetadata { offset: u64, message: String },

    /// Non-positive block count that is not the final sentinel
    #[error("Invalid record count {count} in block {block_index} at offset {offset}")]
    InvalidBlockCount {
        block_index: usize,
        offset: u64,
        count: i64,
    },

    /// Negative block payload size
    #[error("Invalid payload size {size} in block {block_index} at offset {offset}")]
    InvalidBlockSize {
        block_index: usize,
        offset: u64,
        size: i64,
    },

    /// Sync marker after a block differs from the header's
    #[error("Sync marker mismatch after block {block_index} at offset {offset}")]
    SyncMarkerMismatch { block_index: usize, offset: u64 },

    /// Decoding `row count` records did not consume the payload exactly
    #[error(
        "Block {block_index} length mismatch: declared {expected_rows} rows, decoded {decoded_rows}, {leftover_bytes} bytes left over"
    )]
    BlockLengthMismatch {
        block_index: usize,
        expected_rows: u64,
        decoded_rows: u64,
        leftover_bytes: usize,
    },

    /// Byte source ended mid-header or mid-block
    #[error("Unexpected end of file at offset {offset} (block {block_index:?})")]
    UnexpectedEof {
        offset: u64,
        block_index: Option<usize>,
    },

    /// Record payload is malformed
    #[error("Decode error in block {block_index}, record {record_index} at payload offset {offset}: {source}")]
    Decode {
        block_index: usize,
        record_index: u64,
        offset: u64,
        #[source]
        source: DecodeError,
    },

    /// Codec error, either at header time (unsupported) or per block
    #[error("Codec error in block {block_index:?}: {source}")]
    Codec {
        block_index: Option<usize>,
        #[source]
        source: CodecError,
    },

    /// Byte source could not be opened
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Column fragments disagree on layout
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl ReaderError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReaderError::Schema(_) => ErrorKind::Schema,
            ReaderError::BadMagic(_)
            | ReaderError::MissingSchema
            | ReaderError::InvalidMetadata { .. }
            | ReaderError::InvalidBlockCount { .. }
            | ReaderError::InvalidBlockSize { .. }
            | ReaderError::SyncMarkerMismatch { .. }
            | ReaderError::BlockLengthMismatch { .. } => ErrorKind::Framing,
            ReaderError::UnexpectedEof { .. } => ErrorKind::UnexpectedEof,
            ReaderError::Decode { .. } => ErrorKind::Encoding,
            ReaderError::Codec {
                source: CodecError::UnsupportedCodec(_),
                ..
            } => ErrorKind::UnsupportedCodec,
            ReaderError::Codec { .. } => ErrorKind::Codec,
            ReaderError::Source(_) => ErrorKind::Source,
            ReaderError::Layout(_) => ErrorKind::Internal,
        }
    }

    /// Block index the error was raised in, if it is block-scoped.
    pub fn block_index(&self) -> Option<usize> {
        match self {
            ReaderError::InvalidBlockCount { block_index, .. }
            | ReaderError::InvalidBlockSize { block_index, .. }
            | ReaderError::SyncMarkerMismatch { block_index, .. }
            | ReaderError::BlockLengthMismatch { block_index, .. }
            | ReaderError::Decode { block_index, .. } => Some(*block_index),
            ReaderError::UnexpectedEof { block_index, .. }
            | ReaderError::Codec { block_index, .. } => *block_index,
            _ => None,
        }
    }
}
