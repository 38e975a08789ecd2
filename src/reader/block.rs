//! Data block framing
//!
//! Each block in a container file is laid out as:
//! - Record count (zigzag varint)
//! - Payload size in bytes (zigzag varint)
//! - Payload, compressed with the file codec
//! - 16-byte sync marker (must match the header)

use std::borrow::Cow;

use tracing::trace;

use crate::codec::Codec;
use crate::error::ReaderError;

/// A framed block whose payload is still compressed.
///
/// The payload borrows the byte source, so framing a whole file allocates
/// nothing but the block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBlock<'a> {
    /// Zero-based position of the block in the file
    pub index: usize,
    /// File offset of the block's record count
    pub offset: u64,
    /// Declared number of records
    pub row_count: u64,
    /// Compressed payload bytes
    pub payload: &'a [u8],
}

impl<'a> RawBlock<'a> {
    /// Length of the compressed payload.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Decompress the payload with the file codec.
    pub fn decompress(
        &self,
        codec: Codec,
        verify_checksum: bool,
    ) -> Result<DataBlock<'a>, ReaderError> {
        let payload = codec
            .decompress_with(self.payload, verify_checksum)
            .map_err(|source| ReaderError::Codec {
                block_index: Some(self.index),
                source,
            })?;

        trace!(
            block_index = self.index,
            rows = self.row_count,
            compressed = self.payload.len(),
            decompressed = payload.len(),
            "decompressed block"
        );

        Ok(DataBlock {
            index: self.index,
            row_count: self.row_count,
            payload,
        })
    }
}

/// A block ready for record decoding.
#[derive(Debug, Clone)]
pub struct DataBlock<'a> {
    /// Zero-based position of the block in the file
    pub index: usize,
    /// Declared number of records
    pub row_count: u64,
    /// Uncompressed payload; borrowed for the null codec
    pub payload: Cow<'a, [u8]>,
}

impl DataBlock<'_> {
    /// Check if the block declares no records.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CodecError, ErrorKind};

    #[test]
    fn test_null_codec_borrows_payload() {
        let data = [1u8, 2, 3];
        let raw = RawBlock {
            index: 0,
            offset: 40,
            row_count: 3,
            payload: &data,
        };
        let block = raw.decompress(Codec::Null, true).unwrap();
        assert!(matches!(block.payload, Cow::Borrowed(_)));
        assert_eq!(block.row_count, 3);
        assert!(!block.is_empty());
        assert_eq!(raw.payload_len(), 3);
    }

    #[cfg(feature = "deflate")]
    #[test]
    fn test_decompress_error_carries_block_index() {
        let data = [0xFFu8; 8];
        let raw = RawBlock {
            index: 5,
            offset: 100,
            row_count: 1,
            payload: &data,
        };
        let err = raw.decompress(Codec::Deflate, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
        assert_eq!(err.block_index(), Some(5));
        assert!(matches!(
            err,
            ReaderError::Codec {
                source: CodecError::Decompression { codec: "deflate", .. },
                ..
            }
        ));
    }
}
