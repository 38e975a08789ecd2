//! Container file state machine
//!
//! `Start -> HeaderParsed -> (BlockReady -> BlockConsumed)* -> Eof`
//!
//! [`ContainerReader::new`] performs the first transition. Each call to
//! [`ContainerReader::next_block`] frames one block, checks the sync marker
//! that follows it and hands the still-compressed payload to the caller.
//! Reaching the end of the source exactly at a block boundary is the only
//! successful way out.

use tracing::{debug, trace};

use crate::error::{DecodeError, ReaderError};
use crate::reader::block::RawBlock;
use crate::reader::cursor::Cursor;
use crate::reader::header::{ContainerHeader, SYNC_MARKER_SIZE};

/// Reader position within the container state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Header parsed, no block read yet
    HeaderParsed,
    /// At least one block handed out, more may follow
    BlockConsumed,
    /// Source exhausted at a block boundary
    Eof,
}

/// Frames the blocks of a container file held in memory.
#[derive(Debug)]
pub struct ContainerReader<'a> {
    data: &'a [u8],
    header: ContainerHeader,
    pos: usize,
    block_index: usize,
    state: ReaderState,
}

impl<'a> ContainerReader<'a> {
    /// Parse the header and position the reader at the first block.
    pub fn new(data: &'a [u8], strict_schema: bool) -> Result<Self, ReaderError> {
        let header = ContainerHeader::parse_with_options(data, strict_schema)?;
        let pos = header.header_size as usize;
        Ok(Self {
            data,
            header,
            pos,
            block_index: 0,
            state: ReaderState::HeaderParsed,
        })
    }

    /// The parsed header.
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Consume the reader, keeping the header.
    pub fn into_header(self) -> ContainerHeader {
        self.header
    }

    /// Current state.
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Offset of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.pos as u64
    }

    /// Frame the next block.
    ///
    /// Returns `Ok(None)` once the source ends at a block boundary. A
    /// non-positive record count is accepted as an end sentinel only when
    /// nothing follows it.
    pub fn next_block(&mut self) -> Result<Option<RawBlock<'a>>, ReaderError> {
        if self.state == ReaderState::Eof {
            return Ok(None);
        }
        if self.pos == self.data.len() {
            self.finish();
            return Ok(None);
        }

        let block_index = self.block_index;
        let base = self.pos;
        let data: &'a [u8] = self.data;
        let mut cursor = Cursor::new(&data[base..]);

        let count = cursor.read_long().map_err(|e| self.framing_error(e, base))?;
        if count <= 0 {
            if cursor.is_empty() {
                self.pos = data.len();
                self.finish();
                return Ok(None);
            }
            return Err(ReaderError::InvalidBlockCount {
                block_index,
                offset: base as u64,
                count,
            });
        }

        let size_offset = base + cursor.position();
        let size = cursor
            .read_long()
            .map_err(|e| self.framing_error(e, size_offset))?;
        if size < 0 {
            return Err(ReaderError::InvalidBlockSize {
                block_index,
                offset: size_offset as u64,
                size,
            });
        }

        let payload_offset = base + cursor.position();
        let payload = usize::try_from(size)
            .map_err(|_| DecodeError::UnexpectedEof)
            .and_then(|size| cursor.read_exact(size))
            .map_err(|e| self.framing_error(e, payload_offset))?;

        let sync_offset = base + cursor.position();
        let sync = cursor
            .read_exact(SYNC_MARKER_SIZE)
            .map_err(|e| self.framing_error(e, sync_offset))?;
        if sync != self.header.sync_marker {
            return Err(ReaderError::SyncMarkerMismatch {
                block_index,
                offset: sync_offset as u64,
            });
        }

        self.pos = base + cursor.position();
        self.block_index += 1;
        self.state = ReaderState::BlockConsumed;

        trace!(
            block_index,
            offset = base,
            rows = count,
            payload_len = payload.len(),
            "framed block"
        );

        Ok(Some(RawBlock {
            index: block_index,
            offset: base as u64,
            row_count: count as u64,
            payload,
        }))
    }

    /// Frame every remaining block.
    ///
    /// All sync markers are verified before this returns, so corruption is
    /// reported before any payload is decoded.
    pub fn frame_all(&mut self) -> Result<Vec<RawBlock<'a>>, ReaderError> {
        let mut blocks = Vec::new();
        while let Some(block) = self.next_block()? {
            blocks.push(block);
        }

        debug!(
            blocks = blocks.len(),
            rows = blocks.iter().fold(0u64, |sum, b| sum.saturating_add(b.row_count)),
            "framed container"
        );
        Ok(blocks)
    }

    fn finish(&mut self) {
        self.state = ReaderState::Eof;
    }

    fn framing_error(&self, err: DecodeError, offset: usize) -> ReaderError {
        match err {
            DecodeError::UnexpectedEof => ReaderError::UnexpectedEof {
                offset: offset as u64,
                block_index: Some(self.block_index),
            },
            source => ReaderError::Decode {
                block_index: self.block_index,
                record_index: 0,
                offset: offset as u64,
                source,
            },
        }
    }
}

impl<'a> Iterator for ContainerReader<'a> {
    type Item = Result<RawBlock<'a>, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => None,
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reader::header::{AVRO_MAGIC, SCHEMA_KEY};
    use crate::reader::varint::encode_zigzag;

    const SYNC: [u8; 16] = *b"0123456789abcdef";

    fn header_bytes() -> Vec<u8> {
        let schema = br#""long""#;
        let mut data = AVRO_MAGIC.to_vec();
        data.extend(encode_zigzag(1));
        data.extend(encode_zigzag(SCHEMA_KEY.len() as i64));
        data.extend_from_slice(SCHEMA_KEY.as_bytes());
        data.extend(encode_zigzag(schema.len() as i64));
        data.extend_from_slice(schema);
        data.push(0);
        data.extend_from_slice(&SYNC);
        data
    }

    fn push_block(data: &mut Vec<u8>, values: &[i64]) {
        let mut payload = Vec::new();
        for v in values {
            payload.extend(encode_zigzag(*v));
        }
        data.extend(encode_zigzag(values.len() as i64));
        data.extend(encode_zigzag(payload.len() as i64));
        data.extend(payload);
        data.extend_from_slice(&SYNC);
    }

    #[test]
    fn test_frames_blocks_in_order() {
        let mut data = header_bytes();
        let first_block = data.len() as u64;
        push_block(&mut data, &[1, 2, 3]);
        push_block(&mut data, &[-4]);

        let mut reader = ContainerReader::new(&data, false).unwrap();
        assert_eq!(reader.state(), ReaderState::HeaderParsed);
        assert_eq!(reader.offset(), first_block);

        let blocks = reader.frame_all().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].index, 0);
        assert_eq!(blocks[0].offset, first_block);
        assert_eq!(blocks[0].row_count, 3);
        assert_eq!(blocks[0].payload, &[0x02, 0x04, 0x06]);
        assert_eq!(blocks[1].index, 1);
        assert_eq!(blocks[1].row_count, 1);
        assert_eq!(reader.state(), ReaderState::Eof);
        assert!(reader.next_block().unwrap().is_none());
    }

    #[test]
    fn test_zero_blocks() {
        let data = header_bytes();
        let mut reader = ContainerReader::new(&data, false).unwrap();
        assert!(reader.next_block().unwrap().is_none());
        assert_eq!(reader.state(), ReaderState::Eof);
    }

    #[test]
    fn test_trailing_zero_count_is_end_sentinel() {
        let mut data = header_bytes();
        push_block(&mut data, &[1]);
        data.push(0x00);
        let mut reader = ContainerReader::new(&data, false).unwrap();
        assert_eq!(reader.frame_all().unwrap().len(), 1);
    }

    #[test]
    fn test_zero_count_mid_file_is_invalid() {
        let mut data = header_bytes();
        let offset = data.len() as u64;
        data.extend(encode_zigzag(0));
        data.extend(encode_zigzag(0));
        data.extend_from_slice(&SYNC);

        let mut reader = ContainerReader::new(&data, false).unwrap();
        let err = reader.next_block().unwrap_err();
        assert!(matches!(
            err,
            ReaderError::InvalidBlockCount { block_index: 0, offset: o, count: 0 } if o == offset
        ));
    }

    #[test]
    fn test_negative_size() {
        let mut data = header_bytes();
        data.extend(encode_zigzag(1));
        data.extend(encode_zigzag(-3));
        data.extend_from_slice(&SYNC);

        let mut reader = ContainerReader::new(&data, false).unwrap();
        assert!(matches!(
            reader.next_block(),
            Err(ReaderError::InvalidBlockSize { size: -3, .. })
        ));
    }

    #[test]
    fn test_sync_mismatch() {
        let mut data = header_bytes();
        push_block(&mut data, &[1, 2]);
        let last = data.len() - 1;
        data[last] ^= 0xFF;

        let mut reader = ContainerReader::new(&data, false).unwrap();
        let err = reader.next_block().unwrap_err();
        assert!(matches!(err, ReaderError::SyncMarkerMismatch { block_index: 0, .. }));
        assert_eq!(err.kind(), ErrorKind::Framing);
    }

    #[test]
    fn test_truncated_block() {
        let mut data = header_bytes();
        push_block(&mut data, &[1, 2]);
        push_block(&mut data, &[3, 4]);
        data.truncate(data.len() - 5);

        let reader = ContainerReader::new(&data, false).unwrap();
        let results: Vec<_> = reader.collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        assert_eq!(err.block_index(), Some(1));
    }

    #[test]
    fn test_truncated_payload() {
        let mut data = header_bytes();
        let block_start = data.len() as u64;
        data.extend(encode_zigzag(1));
        data.extend(encode_zigzag(100));
        data.extend_from_slice(&[0u8; 10]);

        let mut reader = ContainerReader::new(&data, false).unwrap();
        // The offset points at the payload that was cut, past count and size.
        assert!(matches!(
            reader.next_block(),
            Err(ReaderError::UnexpectedEof {
                offset,
                block_index: Some(0),
            }) if offset == block_start + 3
        ));
    }

    #[test]
    fn test_truncated_sync_reports_sync_offset() {
        let mut data = header_bytes();
        push_block(&mut data, &[7]);
        let sync_offset = data.len() as u64 - SYNC.len() as u64;
        data.truncate(data.len() - 4);

        let mut reader = ContainerReader::new(&data, false).unwrap();
        match reader.next_block() {
            Err(ReaderError::UnexpectedEof { offset, block_index }) => {
                assert_eq!(offset, sync_offset);
                assert_eq!(block_index, Some(0));
            }
            other => panic!("unexpected result: {:?}", other.map(|b| b.map(|b| b.index))),
        }
    }
}
