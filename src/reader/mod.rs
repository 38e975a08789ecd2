//! Container file reading
//!
//! Framing (header, blocks, sync markers) lives in `header`, `block` and
//! `container`; record payloads are read through `cursor` and `decode`.

mod block;
mod container;
mod cursor;
pub mod decode;
mod header;
pub mod varint;

pub use block::{DataBlock, RawBlock};
pub use container::{ContainerReader, ReaderState};
pub use cursor::{Cursor, MAX_ZERO_WIDTH_ITEMS};
pub use decode::{decimal_from_bytes, decode_value, Value};
pub use header::{ContainerHeader, AVRO_MAGIC, CODEC_KEY, RESERVED_PREFIX, SCHEMA_KEY, SYNC_MARKER_SIZE};
pub use varint::{decode_varint, decode_zigzag, encode_varint, encode_zigzag, MAX_VARINT_LEN};
