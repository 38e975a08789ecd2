//! Container file header parsing
//!
//! The header is the first section of a container file:
//! - Magic bytes (`Obj\x01`)
//! - Metadata map of string keys to byte values, holding the writer schema
//!   and the codec name
//! - 16-byte sync marker repeated after every data block

use std::collections::HashMap;

use tracing::debug;

use crate::codec::Codec;
use crate::error::{CodecError, DecodeError, ReaderError, SchemaError};
use crate::reader::cursor::Cursor;
use crate::schema::{parse_schema_with_options, AvroSchema};

/// The magic bytes that identify a container file.
pub const AVRO_MAGIC: [u8; 4] = [b'O', b'b', b'j', 0x01];

/// Length of the sync marker.
pub const SYNC_MARKER_SIZE: usize = 16;

/// Metadata key holding the writer schema JSON.
pub const SCHEMA_KEY: &str = "avro.schema";

/// Metadata key holding the codec name.
pub const CODEC_KEY: &str = "avro.codec";

/// Prefix reserved for format-defined metadata keys.
pub const RESERVED_PREFIX: &str = "avro.";

/// Parsed container header.
#[derive(Debug, Clone)]
pub struct ContainerHeader {
    /// Every metadata entry, reserved keys included
    pub metadata: HashMap<String, Vec<u8>>,
    /// Sync marker expected after each block
    pub sync_marker: [u8; SYNC_MARKER_SIZE],
    /// Writer schema from `avro.schema`
    pub schema: AvroSchema,
    /// Codec from `avro.codec`, `null` when absent
    pub codec: Codec,
    /// Offset of the first data block
    pub header_size: u64,
}

impl ContainerHeader {
    /// Parse a header in permissive schema mode.
    pub fn parse(bytes: &[u8]) -> Result<Self, ReaderError> {
        Self::parse_with_options(bytes, false)
    }

    /// Parse a header from the start of `bytes`.
    ///
    /// # Errors
    /// - `ReaderError::BadMagic` if the file does not start with `Obj\x01`
    /// - `ReaderError::UnexpectedEof` if the header is truncated
    /// - `ReaderError::InvalidMetadata` if the metadata map is malformed
    /// - `ReaderError::MissingSchema` if `avro.schema` is absent
    /// - `ReaderError::Schema` if the schema does not parse
    /// - `ReaderError::Codec` if the codec is unknown or compiled out
    pub fn parse_with_options(bytes: &[u8], strict_schema: bool) -> Result<Self, ReaderError> {
        let mut cursor = Cursor::new(bytes);

        parse_magic(&mut cursor)?;
        let metadata = parse_metadata(&mut cursor)?;
        let sync_marker = parse_sync_marker(&mut cursor)?;
        let schema = extract_schema(&metadata, strict_schema)?;
        let codec = extract_codec(&metadata)?;
        let header_size = cursor.position() as u64;

        debug!(
            codec = %codec,
            header_size,
            metadata_entries = metadata.len(),
            "parsed container header"
        );

        Ok(Self {
            metadata,
            sync_marker,
            schema,
            codec,
            header_size,
        })
    }

    /// Get the schema as a JSON string.
    pub fn schema_json(&self) -> String {
        self.schema.to_json()
    }

    /// Get a metadata value by key.
    pub fn get_metadata(&self, key: &str) -> Option<&[u8]> {
        self.metadata.get(key).map(|v| v.as_slice())
    }

    /// Metadata entries outside the reserved `avro.` namespace.
    pub fn user_metadata(&self) -> HashMap<String, Vec<u8>> {
        self.metadata
            .iter()
            .filter(|(key, _)| !key.starts_with(RESERVED_PREFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

fn parse_magic(cursor: &mut Cursor<'_>) -> Result<(), ReaderError> {
    let available = cursor.remaining().min(AVRO_MAGIC.len());
    let mut magic = [0u8; 4];
    magic[..available].copy_from_slice(cursor.read_exact(available).map_err(eof_at(0))?);

    if magic[..available] != AVRO_MAGIC[..available] {
        return Err(ReaderError::BadMagic(magic));
    }
    if available < AVRO_MAGIC.len() {
        return Err(ReaderError::UnexpectedEof {
            offset: available as u64,
            block_index: None,
        });
    }
    Ok(())
}

/// Parse the metadata map.
///
/// The map uses the same chunked encoding as record maps: item counts
/// terminated by zero, negative counts followed by a byte size.
fn parse_metadata(cursor: &mut Cursor<'_>) -> Result<HashMap<String, Vec<u8>>, ReaderError> {
    let mut metadata = HashMap::new();

    loop {
        let offset = cursor.position() as u64;
        let count = cursor
            .read_chunk_len()
            .map_err(metadata_error(offset, "block count"))?;
        if count == 0 {
            return Ok(metadata);
        }

        for _ in 0..count {
            let offset = cursor.position() as u64;
            let key = cursor
                .read_string()
                .map_err(metadata_error(offset, "key"))?;

            let offset = cursor.position() as u64;
            let value = cursor
                .read_bytes()
                .map_err(metadata_error(offset, "value"))?;

            metadata.insert(key.to_string(), value.to_vec());
        }
    }
}

fn parse_sync_marker(cursor: &mut Cursor<'_>) -> Result<[u8; SYNC_MARKER_SIZE], ReaderError> {
    let offset = cursor.position() as u64;
    let bytes = cursor
        .read_exact(SYNC_MARKER_SIZE)
        .map_err(eof_at(offset))?;
    let mut sync_marker = [0u8; SYNC_MARKER_SIZE];
    sync_marker.copy_from_slice(bytes);
    Ok(sync_marker)
}

fn extract_schema(
    metadata: &HashMap<String, Vec<u8>>,
    strict: bool,
) -> Result<AvroSchema, ReaderError> {
    let schema_bytes = metadata.get(SCHEMA_KEY).ok_or(ReaderError::MissingSchema)?;
    let schema_json = std::str::from_utf8(schema_bytes)
        .map_err(|e| SchemaError::InvalidJson(format!("schema is not valid UTF-8: {}", e)))?;
    Ok(parse_schema_with_options(schema_json, strict)?)
}

fn extract_codec(metadata: &HashMap<String, Vec<u8>>) -> Result<Codec, ReaderError> {
    let codec = match metadata.get(CODEC_KEY) {
        None => return Ok(Codec::Null),
        Some(bytes) if bytes.is_empty() => return Ok(Codec::Null),
        Some(bytes) => {
            let name = String::from_utf8_lossy(bytes);
            Codec::from_name(&name).map_err(|source| ReaderError::Codec {
                block_index: None,
                source,
            })?
        }
    };

    if !codec.is_enabled() {
        return Err(ReaderError::Codec {
            block_index: None,
            source: CodecError::UnsupportedCodec(format!(
                "'{}' (support not compiled in)",
                codec.name()
            )),
        });
    }
    Ok(codec)
}

fn eof_at(offset: u64) -> impl Fn(DecodeError) -> ReaderError {
    move |_| ReaderError::UnexpectedEof {
        offset,
        block_index: None,
    }
}

fn metadata_error(offset: u64, what: &'static str) -> impl Fn(DecodeError) -> ReaderError {
    move |e| match e {
        DecodeError::UnexpectedEof => ReaderError::UnexpectedEof {
            offset,
            block_index: None,
        },
        other => ReaderError::InvalidMetadata {
            offset,
            message: format!("malformed metadata {}: {}", what, other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reader::varint::encode_zigzag;

    const SYNC: [u8; 16] = [7u8; 16];

    fn create_test_header(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut data = AVRO_MAGIC.to_vec();
        if !entries.is_empty() {
            data.extend(encode_zigzag(entries.len() as i64));
            for (key, value) in entries {
                data.extend(encode_zigzag(key.len() as i64));
                data.extend_from_slice(key.as_bytes());
                data.extend(encode_zigzag(value.len() as i64));
                data.extend_from_slice(value);
            }
        }
        data.push(0x00);
        data.extend_from_slice(&SYNC);
        data
    }

    #[test]
    fn test_parse_minimal_header() {
        let data = create_test_header(&[(SCHEMA_KEY, br#""long""#)]);
        let header = ContainerHeader::parse(&data).unwrap();
        assert_eq!(header.schema, AvroSchema::Long);
        assert_eq!(header.codec, Codec::Null);
        assert_eq!(header.sync_marker, SYNC);
        assert_eq!(header.header_size, data.len() as u64);
    }

    #[test]
    fn test_parse_codec_and_user_metadata() {
        let data = create_test_header(&[
            (SCHEMA_KEY, br#""string""#),
            (CODEC_KEY, b"deflate"),
            ("writer.version", b"1.2"),
        ]);
        let header = ContainerHeader::parse(&data).unwrap();
        assert_eq!(header.codec, Codec::Deflate);

        let user = header.user_metadata();
        assert_eq!(user.len(), 1);
        assert_eq!(user.get("writer.version").map(|v| v.as_slice()), Some(&b"1.2"[..]));
    }

    #[test]
    fn test_empty_codec_is_null() {
        let data = create_test_header(&[(SCHEMA_KEY, br#""int""#), (CODEC_KEY, b"")]);
        assert_eq!(ContainerHeader::parse(&data).unwrap().codec, Codec::Null);
    }

    #[test]
    fn test_negative_metadata_count() {
        let mut data = AVRO_MAGIC.to_vec();
        let schema = br#""int""#;
        let mut entry = Vec::new();
        entry.extend(encode_zigzag(SCHEMA_KEY.len() as i64));
        entry.extend_from_slice(SCHEMA_KEY.as_bytes());
        entry.extend(encode_zigzag(schema.len() as i64));
        entry.extend_from_slice(schema);
        data.extend(encode_zigzag(-1));
        data.extend(encode_zigzag(entry.len() as i64));
        data.extend(entry);
        data.push(0x00);
        data.extend_from_slice(&SYNC);

        let header = ContainerHeader::parse(&data).unwrap();
        assert_eq!(header.schema, AvroSchema::Int);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = create_test_header(&[(SCHEMA_KEY, br#""int""#)]);
        data[3] = 0x02;
        assert!(matches!(
            ContainerHeader::parse(&data),
            Err(ReaderError::BadMagic([b'O', b'b', b'j', 0x02]))
        ));
        assert!(matches!(
            ContainerHeader::parse(b"PAR1"),
            Err(ReaderError::BadMagic(_))
        ));
    }

    #[test]
    fn test_empty_and_truncated_input() {
        let err = ContainerHeader::parse(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);

        let data = create_test_header(&[(SCHEMA_KEY, br#""int""#)]);
        let err = ContainerHeader::parse(&data[..data.len() - 4]).unwrap_err();
        assert!(matches!(err, ReaderError::UnexpectedEof { block_index: None, .. }));
    }

    #[test]
    fn test_missing_schema() {
        let data = create_test_header(&[(CODEC_KEY, b"null")]);
        assert!(matches!(
            ContainerHeader::parse(&data),
            Err(ReaderError::MissingSchema)
        ));
    }

    #[test]
    fn test_invalid_schema() {
        let data = create_test_header(&[(SCHEMA_KEY, b"{\"type\": ")]);
        assert!(matches!(
            ContainerHeader::parse(&data),
            Err(ReaderError::Schema(SchemaError::InvalidJson(_)))
        ));
    }

    #[test]
    fn test_unknown_codec() {
        let data = create_test_header(&[(SCHEMA_KEY, br#""int""#), (CODEC_KEY, b"lzma2000")]);
        let err = ContainerHeader::parse(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedCodec);
        assert!(err.to_string().contains("lzma2000"));
    }

    #[test]
    fn test_malformed_metadata_key() {
        let mut data = AVRO_MAGIC.to_vec();
        data.extend(encode_zigzag(1));
        data.extend(encode_zigzag(-5));
        let err = ContainerHeader::parse(&data).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidMetadata { offset: 5, .. }));
    }
}
