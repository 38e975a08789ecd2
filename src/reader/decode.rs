//! Schema-driven value decoding
//!
//! [`decode_value`] reads exactly one value of a schema node from a
//! [`Cursor`]. The result borrows strings and bytes from the block payload
//! and lives only until a column builder has appended it.

use std::borrow::Cow;

use crate::error::DecodeError;
use crate::reader::cursor::Cursor;
use crate::schema::{AvroSchema, LogicalType, LogicalTypeName};

/// A decoded value, shaped like the schema node it was decoded with.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Byte string
    Bytes(&'a [u8]),
    /// UTF-8 string
    String(&'a str),
    /// Fixed-size bytes
    Fixed(&'a [u8]),
    /// Enum symbol index
    Enum(u32),
    /// Array items in order
    Array(Vec<Value<'a>>),
    /// Map entries in encoded order
    Map(Vec<(&'a str, Value<'a>)>),
    /// Record field values in declaration order
    Record(Vec<Value<'a>>),
    /// Selected union branch and its value
    Union(u32, Box<Value<'a>>),
    /// Unscaled decimal value
    Decimal(i128),
    /// Days since the Unix epoch
    Date(i32),
    /// Milliseconds after midnight
    TimeMillis(i32),
    /// Microseconds after midnight
    TimeMicros(i64),
    /// Milliseconds since the Unix epoch
    TimestampMillis(i64),
    /// Microseconds since the Unix epoch
    TimestampMicros(i64),
    /// Canonical UUID text
    Uuid(Cow<'a, str>),
    /// Calendar duration
    Duration { months: u32, days: u32, millis: u32 },
}

impl Value<'_> {
    /// Short name of the value's variant, for mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Fixed(_) => "fixed",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Union(_, _) => "union",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::TimeMillis(_) => "time-millis",
            Value::TimeMicros(_) => "time-micros",
            Value::TimestampMillis(_) => "timestamp-millis",
            Value::TimestampMicros(_) => "timestamp-micros",
            Value::Uuid(_) => "uuid",
            Value::Duration { .. } => "duration",
        }
    }
}

/// Decode one value of `schema` at the cursor.
pub fn decode_value<'a>(
    schema: &AvroSchema,
    cursor: &mut Cursor<'a>,
) -> Result<Value<'a>, DecodeError> {
    match schema {
        AvroSchema::Null => Ok(Value::Null),
        AvroSchema::Boolean => cursor.read_boolean().map(Value::Boolean),
        AvroSchema::Int => cursor.read_int().map(Value::Int),
        AvroSchema::Long => cursor.read_long().map(Value::Long),
        AvroSchema::Float => cursor.read_float().map(Value::Float),
        AvroSchema::Double => cursor.read_double().map(Value::Double),
        AvroSchema::Bytes => cursor.read_bytes().map(Value::Bytes),
        AvroSchema::String => cursor.read_string().map(Value::String),
        AvroSchema::Fixed(fixed) => cursor.read_exact(fixed.size).map(Value::Fixed),
        AvroSchema::Enum(enum_schema) => cursor
            .read_enum_index(enum_schema.symbols.len())
            .map(Value::Enum),
        AvroSchema::Array(items) => decode_array(items, cursor),
        AvroSchema::Map(values) => decode_map(values, cursor),
        AvroSchema::Record(record) => record
            .fields
            .iter()
            .map(|field| decode_value(&field.schema, cursor))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Record),
        AvroSchema::Union(variants) => {
            let branch = cursor.read_union_branch(variants.len())?;
            let value = decode_value(&variants[branch as usize], cursor)?;
            Ok(Value::Union(branch, Box::new(value)))
        }
        AvroSchema::Logical(logical) => decode_logical(logical, cursor),
    }
}

/// Decode a chunked array: item counts repeat until a zero count.
fn decode_array<'a>(
    items: &AvroSchema,
    cursor: &mut Cursor<'a>,
) -> Result<Value<'a>, DecodeError> {
    let width = items.min_encoded_len();
    let mut values = Vec::new();
    loop {
        let count = cursor.read_chunk_len()?;
        if count == 0 {
            return Ok(Value::Array(values));
        }
        cursor.claim_items(count, width)?;
        values.reserve(count.min(cursor.remaining()));
        for _ in 0..count {
            values.push(decode_value(items, cursor)?);
        }
    }
}

/// Decode a chunked map of string keys.
fn decode_map<'a>(
    values: &AvroSchema,
    cursor: &mut Cursor<'a>,
) -> Result<Value<'a>, DecodeError> {
    // Every entry carries at least a key length.
    let width = 1 + values.min_encoded_len();
    let mut entries = Vec::new();
    loop {
        let count = cursor.read_chunk_len()?;
        if count == 0 {
            return Ok(Value::Map(entries));
        }
        cursor.claim_items(count, width)?;
        entries.reserve(count.min(cursor.remaining()));
        for _ in 0..count {
            let key = cursor.read_string()?;
            let value = decode_value(values, cursor)?;
            entries.push((key, value));
        }
    }
}

fn decode_logical<'a>(
    logical: &LogicalType,
    cursor: &mut Cursor<'a>,
) -> Result<Value<'a>, DecodeError> {
    match (logical.logical_type, &*logical.base) {
        (LogicalTypeName::Decimal { .. }, AvroSchema::Bytes) => {
            decimal_from_bytes(cursor.read_bytes()?).map(Value::Decimal)
        }
        (LogicalTypeName::Decimal { .. }, AvroSchema::Fixed(fixed)) => {
            decimal_from_bytes(cursor.read_exact(fixed.size)?).map(Value::Decimal)
        }
        (LogicalTypeName::Uuid, AvroSchema::String) => {
            cursor.read_string().map(|s| Value::Uuid(Cow::Borrowed(s)))
        }
        (LogicalTypeName::Uuid, AvroSchema::Fixed(fixed)) if fixed.size == 16 => {
            let bytes = cursor.read_exact(16)?;
            Ok(Value::Uuid(Cow::Owned(format_uuid(bytes))))
        }
        (LogicalTypeName::Date, AvroSchema::Int) => cursor.read_int().map(Value::Date),
        (LogicalTypeName::TimeMillis, AvroSchema::Int) => cursor.read_int().map(Value::TimeMillis),
        (LogicalTypeName::TimeMicros, AvroSchema::Long) => {
            cursor.read_long().map(Value::TimeMicros)
        }
        (
            LogicalTypeName::TimestampMillis | LogicalTypeName::LocalTimestampMillis,
            AvroSchema::Long,
        ) => cursor.read_long().map(Value::TimestampMillis),
        (
            LogicalTypeName::TimestampMicros | LogicalTypeName::LocalTimestampMicros,
            AvroSchema::Long,
        ) => cursor.read_long().map(Value::TimestampMicros),
        (LogicalTypeName::Duration, AvroSchema::Fixed(fixed)) if fixed.size == 12 => {
            let bytes = cursor.read_exact(12)?;
            let part = |i: usize| {
                let mut le = [0u8; 4];
                le.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
                u32::from_le_bytes(le)
            };
            Ok(Value::Duration {
                months: part(0),
                days: part(1),
                millis: part(2),
            })
        }
        // The parser never builds other pairs; decode the physical value.
        (_, base) => decode_value(base, cursor),
    }
}

/// Interpret big-endian two's-complement bytes as an unscaled decimal.
///
/// Inputs longer than 16 bytes are accepted when the extra leading bytes
/// are pure sign extension.
pub fn decimal_from_bytes(bytes: &[u8]) -> Result<i128, DecodeError> {
    if bytes.is_empty() {
        return Ok(0);
    }

    let negative = bytes[0] & 0x80 != 0;
    let fill = if negative { 0xFF } else { 0x00 };

    let significant = if bytes.len() > 16 {
        let (extra, rest) = bytes.split_at(bytes.len() - 16);
        let sign_consistent = (rest[0] & 0x80 != 0) == negative;
        if !sign_consistent || extra.iter().any(|&b| b != fill) {
            return Err(DecodeError::DecimalOverflow { len: bytes.len() });
        }
        rest
    } else {
        bytes
    };

    let mut buf = [fill; 16];
    buf[16 - significant.len()..].copy_from_slice(significant);
    Ok(i128::from_be_bytes(buf))
}

/// Format 16 bytes as `8-4-4-4-12` lowercase hex.
fn format_uuid(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(36);
    for (i, byte) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
