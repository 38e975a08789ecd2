//! Column data types derived from the writer schema

use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::schema::{AvroSchema, LogicalTypeName};

/// Largest number of union members a dense union column can address
/// with its `i8` type ids.
pub const MAX_UNION_MEMBERS: usize = 127;

/// Resolution of time and timestamp columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Millisecond,
    Microsecond,
}

/// Logical type of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Null,
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Binary,
    Utf8,
    FixedSizeBinary(usize),
    /// Symbol index into the enum's symbol list, stored as `i32`.
    Enum(Arc<[String]>),
    Decimal { precision: u32, scale: u32 },
    /// Days since the Unix epoch.
    Date,
    /// Time of day since midnight.
    Time(TimeUnit),
    /// Offset from the Unix epoch. `utc` is false for local timestamps.
    Timestamp { unit: TimeUnit, utc: bool },
    /// Canonical textual UUID.
    Uuid,
    /// Months, days and milliseconds, each an unsigned 32-bit count.
    Duration,
    List(Box<Field>),
    /// String keys; the field describes the values.
    Map(Box<Field>),
    Struct(Vec<Field>),
    /// Dense union, one child per schema member in declaration order.
    Union(Vec<Field>),
}

impl DataType {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Null => "null",
            DataType::Boolean => "boolean",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Binary => "binary",
            DataType::Utf8 => "utf8",
            DataType::FixedSizeBinary(_) => "fixed_size_binary",
            DataType::Enum(_) => "enum",
            DataType::Decimal { .. } => "decimal",
            DataType::Date => "date",
            DataType::Time(_) => "time",
            DataType::Timestamp { .. } => "timestamp",
            DataType::Uuid => "uuid",
            DataType::Duration => "duration",
            DataType::List(_) => "list",
            DataType::Map(_) => "map",
            DataType::Struct(_) => "struct",
            DataType::Union(_) => "union",
        }
    }

    /// Check if values of this type are stored as offsets into a byte buffer.
    pub fn is_variable_width(&self) -> bool {
        matches!(self, DataType::Binary | DataType::Utf8 | DataType::Uuid)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::FixedSizeBinary(size) => write!(f, "fixed_size_binary[{}]", size),
            DataType::Decimal { precision, scale } => write!(f, "decimal({}, {})", precision, scale),
            DataType::Time(unit) | DataType::Timestamp { unit, .. } => {
                let unit = match unit {
                    TimeUnit::Millisecond => "ms",
                    TimeUnit::Microsecond => "us",
                };
                write!(f, "{}[{}]", self.name(), unit)
            }
            DataType::List(item) => write!(f, "list<{}>", item.data_type),
            DataType::Map(value) => write!(f, "map<utf8, {}>", value.data_type),
            DataType::Struct(fields) | DataType::Union(fields) => {
                write!(f, "{}<", self.name())?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                write!(f, ">")
            }
            other => write!(f, "{}", other.name()),
        }
    }
}

/// A named, typed column slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    /// Rows may be null. Set for unions that contain `null`.
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }

    /// Derive the column layout for a schema node.
    ///
    /// `[null, T]` in either order becomes a nullable `T`. A union of only
    /// `null` becomes a `Null` column. Any other union becomes a dense union
    /// whose members map one to one onto the schema's members, nullable when
    /// one of them is `null`.
    pub fn from_schema(name: impl Into<String>, schema: &AvroSchema) -> Result<Self, SchemaError> {
        let name = name.into();
        let (data_type, nullable) = match schema {
            AvroSchema::Union(members) => union_layout(&name, members)?,
            other => (data_type_of(other)?, matches!(other, AvroSchema::Null)),
        };
        Ok(Field::new(name, data_type, nullable))
    }
}

fn union_layout(name: &str, members: &[AvroSchema]) -> Result<(DataType, bool), SchemaError> {
    let has_null = members.iter().any(|m| matches!(m, AvroSchema::Null));
    let non_null: Vec<&AvroSchema> = members
        .iter()
        .filter(|m| !matches!(m, AvroSchema::Null))
        .collect();

    match (has_null, non_null.as_slice()) {
        (_, []) => Ok((DataType::Null, true)),
        (true, [inner]) if members.len() == 2 => Ok((data_type_of(inner)?, true)),
        _ => {
            if members.len() > MAX_UNION_MEMBERS {
                return Err(SchemaError::InvalidSchema(format!(
                    "union '{}' has {} members, at most {} are supported",
                    name,
                    members.len(),
                    MAX_UNION_MEMBERS
                )));
            }
            let children = members
                .iter()
                .map(|member| Field::from_schema(member.type_key(), member))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((DataType::Union(children), has_null))
        }
    }
}

fn data_type_of(schema: &AvroSchema) -> Result<DataType, SchemaError> {
    Ok(match schema {
        AvroSchema::Null => DataType::Null,
        AvroSchema::Boolean => DataType::Boolean,
        AvroSchema::Int => DataType::Int32,
        AvroSchema::Long => DataType::Int64,
        AvroSchema::Float => DataType::Float32,
        AvroSchema::Double => DataType::Float64,
        AvroSchema::Bytes => DataType::Binary,
        AvroSchema::String => DataType::Utf8,
        AvroSchema::Fixed(fixed) => DataType::FixedSizeBinary(fixed.size),
        AvroSchema::Enum(e) => DataType::Enum(e.symbols.iter().cloned().collect()),
        AvroSchema::Array(items) => DataType::List(Box::new(Field::from_schema("item", items)?)),
        AvroSchema::Map(values) => DataType::Map(Box::new(Field::from_schema("value", values)?)),
        AvroSchema::Record(record) => DataType::Struct(
            record
                .fields
                .iter()
                .map(|f| Field::from_schema(f.name.clone(), &f.schema))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        AvroSchema::Union(_) => {
            return Err(SchemaError::NestedUnion(0));
        }
        AvroSchema::Logical(logical) => {
            if !logical.logical_type.accepts(&logical.base) {
                return data_type_of(&logical.base);
            }
            match logical.logical_type {
                LogicalTypeName::Decimal { precision, scale } => DataType::Decimal { precision, scale },
                LogicalTypeName::Uuid => DataType::Uuid,
                LogicalTypeName::Date => DataType::Date,
                LogicalTypeName::TimeMillis => DataType::Time(TimeUnit::Millisecond),
                LogicalTypeName::TimeMicros => DataType::Time(TimeUnit::Microsecond),
                LogicalTypeName::TimestampMillis => DataType::Timestamp {
                    unit: TimeUnit::Millisecond,
                    utc: true,
                },
                LogicalTypeName::TimestampMicros => DataType::Timestamp {
                    unit: TimeUnit::Microsecond,
                    utc: true,
                },
                LogicalTypeName::LocalTimestampMillis => DataType::Timestamp {
                    unit: TimeUnit::Millisecond,
                    utc: false,
                },
                LogicalTypeName::LocalTimestampMicros => DataType::Timestamp {
                    unit: TimeUnit::Microsecond,
                    utc: false,
                },
                LogicalTypeName::Duration => DataType::Duration,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    fn field(json: &str) -> Field {
        Field::from_schema("f", &parse_schema(json).unwrap()).unwrap()
    }

    #[test]
    fn test_primitive_fields() {
        assert_eq!(field(r#""int""#).data_type, DataType::Int32);
        assert_eq!(field(r#""string""#).data_type, DataType::Utf8);
        assert!(!field(r#""double""#).nullable);
        assert!(field(r#""null""#).nullable);
    }

    #[test]
    fn test_nullable_union_in_either_order() {
        let a = field(r#"["null", "long"]"#);
        let b = field(r#"["long", "null"]"#);
        assert_eq!(a, b);
        assert_eq!(a.data_type, DataType::Int64);
        assert!(a.nullable);
    }

    #[test]
    fn test_null_only_union() {
        let f = field(r#"["null"]"#);
        assert_eq!(f.data_type, DataType::Null);
        assert!(f.nullable);
    }

    #[test]
    fn test_general_union_keeps_member_order() {
        let f = field(r#"["int", "null", "string"]"#);
        assert!(f.nullable);
        match f.data_type {
            DataType::Union(children) => {
                let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, ["int", "null", "string"]);
                assert_eq!(children[1].data_type, DataType::Null);
            }
            other => panic!("expected union, got {}", other),
        }
        assert!(!field(r#"["int", "string"]"#).nullable);
    }

    #[test]
    fn test_logical_types() {
        assert_eq!(
            field(r#"{"type": "bytes", "logicalType": "decimal", "precision": 20, "scale": 3}"#).data_type,
            DataType::Decimal {
                precision: 20,
                scale: 3
            }
        );
        assert_eq!(
            field(r#"{"type": "long", "logicalType": "local-timestamp-micros"}"#).data_type,
            DataType::Timestamp {
                unit: TimeUnit::Microsecond,
                utc: false
            }
        );
        assert_eq!(
            field(r#"{"type": "int", "logicalType": "time-millis"}"#).data_type,
            DataType::Time(TimeUnit::Millisecond)
        );
        assert_eq!(
            field(r#"{"type": "fixed", "name": "Span", "size": 12, "logicalType": "duration"}"#).data_type,
            DataType::Duration
        );
        // unknown logical type falls back to the physical type
        assert_eq!(
            field(r#"{"type": "long", "logicalType": "fancy-clock"}"#).data_type,
            DataType::Int64
        );
    }

    #[test]
    fn test_nested_layout_display() {
        let f = field(
            r#"{"type": "record", "name": "R", "fields": [
                {"name": "tags", "type": {"type": "array", "items": "string"}},
                {"name": "attrs", "type": {"type": "map", "values": ["null", "int"]}}
            ]}"#,
        );
        assert_eq!(
            f.data_type.to_string(),
            "struct<tags: list<utf8>, attrs: map<utf8, int32>>"
        );
    }
}
