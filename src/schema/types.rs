//! Avro schema types and representations.
//!
//! Named types (records, enums, fixed) live behind an [`Arc`]: every place a
//! schema refers to a name shares the single definition parsed for it.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Map, Value};

/// Represents an Avro schema.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    // Primitive types
    /// Null type - no value.
    Null,
    /// Boolean type.
    Boolean,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit IEEE 754 floating-point.
    Float,
    /// 64-bit IEEE 754 floating-point.
    Double,
    /// Sequence of bytes.
    Bytes,
    /// Unicode string.
    String,

    // Complex types
    /// Record type with named fields.
    Record(Arc<RecordSchema>),
    /// Enumeration type.
    Enum(Arc<EnumSchema>),
    /// Array of items with a single schema.
    Array(Box<AvroSchema>),
    /// Map with string keys and values of a single schema.
    Map(Box<AvroSchema>),
    /// Union of multiple schemas.
    Union(Vec<AvroSchema>),
    /// Fixed-size byte array.
    Fixed(Arc<FixedSchema>),

    /// Logical type layered over a physical type.
    Logical(LogicalType),
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The name of the record.
    pub name: String,
    /// Optional namespace for the record.
    pub namespace: Option<String>,
    /// The fields of the record.
    pub fields: Vec<FieldSchema>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this record.
    pub aliases: Vec<String>,
}

impl RecordSchema {
    /// Create a new RecordSchema with the given name and fields.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            fields,
            doc: None,
            aliases: Vec::new(),
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        fullname(&self.namespace, &self.name)
    }

    fn to_json_value_with(&self, emitted: &mut HashSet<String>) -> Value {
        let mut obj = named_header("record", &self.name, &self.namespace, &self.doc, &self.aliases);
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|f| f.to_json_value_with(emitted))
            .collect();
        obj.insert("fields".to_string(), Value::Array(fields));
        Value::Object(obj)
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The name of the field.
    pub name: String,
    /// The schema of the field's value.
    pub schema: AvroSchema,
    /// Default value, kept for diagnostics only. Reading uses the writer
    /// schema, so defaults never fill in data.
    pub default: Option<Value>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this field.
    pub aliases: Vec<String>,
}

impl FieldSchema {
    /// Create a new FieldSchema with the given name and schema.
    pub fn new(name: impl Into<String>, schema: AvroSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
            doc: None,
            aliases: Vec::new(),
        }
    }

    fn to_json_value_with(&self, emitted: &mut HashSet<String>) -> Value {
        let mut obj = Map::new();
        obj.insert("name".to_string(), json!(&self.name));
        obj.insert("type".to_string(), self.schema.to_json_value_with(emitted));
        if let Some(default) = &self.default {
            obj.insert("default".to_string(), default.clone());
        }
        if let Some(doc) = &self.doc {
            obj.insert("doc".to_string(), json!(doc));
        }
        if !self.aliases.is_empty() {
            obj.insert("aliases".to_string(), json!(&self.aliases));
        }
        Value::Object(obj)
    }
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The name of the enum.
    pub name: String,
    /// Optional namespace for the enum.
    pub namespace: Option<String>,
    /// The symbols of the enum, in index order.
    pub symbols: Vec<String>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this enum.
    pub aliases: Vec<String>,
}

impl EnumSchema {
    /// Create a new EnumSchema with the given name and symbols.
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            symbols,
            doc: None,
            aliases: Vec::new(),
        }
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        fullname(&self.namespace, &self.name)
    }

    fn to_json_value(&self) -> Value {
        let mut obj = named_header("enum", &self.name, &self.namespace, &self.doc, &self.aliases);
        obj.insert("symbols".to_string(), json!(&self.symbols));
        Value::Object(obj)
    }
}

/// Schema for a fixed-size byte array.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The name of the fixed type.
    pub name: String,
    /// Optional namespace for the fixed type.
    pub namespace: Option<String>,
    /// The size in bytes.
    pub size: usize,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this fixed type.
    pub aliases: Vec<String>,
}

impl FixedSchema {
    /// Create a new FixedSchema with the given name and size.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            size,
            doc: None,
            aliases: Vec::new(),
        }
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> String {
        fullname(&self.namespace, &self.name)
    }

    fn to_json_value(&self) -> Map<String, Value> {
        let mut obj = named_header("fixed", &self.name, &self.namespace, &self.doc, &self.aliases);
        obj.insert("size".to_string(), json!(self.size));
        obj
    }
}

/// Logical type wrapper around a base schema.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalType {
    /// The underlying physical schema.
    pub base: Box<AvroSchema>,
    /// The logical type name and parameters.
    pub logical_type: LogicalTypeName,
}

impl LogicalType {
    /// Create a new LogicalType.
    pub fn new(base: AvroSchema, logical_type: LogicalTypeName) -> Self {
        Self {
            base: Box::new(base),
            logical_type,
        }
    }

    fn to_json_value_with(&self, emitted: &mut HashSet<String>) -> Value {
        let mut obj = match &*self.base {
            AvroSchema::Fixed(f) if emitted.insert(f.fullname()) => f.to_json_value(),
            base => {
                let mut m = Map::new();
                m.insert("type".to_string(), base.to_json_value_with(emitted));
                m
            }
        };

        obj.insert("logicalType".to_string(), json!(self.logical_type.name()));
        if let LogicalTypeName::Decimal { precision, scale } = &self.logical_type {
            obj.insert("precision".to_string(), json!(precision));
            if *scale > 0 {
                obj.insert("scale".to_string(), json!(scale));
            }
        }

        Value::Object(obj)
    }
}

/// Logical type names with their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalTypeName {
    /// Decimal with precision and scale, over bytes or fixed.
    Decimal { precision: u32, scale: u32 },
    /// UUID over string or fixed[16].
    Uuid,
    /// Days since the Unix epoch, over int.
    Date,
    /// Milliseconds after midnight, over int.
    TimeMillis,
    /// Microseconds after midnight, over long.
    TimeMicros,
    /// Milliseconds since the Unix epoch (UTC), over long.
    TimestampMillis,
    /// Microseconds since the Unix epoch (UTC), over long.
    TimestampMicros,
    /// Milliseconds since the epoch in local time, over long.
    LocalTimestampMillis,
    /// Microseconds since the epoch in local time, over long.
    LocalTimestampMicros,
    /// Months, days and milliseconds, over fixed[12].
    Duration,
}

impl LogicalTypeName {
    /// Get the string name of the logical type.
    pub fn name(&self) -> &'static str {
        match self {
            LogicalTypeName::Decimal { .. } => "decimal",
            LogicalTypeName::Uuid => "uuid",
            LogicalTypeName::Date => "date",
            LogicalTypeName::TimeMillis => "time-millis",
            LogicalTypeName::TimeMicros => "time-micros",
            LogicalTypeName::TimestampMillis => "timestamp-millis",
            LogicalTypeName::TimestampMicros => "timestamp-micros",
            LogicalTypeName::LocalTimestampMillis => "local-timestamp-millis",
            LogicalTypeName::LocalTimestampMicros => "local-timestamp-micros",
            LogicalTypeName::Duration => "duration",
        }
    }

    /// Whether this logical type can annotate `base`.
    pub fn accepts(&self, base: &AvroSchema) -> bool {
        match self {
            LogicalTypeName::Decimal { .. } => {
                matches!(base, AvroSchema::Bytes | AvroSchema::Fixed(_))
            }
            LogicalTypeName::Uuid => match base {
                AvroSchema::String => true,
                AvroSchema::Fixed(f) => f.size == 16,
                _ => false,
            },
            LogicalTypeName::Date | LogicalTypeName::TimeMillis => {
                matches!(base, AvroSchema::Int)
            }
            LogicalTypeName::TimeMicros
            | LogicalTypeName::TimestampMillis
            | LogicalTypeName::TimestampMicros
            | LogicalTypeName::LocalTimestampMillis
            | LogicalTypeName::LocalTimestampMicros => matches!(base, AvroSchema::Long),
            LogicalTypeName::Duration => matches!(base, AvroSchema::Fixed(f) if f.size == 12),
        }
    }
}

impl AvroSchema {
    /// Get the fully qualified name of a named type, if applicable.
    pub fn fullname(&self) -> Option<String> {
        match self {
            AvroSchema::Record(r) => Some(r.fullname()),
            AvroSchema::Enum(e) => Some(e.fullname()),
            AvroSchema::Fixed(f) => Some(f.fullname()),
            _ => None,
        }
    }

    /// Check if this schema is a union with a null member.
    pub fn is_nullable(&self) -> bool {
        matches!(self, AvroSchema::Union(variants) if variants.contains(&AvroSchema::Null))
    }

    /// Fewest bytes one value of this schema can occupy on the wire.
    ///
    /// Zero for `null` and for records made only of zero-width fields.
    pub(crate) fn min_encoded_len(&self) -> usize {
        match self {
            AvroSchema::Null => 0,
            AvroSchema::Float => 4,
            AvroSchema::Double => 8,
            AvroSchema::Fixed(f) => f.size,
            AvroSchema::Record(r) => r.fields.iter().map(|f| f.schema.min_encoded_len()).sum(),
            AvroSchema::Logical(l) => l.base.min_encoded_len(),
            _ => 1,
        }
    }

    /// Key identifying this schema's type among union members.
    ///
    /// Logical types share the key of their physical type; named types are
    /// keyed by full name.
    pub(crate) fn type_key(&self) -> String {
        match self {
            AvroSchema::Null => "null".to_string(),
            AvroSchema::Boolean => "boolean".to_string(),
            AvroSchema::Int => "int".to_string(),
            AvroSchema::Long => "long".to_string(),
            AvroSchema::Float => "float".to_string(),
            AvroSchema::Double => "double".to_string(),
            AvroSchema::Bytes => "bytes".to_string(),
            AvroSchema::String => "string".to_string(),
            AvroSchema::Array(_) => "array".to_string(),
            AvroSchema::Map(_) => "map".to_string(),
            AvroSchema::Union(_) => "union".to_string(),
            AvroSchema::Record(r) => r.fullname(),
            AvroSchema::Enum(e) => e.fullname(),
            AvroSchema::Fixed(f) => f.fullname(),
            AvroSchema::Logical(lt) => lt.base.type_key(),
        }
    }

    /// Serialize the schema to a JSON string.
    ///
    /// A named type is written out in full the first time it appears and by
    /// name afterwards, so the output parses back to an equivalent schema.
    ///
    /// # Example
    /// ```
    /// use avro_columnar::schema::AvroSchema;
    ///
    /// assert_eq!(AvroSchema::String.to_json(), r#""string""#);
    /// ```
    pub fn to_json(&self) -> String {
        self.to_json_value().to_string()
    }

    /// Serialize the schema to a JSON Value.
    pub fn to_json_value(&self) -> Value {
        self.to_json_value_with(&mut HashSet::new())
    }

    fn to_json_value_with(&self, emitted: &mut HashSet<String>) -> Value {
        match self {
            AvroSchema::Null => json!("null"),
            AvroSchema::Boolean => json!("boolean"),
            AvroSchema::Int => json!("int"),
            AvroSchema::Long => json!("long"),
            AvroSchema::Float => json!("float"),
            AvroSchema::Double => json!("double"),
            AvroSchema::Bytes => json!("bytes"),
            AvroSchema::String => json!("string"),

            AvroSchema::Record(r) => {
                if emitted.insert(r.fullname()) {
                    r.to_json_value_with(emitted)
                } else {
                    json!(r.fullname())
                }
            }
            AvroSchema::Enum(e) => {
                if emitted.insert(e.fullname()) {
                    e.to_json_value()
                } else {
                    json!(e.fullname())
                }
            }
            AvroSchema::Fixed(f) => {
                if emitted.insert(f.fullname()) {
                    Value::Object(f.to_json_value())
                } else {
                    json!(f.fullname())
                }
            }
            AvroSchema::Array(items) => json!({
                "type": "array",
                "items": items.to_json_value_with(emitted)
            }),
            AvroSchema::Map(values) => json!({
                "type": "map",
                "values": values.to_json_value_with(emitted)
            }),
            AvroSchema::Union(variants) => Value::Array(
                variants
                    .iter()
                    .map(|v| v.to_json_value_with(emitted))
                    .collect(),
            ),
            AvroSchema::Logical(lt) => lt.to_json_value_with(emitted),
        }
    }
}

fn fullname(namespace: &Option<String>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

fn named_header(
    type_name: &str,
    name: &str,
    namespace: &Option<String>,
    doc: &Option<String>,
    aliases: &[String],
) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!(type_name));
    obj.insert("name".to_string(), json!(name));
    if let Some(ns) = namespace {
        obj.insert("namespace".to_string(), json!(ns));
    }
    if let Some(doc) = doc {
        obj.insert("doc".to_string(), json!(doc));
    }
    if !aliases.is_empty() {
        obj.insert("aliases".to_string(), json!(aliases));
    }
    obj
}
