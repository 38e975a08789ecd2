//! JSON schema parser for Avro schemas.
//!
//! Parses Avro schema JSON into the AvroSchema type hierarchy, resolving
//! named type references against the types defined earlier in the document.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::SchemaError;
use crate::schema::{
    AvroSchema, EnumSchema, FieldSchema, FixedSchema, LogicalType, LogicalTypeName, RecordSchema,
};

/// Largest decimal precision that fits an `i128` unscaled value.
pub const MAX_DECIMAL_PRECISION: u32 = 38;

/// Parse an Avro schema from a JSON string.
///
/// # Example
/// ```
/// use avro_columnar::schema::{parse_schema, AvroSchema};
///
/// let schema = parse_schema(r#""string""#).unwrap();
/// assert_eq!(schema, AvroSchema::String);
/// ```
pub fn parse_schema(json: &str) -> Result<AvroSchema, SchemaError> {
    parse_schema_with_options(json, false)
}

/// Parse an Avro schema from a JSON string with validation options.
///
/// Duplicate union members, nested unions, undefined names and duplicate
/// definitions are errors in both modes. `strict` additionally enforces the
/// Avro naming rules (start with a letter or underscore, continue with
/// alphanumerics or underscores); in permissive mode violations are logged.
///
/// # Example
/// ```
/// use avro_columnar::schema::parse_schema_with_options;
///
/// let schema = r#"{"type": "enum", "name": "E", "symbols": ["a-b"]}"#;
/// assert!(parse_schema_with_options(schema, false).is_ok());
/// assert!(parse_schema_with_options(schema, true).is_err());
/// ```
pub fn parse_schema_with_options(json: &str, strict: bool) -> Result<AvroSchema, SchemaError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;

    let mut parser = SchemaParser::new().with_strict(strict);
    parser.parse(&value)
}

/// Schema parser with named type resolution context.
#[derive(Debug, Default)]
pub struct SchemaParser {
    /// Completed named types by fully qualified name
    named_types: HashMap<String, AvroSchema>,
    /// Records whose fields are still being parsed
    in_progress: HashSet<String>,
    /// Enclosing namespace for unqualified names
    current_namespace: Option<String>,
    strict_schema: bool,
}

impl SchemaParser {
    /// Create a new SchemaParser in permissive mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to enforce Avro naming rules.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }

    /// Get a named type from the registry.
    pub fn get_named_type(&self, fullname: &str) -> Option<&AvroSchema> {
        self.named_types.get(fullname)
    }

    /// Parse a JSON value into an AvroSchema.
    pub fn parse(&mut self, value: &Value) -> Result<AvroSchema, SchemaError> {
        match value {
            Value::String(s) => self.parse_type_name(s),
            Value::Object(obj) => self.parse_object_schema(obj),
            Value::Array(arr) => self.parse_union_schema(arr),
            other => Err(SchemaError::InvalidSchema(format!(
                "Expected string, object, or array, found: {}",
                other
            ))),
        }
    }

    /// Parse a primitive type or named type reference.
    fn parse_type_name(&self, name: &str) -> Result<AvroSchema, SchemaError> {
        match name {
            "null" => Ok(AvroSchema::Null),
            "boolean" => Ok(AvroSchema::Boolean),
            "int" => Ok(AvroSchema::Int),
            "long" => Ok(AvroSchema::Long),
            "float" => Ok(AvroSchema::Float),
            "double" => Ok(AvroSchema::Double),
            "bytes" => Ok(AvroSchema::Bytes),
            "string" => Ok(AvroSchema::String),
            reference => self.resolve_reference(reference),
        }
    }

    /// Resolve a reference to a previously defined named type.
    ///
    /// An unqualified name is looked up in the enclosing namespace first and
    /// then in the null namespace.
    fn resolve_reference(&self, name: &str) -> Result<AvroSchema, SchemaError> {
        let mut candidates = vec![self.qualify(name)];
        if !name.contains('.') {
            candidates.push(name.to_string());
        }

        for candidate in &candidates {
            if self.in_progress.contains(candidate) {
                return Err(SchemaError::RecursiveType(candidate.clone()));
            }
            if let Some(schema) = self.named_types.get(candidate) {
                return Ok(schema.clone());
            }
        }

        Err(SchemaError::UndefinedName(candidates.swap_remove(0)))
    }

    fn parse_object_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        if let Some(logical_type) = obj.get("logicalType") {
            return self.parse_logical_type(obj, logical_type);
        }
        self.parse_typed_object(obj)
    }

    /// Parse an object by its `type` attribute, ignoring any `logicalType`.
    fn parse_typed_object(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::InvalidSchema("Missing 'type' field".to_string()))?;

        let type_str = match type_value {
            Value::String(s) => s.as_str(),
            // {"type": {...}} and {"type": [...]} wrap a full schema
            nested => return self.parse(nested),
        };

        match type_str {
            "record" | "error" => self.parse_record_schema(obj),
            "enum" => self.parse_enum_schema(obj),
            "array" => self.parse_array_schema(obj),
            "map" => self.parse_map_schema(obj),
            "fixed" => self.parse_fixed_schema(obj),
            other => self.parse_type_name(other),
        }
    }

    fn parse_union_schema(&mut self, arr: &[Value]) -> Result<AvroSchema, SchemaError> {
        if arr.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "Union schema cannot be empty".to_string(),
            ));
        }

        let variants = arr
            .iter()
            .map(|v| self.parse(v))
            .collect::<Result<Vec<_>, _>>()?;

        validate_union(&variants)?;
        Ok(AvroSchema::Union(variants))
    }

    fn parse_record_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let (name, namespace) = self.parse_name(obj, "Record")?;
        let fullname = qualified(&namespace, &name);
        self.check_not_defined(&fullname)?;

        let fields_value = obj
            .get("fields")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::InvalidSchema(format!("Record '{}' missing 'fields' array", fullname))
            })?;

        self.in_progress.insert(fullname.clone());
        let prev_namespace = std::mem::replace(&mut self.current_namespace, namespace.clone());

        let fields = fields_value
            .iter()
            .map(|f| self.parse_field_schema(f))
            .collect::<Result<Vec<_>, _>>();

        self.current_namespace = prev_namespace;
        self.in_progress.remove(&fullname);
        let fields = fields?;

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Record '{}' has duplicate field '{}'",
                    fullname, field.name
                )));
            }
        }

        let record = RecordSchema {
            name,
            namespace,
            fields,
            doc: string_attr(obj, "doc"),
            aliases: string_list_attr(obj, "aliases"),
        };

        let schema = AvroSchema::Record(Arc::new(record));
        self.named_types.insert(fullname, schema.clone());
        Ok(schema)
    }

    fn parse_field_schema(&mut self, value: &Value) -> Result<FieldSchema, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::InvalidSchema("Field must be an object".to_string()))?;

        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Field missing 'name'".to_string()))?
            .to_string();
        self.validate_name(&name, "Field")?;

        let type_value = obj.get("type").ok_or_else(|| {
            SchemaError::InvalidSchema(format!("Field '{}' missing 'type'", name))
        })?;
        let schema = self.parse(type_value)?;

        Ok(FieldSchema {
            name,
            schema,
            default: obj.get("default").cloned(),
            doc: string_attr(obj, "doc"),
            aliases: string_list_attr(obj, "aliases"),
        })
    }

    fn parse_enum_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let (name, namespace) = self.parse_name(obj, "Enum")?;
        let fullname = qualified(&namespace, &name);
        self.check_not_defined(&fullname)?;

        let symbols = obj
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::InvalidSchema(format!("Enum '{}' missing 'symbols' array", fullname))
            })?
            .iter()
            .map(|v| {
                v.as_str().map(String::from).ok_or_else(|| {
                    SchemaError::InvalidSchema(format!(
                        "Enum '{}' has a non-string symbol",
                        fullname
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if symbols.is_empty() {
            return Err(SchemaError::InvalidSchema(format!(
                "Enum '{}' must have at least one symbol",
                fullname
            )));
        }

        let mut seen = HashSet::new();
        for symbol in &symbols {
            self.validate_name(symbol, "Enum symbol")?;
            if !seen.insert(symbol.as_str()) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Enum '{}' has duplicate symbol '{}'",
                    fullname, symbol
                )));
            }
        }

        let enum_schema = EnumSchema {
            name,
            namespace,
            symbols,
            doc: string_attr(obj, "doc"),
            aliases: string_list_attr(obj, "aliases"),
        };

        let schema = AvroSchema::Enum(Arc::new(enum_schema));
        self.named_types.insert(fullname, schema.clone());
        Ok(schema)
    }

    fn parse_array_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let items = obj
            .get("items")
            .ok_or_else(|| SchemaError::InvalidSchema("Array missing 'items' field".to_string()))?;
        Ok(AvroSchema::Array(Box::new(self.parse(items)?)))
    }

    fn parse_map_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let values = obj
            .get("values")
            .ok_or_else(|| SchemaError::InvalidSchema("Map missing 'values' field".to_string()))?;
        Ok(AvroSchema::Map(Box::new(self.parse(values)?)))
    }

    fn parse_fixed_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let (name, namespace) = self.parse_name(obj, "Fixed")?;
        let fullname = qualified(&namespace, &name);
        self.check_not_defined(&fullname)?;

        let size = obj.get("size").and_then(|v| v.as_u64()).ok_or_else(|| {
            SchemaError::InvalidSchema(format!(
                "Fixed '{}' missing non-negative 'size'",
                fullname
            ))
        })?;
        let size = usize::try_from(size).map_err(|_| {
            SchemaError::InvalidSchema(format!("Fixed '{}' size {} too large", fullname, size))
        })?;

        let fixed_schema = FixedSchema {
            name,
            namespace,
            size,
            doc: string_attr(obj, "doc"),
            aliases: string_list_attr(obj, "aliases"),
        };

        let schema = AvroSchema::Fixed(Arc::new(fixed_schema));
        self.named_types.insert(fullname, schema.clone());
        Ok(schema)
    }

    /// Parse a logical type annotation.
    ///
    /// A logical type that is unknown, sits on the wrong physical type, or
    /// has invalid parameters degrades to its physical type.
    fn parse_logical_type(
        &mut self,
        obj: &Map<String, Value>,
        logical_type_value: &Value,
    ) -> Result<AvroSchema, SchemaError> {
        let base = self.parse_typed_object(obj)?;
        if matches!(&base, AvroSchema::Logical(named) if logical_type_value.as_str() == Some(named.logical_type.name())) {
            return Ok(base);
        }

        let Some(logical_name) = logical_type_value.as_str() else {
            warn!(logical_type = %logical_type_value, "non-string logicalType ignored");
            return Ok(base);
        };

        let logical_type = match logical_name {
            "decimal" => match decimal_params(obj, &base) {
                Ok(decimal) => decimal,
                Err(reason) => {
                    warn!(
                        logical_type = logical_name,
                        reason = %reason,
                        "invalid decimal, reading as physical type"
                    );
                    return Ok(base);
                }
            },
            "uuid" => LogicalTypeName::Uuid,
            "date" => LogicalTypeName::Date,
            "time-millis" => LogicalTypeName::TimeMillis,
            "time-micros" => LogicalTypeName::TimeMicros,
            "timestamp-millis" => LogicalTypeName::TimestampMillis,
            "timestamp-micros" => LogicalTypeName::TimestampMicros,
            "local-timestamp-millis" => LogicalTypeName::LocalTimestampMillis,
            "local-timestamp-micros" => LogicalTypeName::LocalTimestampMicros,
            "duration" => LogicalTypeName::Duration,
            unknown => {
                warn!(
                    logical_type = unknown,
                    "unknown logical type, reading as physical type"
                );
                return Ok(base);
            }
        };

        if !logical_type.accepts(&base) {
            warn!(
                logical_type = logical_name,
                physical_type = %base.type_key(),
                "logical type does not apply to physical type, reading as physical type"
            );
            return Ok(base);
        }

        // A named fixed keeps its logical type when referenced by name later.
        let fixed_name = match &base {
            AvroSchema::Fixed(fixed) => Some(fixed.fullname()),
            _ => None,
        };
        let schema = AvroSchema::Logical(LogicalType::new(base, logical_type));
        if let Some(name) = fixed_name {
            self.named_types.insert(name, schema.clone());
        }
        Ok(schema)
    }

    /// Read `name` and `namespace`, splitting a dotted name.
    fn parse_name(
        &self,
        obj: &Map<String, Value>,
        context: &str,
    ) -> Result<(String, Option<String>), SchemaError> {
        let raw = obj.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
            SchemaError::InvalidSchema(format!("{} missing 'name' field", context))
        })?;

        let (name, namespace) = match raw.rsplit_once('.') {
            Some((ns, name)) => (name.to_string(), Some(ns.to_string())),
            None => {
                let namespace = match obj.get("namespace").and_then(|v| v.as_str()) {
                    Some("") => None,
                    Some(ns) => Some(ns.to_string()),
                    None => self.current_namespace.clone(),
                };
                (raw.to_string(), namespace)
            }
        };

        self.validate_name(&name, context)?;
        if let Some(ns) = &namespace {
            for part in ns.split('.') {
                self.validate_name(part, "Namespace component")?;
            }
        }

        Ok((name, namespace))
    }

    fn check_not_defined(&self, fullname: &str) -> Result<(), SchemaError> {
        if self.named_types.contains_key(fullname) || self.in_progress.contains(fullname) {
            return Err(SchemaError::DuplicateName(fullname.to_string()));
        }
        Ok(())
    }

    fn qualify(&self, name: &str) -> String {
        if name.contains('.') {
            name.to_string()
        } else {
            qualified(&self.current_namespace, name)
        }
    }

    /// Validate that a name follows Avro naming rules.
    fn validate_name(&self, name: &str, context: &str) -> Result<(), SchemaError> {
        let problem = match name.chars().next() {
            None => Some(format!("{} name cannot be empty", context)),
            Some(first) if !first.is_ascii_alphabetic() && first != '_' => Some(format!(
                "{} name '{}' must start with a letter or underscore",
                context, name
            )),
            _ => name
                .chars()
                .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_')
                .map(|ch| {
                    format!(
                        "{} name '{}' contains invalid character '{}'",
                        context, name, ch
                    )
                }),
        };

        match problem {
            Some(msg) if self.strict_schema => Err(SchemaError::InvalidSchema(msg)),
            Some(msg) => {
                warn!("{}", msg);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Reject nested unions and members that share a type key.
fn validate_union(variants: &[AvroSchema]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for (position, variant) in variants.iter().enumerate() {
        if matches!(variant, AvroSchema::Union(_)) {
            return Err(SchemaError::NestedUnion(position));
        }
        let key = variant.type_key();
        if !seen.insert(key.clone()) {
            return Err(SchemaError::DuplicateUnionMember {
                member: key,
                position,
            });
        }
    }
    Ok(())
}

fn decimal_params(obj: &Map<String, Value>, base: &AvroSchema) -> Result<LogicalTypeName, String> {
    let precision = obj
        .get("precision")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| "missing or non-integer 'precision'".to_string())?;
    let scale = match obj.get("scale") {
        None => 0,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| "non-integer or negative 'scale'".to_string())?,
    };

    if precision == 0 {
        return Err("precision must be positive".to_string());
    }
    if precision > MAX_DECIMAL_PRECISION as u64 {
        return Err(format!(
            "precision {} exceeds {}",
            precision, MAX_DECIMAL_PRECISION
        ));
    }
    if scale > precision {
        return Err(format!("scale {} exceeds precision {}", scale, precision));
    }
    if let AvroSchema::Fixed(fixed) = base {
        let max = max_precision_for_size(fixed.size);
        if precision > max {
            return Err(format!(
                "precision {} does not fit in fixed size {} (max {})",
                precision, fixed.size, max
            ));
        }
    }

    Ok(LogicalTypeName::Decimal {
        precision: precision as u32,
        scale: scale as u32,
    })
}

/// Number of base-10 digits a signed two's-complement value of `size` bytes
/// always holds.
fn max_precision_for_size(size: usize) -> u64 {
    if size == 0 {
        return 0;
    }
    let bits = (size as f64) * 8.0 - 1.0;
    (bits * std::f64::consts::LOG10_2).floor() as u64
}

fn qualified(namespace: &Option<String>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}.{}", ns, name),
        None => name.to_string(),
    }
}

fn string_attr(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn string_list_attr(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
