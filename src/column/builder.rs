//! Column builders
//!
//! A [`ColumnBuilder`] grows a mutable node tree, one decoded value per row,
//! and freezes it into a [`Column`] on [`finish`](ColumnBuilder::finish).
//! Composite values recurse into the child nodes, so a record holding an
//! array of records fills every nesting level in a single pass. Nullable
//! columns expect the union wrapper the decoder produces for `[null, T]`; a
//! null row still pushes a placeholder (zero, empty slice, placeholder struct
//! row) so that every buffer stays row-aligned.

use arrow_buffer::BooleanBufferBuilder;

use super::array::{Column, ColumnData};
use super::types::{DataType, Field, TimeUnit};
use crate::error::{DecodeError, SchemaError};
use crate::reader::Value;
use crate::schema::AvroSchema;

/// Builder for one column.
#[derive(Debug)]
pub struct ColumnBuilder {
    field: Field,
    root: Node,
}

impl ColumnBuilder {
    /// Create a builder for an already derived field layout.
    pub fn new(field: Field) -> Self {
        let root = Node::new(&field);
        Self { field, root }
    }

    /// Derive the layout of `schema` and create a builder for it.
    pub fn from_schema(name: impl Into<String>, schema: &AvroSchema) -> Result<Self, SchemaError> {
        Ok(Self::new(Field::from_schema(name, schema)?))
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Rows appended so far.
    pub fn len(&self) -> usize {
        self.root.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.len == 0
    }

    /// Append one decoded value as a new row.
    pub fn append(&mut self, value: &Value<'_>) -> Result<(), DecodeError> {
        append_value(&mut self.root, value)
    }

    /// Append a null row, or a placeholder row on a non-nullable column.
    pub fn append_null(&mut self) {
        append_placeholder(&mut self.root);
    }

    /// Finish building and hand out the column.
    pub fn finish(self) -> Column {
        self.root.finish()
    }
}

/// Growing counterpart of [`Column`]. Bit buffers stay in
/// [`BooleanBufferBuilder`]s until the tree is frozen.
#[derive(Debug)]
struct Node {
    data_type: DataType,
    len: usize,
    validity: Option<BooleanBufferBuilder>,
    data: NodeData,
}

#[derive(Debug)]
enum NodeData {
    Null,
    Boolean(BooleanBufferBuilder),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Decimal128(Vec<i128>),
    Binary { offsets: Vec<i64>, values: Vec<u8> },
    FixedBinary { size: usize, values: Vec<u8> },
    List { offsets: Vec<i64>, values: Box<Node> },
    Map {
        offsets: Vec<i64>,
        keys: Box<Node>,
        values: Box<Node>,
    },
    Struct(Vec<Node>),
    Union {
        type_ids: Vec<i8>,
        offsets: Vec<i32>,
        children: Vec<Node>,
    },
}

impl Node {
    fn new(field: &Field) -> Self {
        let validity =
            (field.nullable && field.data_type != DataType::Null).then(|| BooleanBufferBuilder::new(0));
        let data = match &field.data_type {
            DataType::Null => NodeData::Null,
            DataType::Boolean => NodeData::Boolean(BooleanBufferBuilder::new(0)),
            DataType::Int32 | DataType::Enum(_) | DataType::Date => NodeData::Int32(Vec::new()),
            DataType::Time(unit) => match unit {
                TimeUnit::Millisecond => NodeData::Int32(Vec::new()),
                TimeUnit::Microsecond => NodeData::Int64(Vec::new()),
            },
            DataType::Int64 | DataType::Timestamp { .. } => NodeData::Int64(Vec::new()),
            DataType::Float32 => NodeData::Float32(Vec::new()),
            DataType::Float64 => NodeData::Float64(Vec::new()),
            DataType::Decimal { .. } => NodeData::Decimal128(Vec::new()),
            DataType::Binary | DataType::Utf8 | DataType::Uuid => NodeData::Binary {
                offsets: vec![0],
                values: Vec::new(),
            },
            DataType::FixedSizeBinary(size) => NodeData::FixedBinary {
                size: *size,
                values: Vec::new(),
            },
            DataType::Duration => NodeData::FixedBinary {
                size: DURATION_WIDTH,
                values: Vec::new(),
            },
            DataType::List(item) => NodeData::List {
                offsets: vec![0],
                values: Box::new(Node::new(item)),
            },
            DataType::Map(value) => NodeData::Map {
                offsets: vec![0],
                keys: Box::new(Node::new(&Field::new("key", DataType::Utf8, false))),
                values: Box::new(Node::new(value)),
            },
            DataType::Struct(fields) => NodeData::Struct(fields.iter().map(Node::new).collect()),
            DataType::Union(fields) => NodeData::Union {
                type_ids: Vec::new(),
                offsets: Vec::new(),
                children: fields.iter().map(Node::new).collect(),
            },
        };
        Self {
            data_type: field.data_type.clone(),
            len: 0,
            validity,
            data,
        }
    }

    fn finish(self) -> Column {
        let data = match self.data {
            NodeData::Null => ColumnData::Null,
            NodeData::Boolean(mut bits) => ColumnData::Boolean(bits.finish()),
            NodeData::Int32(v) => ColumnData::Int32(v),
            NodeData::Int64(v) => ColumnData::Int64(v),
            NodeData::Float32(v) => ColumnData::Float32(v),
            NodeData::Float64(v) => ColumnData::Float64(v),
            NodeData::Decimal128(v) => ColumnData::Decimal128(v),
            NodeData::Binary { offsets, values } => ColumnData::Binary { offsets, values },
            NodeData::FixedBinary { size, values } => ColumnData::FixedBinary { size, values },
            NodeData::List { offsets, values } => ColumnData::List {
                offsets,
                values: Box::new(values.finish()),
            },
            NodeData::Map {
                offsets,
                keys,
                values,
            } => ColumnData::Map {
                offsets,
                keys: Box::new(keys.finish()),
                values: Box::new(values.finish()),
            },
            NodeData::Struct(children) => ColumnData::Struct(children.into_iter().map(Node::finish).collect()),
            NodeData::Union {
                type_ids,
                offsets,
                children,
            } => ColumnData::Union {
                type_ids,
                offsets,
                children: children.into_iter().map(Node::finish).collect(),
            },
        };
        Column {
            data_type: self.data_type,
            len: self.len,
            validity: self.validity.map(|mut bits| bits.finish()),
            data,
        }
    }
}

/// Bytes per stored duration: months, days and milliseconds as little-endian `u32`s.
const DURATION_WIDTH: usize = 12;

fn mismatch(data_type: &DataType, value: &Value<'_>) -> DecodeError {
    DecodeError::ValueMismatch {
        expected: data_type.name(),
        found: value.kind(),
    }
}

fn append_value(node: &mut Node, value: &Value<'_>) -> Result<(), DecodeError> {
    if matches!(node.data, NodeData::Null) {
        let is_null = match value {
            Value::Null => true,
            Value::Union(_, inner) => matches!(**inner, Value::Null),
            _ => false,
        };
        if !is_null {
            return Err(mismatch(&node.data_type, value));
        }
        node.len += 1;
        return Ok(());
    }
    if matches!(node.data, NodeData::Union { .. }) {
        return append_union(node, value);
    }

    if node.validity.is_some() {
        let inner = match value {
            Value::Union(_, inner) => inner.as_ref(),
            other => other,
        };
        if matches!(inner, Value::Null) {
            append_placeholder(node);
            return Ok(());
        }
        push_data(node, inner)?;
        if let Some(validity) = node.validity.as_mut() {
            validity.append(true);
        }
    } else {
        push_data(node, value)?;
    }
    node.len += 1;
    Ok(())
}

fn append_union(node: &mut Node, value: &Value<'_>) -> Result<(), DecodeError> {
    let Node {
        data_type,
        len,
        validity,
        data,
    } = node;
    let (branch, inner) = match value {
        Value::Union(branch, inner) => (*branch as usize, inner.as_ref()),
        other => return Err(mismatch(data_type, other)),
    };
    let NodeData::Union {
        type_ids,
        offsets,
        children,
    } = data
    else {
        return Err(mismatch(data_type, value));
    };
    let member_count = children.len();
    let child = children
        .get_mut(branch)
        .ok_or(DecodeError::InvalidUnionBranch {
            index: branch as i64,
            len: member_count,
        })?;
    let offset = i32::try_from(child.len).map_err(|_| DecodeError::IntOverflow(child.len as i64))?;

    append_value(child, inner)?;
    type_ids.push(branch as i8);
    offsets.push(offset);
    if let Some(validity) = validity.as_mut() {
        validity.append(!matches!(inner, Value::Null));
    }
    *len += 1;
    Ok(())
}

fn push_data(node: &mut Node, value: &Value<'_>) -> Result<(), DecodeError> {
    let Node { data_type, data, .. } = node;
    match (&*data_type, value, data) {
        (DataType::Boolean, Value::Boolean(b), NodeData::Boolean(bits)) => bits.append(*b),

        (DataType::Int32, Value::Int(v), NodeData::Int32(values))
        | (DataType::Date, Value::Date(v), NodeData::Int32(values))
        | (DataType::Time(TimeUnit::Millisecond), Value::TimeMillis(v), NodeData::Int32(values)) => {
            values.push(*v)
        }
        (DataType::Enum(_), Value::Enum(index), NodeData::Int32(values)) => values.push(*index as i32),

        (DataType::Int64, Value::Long(v), NodeData::Int64(values))
        | (DataType::Time(TimeUnit::Microsecond), Value::TimeMicros(v), NodeData::Int64(values))
        | (
            DataType::Timestamp {
                unit: TimeUnit::Millisecond,
                ..
            },
            Value::TimestampMillis(v),
            NodeData::Int64(values),
        )
        | (
            DataType::Timestamp {
                unit: TimeUnit::Microsecond,
                ..
            },
            Value::TimestampMicros(v),
            NodeData::Int64(values),
        ) => values.push(*v),

        (DataType::Float32, Value::Float(v), NodeData::Float32(values)) => values.push(*v),
        (DataType::Float64, Value::Double(v), NodeData::Float64(values)) => values.push(*v),
        (DataType::Decimal { .. }, Value::Decimal(v), NodeData::Decimal128(values)) => values.push(*v),

        (DataType::Binary, Value::Bytes(bytes), NodeData::Binary { offsets, values }) => {
            push_bytes(offsets, values, bytes)
        }
        (DataType::Utf8, Value::String(s), NodeData::Binary { offsets, values }) => {
            push_bytes(offsets, values, s.as_bytes())
        }
        (DataType::Uuid, Value::Uuid(s), NodeData::Binary { offsets, values }) => {
            push_bytes(offsets, values, s.as_bytes())
        }
        (DataType::FixedSizeBinary(size), Value::Fixed(bytes), NodeData::FixedBinary { values, .. })
            if bytes.len() == *size =>
        {
            values.extend_from_slice(bytes)
        }

        (
            DataType::Duration,
            Value::Duration {
                months,
                days,
                millis,
            },
            NodeData::FixedBinary { values, .. },
        ) => {
            for part in [months, days, millis] {
                values.extend_from_slice(&part.to_le_bytes());
            }
        }

        (DataType::List(_), Value::Array(items), NodeData::List { offsets, values }) => {
            for item in items {
                append_value(values, item)?;
            }
            offsets.push(values.len as i64);
        }
        (
            DataType::Map(_),
            Value::Map(entries),
            NodeData::Map {
                offsets,
                keys,
                values,
            },
        ) => {
            for (key, value) in entries {
                append_value(keys, &Value::String(*key))?;
                append_value(values, value)?;
            }
            offsets.push(keys.len as i64);
        }
        (DataType::Struct(_), Value::Record(fields), NodeData::Struct(children))
            if fields.len() == children.len() =>
        {
            for (child, field) in children.iter_mut().zip(fields) {
                append_value(child, field)?;
            }
        }

        (data_type, other, _) => return Err(mismatch(data_type, other)),
    }
    Ok(())
}

fn push_bytes(offsets: &mut Vec<i64>, values: &mut Vec<u8>, bytes: &[u8]) {
    values.extend_from_slice(bytes);
    offsets.push(values.len() as i64);
}

/// Push a null row on a nullable column, or a zero row on a non-nullable
/// one. Composite children receive placeholders too.
fn append_placeholder(node: &mut Node) {
    if let Some(validity) = node.validity.as_mut() {
        validity.append(false);
    }
    match &mut node.data {
        NodeData::Null => {}
        NodeData::Boolean(bits) => bits.append(false),
        NodeData::Int32(values) => values.push(0),
        NodeData::Int64(values) => values.push(0),
        NodeData::Float32(values) => values.push(0.0),
        NodeData::Float64(values) => values.push(0.0),
        NodeData::Decimal128(values) => values.push(0),
        NodeData::Binary { offsets, values } => offsets.push(values.len() as i64),
        NodeData::FixedBinary { size, values } => values.resize(values.len() + *size, 0),
        NodeData::List { offsets, values } => offsets.push(values.len as i64),
        NodeData::Map { offsets, keys, .. } => offsets.push(keys.len as i64),
        NodeData::Struct(children) => children.iter_mut().for_each(append_placeholder),
        NodeData::Union {
            type_ids,
            offsets,
            children,
        } => {
            if let Some(first) = children.first_mut() {
                type_ids.push(0);
                offsets.push(first.len as i32);
                append_placeholder(first);
            }
        }
    }
    node.len += 1;
}
