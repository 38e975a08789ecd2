//! Arrow export
//!
//! | Column type          | Arrow type                         |
//! |----------------------|------------------------------------|
//! | null                 | Null                               |
//! | boolean              | Boolean                            |
//! | int32 / int64        | Int32 / Int64                      |
//! | float32 / float64    | Float32 / Float64                  |
//! | binary               | LargeBinary                        |
//! | utf8                 | LargeUtf8                          |
//! | fixed_size_binary[n] | FixedSizeBinary(n)                 |
//! | enum                 | Dictionary(Int32, Utf8)            |
//! | decimal(p, s)        | Decimal128(p, s)                   |
//! | date                 | Date32                             |
//! | time[ms] / time[us]  | Time32(ms) / Time64(us)            |
//! | timestamp            | Timestamp(unit, "UTC" unless local)|
//! | uuid                 | Utf8                               |
//! | duration             | Interval(MonthDayNano)             |
//! | list                 | LargeList                          |
//! | map                  | Map(entries{key, value})           |
//! | struct               | Struct                             |
//! | union                | dense Union                        |

use std::collections::HashMap;
use std::sync::Arc;

use arrow_array::types::Int32Type;
use arrow_array::{
    ArrayRef, BooleanArray, Date32Array, Decimal128Array, DictionaryArray, FixedSizeBinaryArray,
    Float32Array, Float64Array, Int32Array, IntervalMonthDayNanoArray, Int64Array, LargeBinaryArray, LargeListArray,
    LargeStringArray, MapArray, NullArray, RecordBatch, RecordBatchOptions, StringArray,
    StructArray, Time32MillisecondArray, Time64MicrosecondArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, UnionArray,
};
use arrow_buffer::{
    BooleanBuffer, Buffer, IntervalMonthDayNano, NullBuffer, OffsetBuffer, ScalarBuffer,
};
use arrow_schema::{
    ArrowError, DataType as ArrowType, Field as ArrowField, Fields, Schema,
    IntervalUnit, TimeUnit as ArrowTimeUnit, UnionFields, UnionMode,
};

use crate::column::{Column, ColumnData, DataType, Field, TimeUnit};
use crate::table::Table;

const UTC: &str = "UTC";

/// Arrow type for a column type.
pub fn arrow_data_type(data_type: &DataType) -> ArrowType {
    match data_type {
        DataType::Null => ArrowType::Null,
        DataType::Boolean => ArrowType::Boolean,
        DataType::Int32 => ArrowType::Int32,
        DataType::Int64 => ArrowType::Int64,
        DataType::Float32 => ArrowType::Float32,
        DataType::Float64 => ArrowType::Float64,
        DataType::Binary => ArrowType::LargeBinary,
        DataType::Utf8 => ArrowType::LargeUtf8,
        DataType::FixedSizeBinary(size) => ArrowType::FixedSizeBinary(*size as i32),
        DataType::Enum(_) => ArrowType::Dictionary(Box::new(ArrowType::Int32), Box::new(ArrowType::Utf8)),
        DataType::Decimal { precision, scale } => ArrowType::Decimal128(*precision as u8, *scale as i8),
        DataType::Date => ArrowType::Date32,
        DataType::Time(TimeUnit::Millisecond) => ArrowType::Time32(ArrowTimeUnit::Millisecond),
        DataType::Time(TimeUnit::Microsecond) => ArrowType::Time64(ArrowTimeUnit::Microsecond),
        DataType::Timestamp { unit, utc } => ArrowType::Timestamp(arrow_unit(*unit), utc.then(|| UTC.into())),
        DataType::Uuid => ArrowType::Utf8,
        DataType::Duration => ArrowType::Interval(IntervalUnit::MonthDayNano),
        DataType::List(item) => ArrowType::LargeList(Arc::new(arrow_field(item))),
        DataType::Map(value) => ArrowType::Map(Arc::new(map_entries_field(value)), false),
        DataType::Struct(fields) => ArrowType::Struct(fields.iter().map(arrow_field).collect()),
        DataType::Union(members) => ArrowType::Union(union_fields(members), UnionMode::Dense),
    }
}

/// Arrow field for a column field.
pub fn arrow_field(field: &Field) -> ArrowField {
    ArrowField::new(&field.name, arrow_data_type(&field.data_type), field.nullable)
}

fn arrow_unit(unit: TimeUnit) -> ArrowTimeUnit {
    match unit {
        TimeUnit::Millisecond => ArrowTimeUnit::Millisecond,
        TimeUnit::Microsecond => ArrowTimeUnit::Microsecond,
    }
}

fn map_entry_fields(value: &Field) -> Fields {
    Fields::from(vec![
        ArrowField::new("key", ArrowType::LargeUtf8, false),
        arrow_field(value),
    ])
}

fn map_entries_field(value: &Field) -> ArrowField {
    ArrowField::new("entries", ArrowType::Struct(map_entry_fields(value)), false)
}

fn union_fields(members: &[Field]) -> UnionFields {
    UnionFields::new(0..members.len() as i8, members.iter().map(arrow_field))
}

fn null_buffer(validity: Option<&BooleanBuffer>) -> Option<NullBuffer> {
    validity.cloned().map(NullBuffer::new)
}

fn month_day_nano((months, days, millis): (u32, u32, u32)) -> Result<IntervalMonthDayNano, ArrowError> {
    let narrow = |v: u32| {
        i32::try_from(v).map_err(|_| ArrowError::InvalidArgumentError(format!("duration part {} exceeds i32", v)))
    };
    Ok(IntervalMonthDayNano::new(
        narrow(months)?,
        narrow(days)?,
        i64::from(millis) * 1_000_000,
    ))
}

fn large_offsets(offsets: &[i64]) -> OffsetBuffer<i64> {
    OffsetBuffer::new(ScalarBuffer::from(offsets.to_vec()))
}

fn narrow_offsets(offsets: &[i64]) -> Result<OffsetBuffer<i32>, ArrowError> {
    let narrowed = offsets
        .iter()
        .map(|&o| i32::try_from(o))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ArrowError::InvalidArgumentError("offsets exceed i32 range".to_string()))?;
    Ok(OffsetBuffer::new(ScalarBuffer::from(narrowed)))
}

/// Convert one column, with all of its children, to an Arrow array.
pub fn to_arrow_array(column: &Column) -> Result<ArrayRef, ArrowError> {
    let nulls = null_buffer(column.validity());
    let array: ArrayRef = match (column.data_type(), column.data()) {
        (_, ColumnData::Null) => Arc::new(NullArray::new(column.len())),
        (_, ColumnData::Boolean(bits)) => Arc::new(BooleanArray::new(bits.clone(), nulls)),

        (DataType::Date, ColumnData::Int32(v)) => Arc::new(Date32Array::new(ScalarBuffer::from(v.clone()), nulls)),
        (DataType::Time(_), ColumnData::Int32(v)) => {
            Arc::new(Time32MillisecondArray::new(ScalarBuffer::from(v.clone()), nulls))
        }
        (DataType::Enum(symbols), ColumnData::Int32(v)) => {
            let keys = Int32Array::new(ScalarBuffer::from(v.clone()), nulls);
            let values = StringArray::from_iter_values(symbols.iter());
            Arc::new(DictionaryArray::<Int32Type>::try_new(keys, Arc::new(values))?)
        }
        (_, ColumnData::Int32(v)) => Arc::new(Int32Array::new(ScalarBuffer::from(v.clone()), nulls)),

        (DataType::Time(_), ColumnData::Int64(v)) => {
            Arc::new(Time64MicrosecondArray::new(ScalarBuffer::from(v.clone()), nulls))
        }
        (DataType::Timestamp { unit, utc }, ColumnData::Int64(v)) => {
            let values = ScalarBuffer::from(v.clone());
            match (unit, utc) {
                (TimeUnit::Millisecond, true) => {
                    Arc::new(TimestampMillisecondArray::new(values, nulls).with_timezone(UTC))
                }
                (TimeUnit::Millisecond, false) => Arc::new(TimestampMillisecondArray::new(values, nulls)),
                (TimeUnit::Microsecond, true) => {
                    Arc::new(TimestampMicrosecondArray::new(values, nulls).with_timezone(UTC))
                }
                (TimeUnit::Microsecond, false) => Arc::new(TimestampMicrosecondArray::new(values, nulls)),
            }
        }
        (_, ColumnData::Int64(v)) => Arc::new(Int64Array::new(ScalarBuffer::from(v.clone()), nulls)),

        (_, ColumnData::Float32(v)) => Arc::new(Float32Array::new(ScalarBuffer::from(v.clone()), nulls)),
        (_, ColumnData::Float64(v)) => Arc::new(Float64Array::new(ScalarBuffer::from(v.clone()), nulls)),
        (DataType::Decimal { precision, scale }, ColumnData::Decimal128(v)) => Arc::new(
            Decimal128Array::new(ScalarBuffer::from(v.clone()), nulls)
                .with_precision_and_scale(*precision as u8, *scale as i8)?,
        ),

        (DataType::Uuid, ColumnData::Binary { offsets, values }) => Arc::new(StringArray::try_new(
            narrow_offsets(offsets)?,
            Buffer::from(values.as_slice()),
            nulls,
        )?),
        (DataType::Utf8, ColumnData::Binary { offsets, values }) => Arc::new(LargeStringArray::try_new(
            large_offsets(offsets),
            Buffer::from(values.as_slice()),
            nulls,
        )?),
        (_, ColumnData::Binary { offsets, values }) => Arc::new(LargeBinaryArray::try_new(
            large_offsets(offsets),
            Buffer::from(values.as_slice()),
            nulls,
        )?),
        (DataType::Duration, ColumnData::FixedBinary { .. }) => {
            let values = (0..column.len())
                .map(|row| month_day_nano(column.duration_value(row).unwrap_or_default()))
                .collect::<Result<Vec<_>, _>>()?;
            Arc::new(IntervalMonthDayNanoArray::new(ScalarBuffer::from(values), nulls))
        }
        (_, ColumnData::FixedBinary { size, values }) => Arc::new(FixedSizeBinaryArray::try_new(
            *size as i32,
            Buffer::from(values.as_slice()),
            nulls,
        )?),

        (DataType::List(item), ColumnData::List { offsets, values }) => Arc::new(LargeListArray::try_new(
            Arc::new(arrow_field(item)),
            large_offsets(offsets),
            to_arrow_array(values)?,
            nulls,
        )?),
        (DataType::Map(value), ColumnData::Map { offsets, keys, values }) => {
            let entries = StructArray::try_new(
                map_entry_fields(value),
                vec![to_arrow_array(keys)?, to_arrow_array(values)?],
                None,
            )?;
            Arc::new(MapArray::try_new(
                Arc::new(map_entries_field(value)),
                narrow_offsets(offsets)?,
                entries,
                nulls,
                false,
            )?)
        }
        (DataType::Struct(fields), ColumnData::Struct(children)) => {
            if fields.is_empty() {
                Arc::new(StructArray::new_empty_fields(column.len(), nulls))
            } else {
                let arrays = children.iter().map(to_arrow_array).collect::<Result<Vec<_>, _>>()?;
                Arc::new(StructArray::try_new(
                    fields.iter().map(arrow_field).collect(),
                    arrays,
                    nulls,
                )?)
            }
        }
        (
            DataType::Union(members),
            ColumnData::Union {
                type_ids,
                offsets,
                children,
            },
        ) => {
            let arrays = children.iter().map(to_arrow_array).collect::<Result<Vec<_>, _>>()?;
            Arc::new(UnionArray::try_new(
                union_fields(members),
                ScalarBuffer::from(type_ids.clone()),
                Some(ScalarBuffer::from(offsets.clone())),
                arrays,
            )?)
        }

        (data_type, _) => {
            return Err(ArrowError::InvalidArgumentError(format!(
                "column of type {} has buffers of another type",
                data_type
            )))
        }
    };
    Ok(array)
}

impl Table {
    /// Arrow schema of the table. UTF-8 user metadata is carried over.
    pub fn arrow_schema(&self) -> Schema {
        let metadata: HashMap<String, String> = self
            .metadata()
            .iter()
            .filter_map(|(k, v)| String::from_utf8(v.clone()).ok().map(|v| (k.clone(), v)))
            .collect();
        Schema::new(self.fields().iter().map(arrow_field).collect::<Vec<_>>()).with_metadata(metadata)
    }

    /// Convert the table to a single Arrow record batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let arrays = self
            .columns()
            .iter()
            .map(|column| {
                column
                    .validate()
                    .map_err(|e| ArrowError::InvalidArgumentError(e.to_string()))?;
                to_arrow_array(column)
            })
            .collect::<Result<Vec<_>, _>>()?;
        RecordBatch::try_new_with_options(
            Arc::new(self.arrow_schema()),
            arrays,
            &RecordBatchOptions::new().with_row_count(Some(self.num_rows())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnBuilder;
    use crate::reader::Value;
    use crate::schema::parse_schema;
    use arrow_array::cast::AsArray;
    use arrow_array::types::{Decimal128Type, Int64Type, IntervalMonthDayNanoType};
    use arrow_array::Array;

    fn build(json: &str, values: &[Value<'_>]) -> ArrayRef {
        let mut builder = ColumnBuilder::from_schema("f", &parse_schema(json).unwrap()).unwrap();
        for value in values {
            builder.append(value).unwrap();
        }
        to_arrow_array(&builder.finish()).unwrap()
    }

    fn some<'a>(branch: u32, value: Value<'a>) -> Value<'a> {
        Value::Union(branch, Box::new(value))
    }

    #[test]
    fn test_nullable_primitive() {
        let array = build(
            r#"["null", "long"]"#,
            &[some(1, Value::Long(4)), some(0, Value::Null)],
        );
        let longs = array.as_primitive::<Int64Type>();
        assert_eq!(longs.len(), 2);
        assert_eq!(longs.value(0), 4);
        assert!(longs.is_null(1));
    }

    #[test]
    fn test_decimal_keeps_precision_and_scale() {
        let array = build(
            r#"{"type": "bytes", "logicalType": "decimal", "precision": 20, "scale": 3}"#,
            &[Value::Decimal(12345), Value::Decimal(-1)],
        );
        assert_eq!(array.data_type(), &ArrowType::Decimal128(20, 3));
        assert_eq!(array.as_primitive::<Decimal128Type>().value(0), 12345);
    }

    #[test]
    fn test_duration_is_month_day_nano() {
        let array = build(
            r#"["null", {"type": "fixed", "name": "Span", "size": 12, "logicalType": "duration"}]"#,
            &[
                some(
                    1,
                    Value::Duration {
                        months: 1,
                        days: 2,
                        millis: 3,
                    },
                ),
                some(0, Value::Null),
            ],
        );
        assert_eq!(array.data_type(), &ArrowType::Interval(IntervalUnit::MonthDayNano));
        let intervals = array.as_primitive::<IntervalMonthDayNanoType>();
        assert_eq!(intervals.value(0), IntervalMonthDayNano::new(1, 2, 3_000_000));
        assert!(intervals.is_null(1));
    }

    #[test]
    fn test_enum_is_dictionary() {
        let array = build(
            r#"{"type": "enum", "name": "Suit", "symbols": ["SPADES", "HEARTS"]}"#,
            &[Value::Enum(1), Value::Enum(0)],
        );
        let dict = array.as_dictionary::<Int32Type>();
        let symbols = dict.values().as_string::<i32>();
        assert_eq!(symbols.value(dict.keys().value(0) as usize), "HEARTS");
    }

    #[test]
    fn test_list_of_structs() {
        let array = build(
            r#"{"type": "array", "items": {"type": "record", "name": "P", "fields": [
                {"name": "x", "type": "long"},
                {"name": "label", "type": ["null", "string"]}
            ]}}"#,
            &[
                Value::Array(vec![
                    Value::Record(vec![Value::Long(1), some(1, Value::String("a"))]),
                    Value::Record(vec![Value::Long(2), some(0, Value::Null)]),
                ]),
                Value::Array(vec![]),
            ],
        );
        let list = array.as_list::<i64>();
        assert_eq!(list.len(), 2);
        assert_eq!(list.value_offsets(), &[0, 2, 2]);
        let points = list.values().as_struct();
        let labels = points.column(1).as_string::<i64>();
        assert_eq!(labels.value(0), "a");
        assert!(labels.is_null(1));
    }

    #[test]
    fn test_map_and_union() {
        let map = build(
            r#"{"type": "map", "values": "long"}"#,
            &[Value::Map(vec![("k", Value::Long(9))])],
        );
        let map = map.as_map();
        assert_eq!(map.keys().as_string::<i64>().value(0), "k");

        let union = build(
            r#"["int", "null", "string"]"#,
            &[some(0, Value::Int(1)), some(1, Value::Null), some(2, Value::String("s"))],
        );
        let union = union.as_union();
        assert_eq!(union.type_id(2), 2);
        assert_eq!(union.value_offset(2), 0);
    }
}
