//! Finished columns and block fragment concatenation

use std::ops::Range;

use arrow_buffer::{BooleanBuffer, BooleanBufferBuilder};

use super::builder::ColumnBuilder;
use super::types::{DataType, Field};
use crate::error::LayoutError;

/// Physical buffers of a column.
///
/// Enum symbol indices, dates and millisecond times are stored as `Int32`;
/// microsecond times and timestamps as `Int64`; UUIDs as `Binary` holding
/// their canonical text; durations as 12-byte `FixedBinary` rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Null,
    Boolean(BooleanBuffer),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Decimal128(Vec<i128>),
    /// `offsets.len() == len + 1`; row `i` is `values[offsets[i]..offsets[i + 1]]`.
    Binary { offsets: Vec<i64>, values: Vec<u8> },
    FixedBinary { size: usize, values: Vec<u8> },
    List { offsets: Vec<i64>, values: Box<Column> },
    Map {
        offsets: Vec<i64>,
        keys: Box<Column>,
        values: Box<Column>,
    },
    Struct(Vec<Column>),
    /// Dense union. Row `i` is row `offsets[i]` of `children[type_ids[i]]`.
    Union {
        type_ids: Vec<i8>,
        offsets: Vec<i32>,
        children: Vec<Column>,
    },
}

/// A finished column: a data type, an optional validity bitmap and the
/// physical buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub(crate) data_type: DataType,
    pub(crate) len: usize,
    pub(crate) validity: Option<BooleanBuffer>,
    pub(crate) data: ColumnData,
}

impl Column {
    /// Create an empty column laid out for `field`.
    pub fn empty(field: &Field) -> Self {
        ColumnBuilder::new(field.clone()).finish()
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Validity bitmap, present on nullable columns.
    pub fn validity(&self) -> Option<&BooleanBuffer> {
        self.validity.as_ref()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Number of null rows. Every row of a `Null` column is null.
    pub fn null_count(&self) -> usize {
        match (&self.data, &self.validity) {
            (ColumnData::Null, _) => self.len,
            (_, Some(validity)) => validity.len() - validity.count_set_bits(),
            (_, None) => 0,
        }
    }

    pub fn is_null(&self, row: usize) -> bool {
        match (&self.data, &self.validity) {
            (ColumnData::Null, _) => true,
            (_, Some(validity)) => row >= validity.len() || !validity.value(row),
            (_, None) => false,
        }
    }

    pub fn is_valid(&self, row: usize) -> bool {
        !self.is_null(row)
    }

    pub fn as_bool(&self, row: usize) -> Option<bool> {
        match &self.data {
            ColumnData::Boolean(bits) if row < self.len && self.is_valid(row) => Some(bits.value(row)),
            _ => None,
        }
    }

    pub fn i32_values(&self) -> Option<&[i32]> {
        match &self.data {
            ColumnData::Int32(values) => Some(values),
            _ => None,
        }
    }

    pub fn i64_values(&self) -> Option<&[i64]> {
        match &self.data {
            ColumnData::Int64(values) => Some(values),
            _ => None,
        }
    }

    pub fn f32_values(&self) -> Option<&[f32]> {
        match &self.data {
            ColumnData::Float32(values) => Some(values),
            _ => None,
        }
    }

    pub fn f64_values(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Float64(values) => Some(values),
            _ => None,
        }
    }

    /// Unscaled decimal values.
    pub fn decimal_values(&self) -> Option<&[i128]> {
        match &self.data {
            ColumnData::Decimal128(values) => Some(values),
            _ => None,
        }
    }

    /// Offsets of a binary, string, list or map column.
    pub fn offsets(&self) -> Option<&[i64]> {
        match &self.data {
            ColumnData::Binary { offsets, .. }
            | ColumnData::List { offsets, .. }
            | ColumnData::Map { offsets, .. } => Some(offsets),
            _ => None,
        }
    }

    /// Bytes of a non-null binary, string, uuid or fixed row.
    pub fn binary_value(&self, row: usize) -> Option<&[u8]> {
        if row >= self.len || self.is_null(row) {
            return None;
        }
        match &self.data {
            ColumnData::Binary { offsets, values } => {
                Some(&values[offsets[row] as usize..offsets[row + 1] as usize])
            }
            ColumnData::FixedBinary { size, values } => Some(&values[row * size..(row + 1) * size]),
            _ => None,
        }
    }

    /// Text of a non-null string or uuid row.
    pub fn str_value(&self, row: usize) -> Option<&str> {
        match self.data_type {
            DataType::Utf8 | DataType::Uuid => {
                self.binary_value(row).and_then(|b| std::str::from_utf8(b).ok())
            }
            _ => None,
        }
    }

    /// Months, days and milliseconds of a non-null duration row.
    pub fn duration_value(&self, row: usize) -> Option<(u32, u32, u32)> {
        if self.data_type != DataType::Duration {
            return None;
        }
        let bytes = self.binary_value(row)?;
        let part = |i: usize| {
            let mut le = [0u8; 4];
            le.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
            u32::from_le_bytes(le)
        };
        Some((part(0), part(1), part(2)))
    }

    /// Symbol of a non-null enum row.
    pub fn enum_symbol(&self, row: usize) -> Option<&str> {
        match (&self.data_type, &self.data) {
            (DataType::Enum(symbols), ColumnData::Int32(indices)) if row < self.len && self.is_valid(row) => {
                symbols.get(indices[row] as usize).map(String::as_str)
            }
            _ => None,
        }
    }

    /// Child row range of a list or map row.
    pub fn list_range(&self, row: usize) -> Option<Range<usize>> {
        match &self.data {
            ColumnData::List { offsets, .. } | ColumnData::Map { offsets, .. } if row < self.len => {
                Some(offsets[row] as usize..offsets[row + 1] as usize)
            }
            _ => None,
        }
    }

    /// Element column of a list.
    pub fn list_values(&self) -> Option<&Column> {
        match &self.data {
            ColumnData::List { values, .. } => Some(values),
            _ => None,
        }
    }

    pub fn map_keys(&self) -> Option<&Column> {
        match &self.data {
            ColumnData::Map { keys, .. } => Some(keys),
            _ => None,
        }
    }

    pub fn map_values(&self) -> Option<&Column> {
        match &self.data {
            ColumnData::Map { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Children of a struct or union column.
    pub fn children(&self) -> &[Column] {
        match &self.data {
            ColumnData::Struct(children) | ColumnData::Union { children, .. } => children,
            _ => &[],
        }
    }

    /// Struct child by field name.
    pub fn struct_field(&self, name: &str) -> Option<&Column> {
        match (&self.data_type, &self.data) {
            (DataType::Struct(fields), ColumnData::Struct(children)) => fields
                .iter()
                .position(|f| f.name == name)
                .and_then(|i| children.get(i)),
            _ => None,
        }
    }

    /// Union member index and child row of a union row.
    pub fn union_slot(&self, row: usize) -> Option<(usize, usize)> {
        match &self.data {
            ColumnData::Union {
                type_ids, offsets, ..
            } if row < self.len => Some((type_ids[row] as usize, offsets[row] as usize)),
            _ => None,
        }
    }

    /// Concatenate block fragments in order.
    ///
    /// Offsets of later fragments are rebased onto the buffers of the
    /// earlier ones. All fragments must share one layout.
    pub fn concat(fragments: &[Column]) -> Result<Column, LayoutError> {
        let parts: Vec<&Column> = fragments.iter().collect();
        concat_parts("$", &parts)
    }

    /// Check the length and offset invariants of this column and every
    /// descendant.
    pub fn validate(&self) -> Result<(), LayoutError> {
        validate_column("$", self)
    }
}

fn concat_parts(path: &str, parts: &[&Column]) -> Result<Column, LayoutError> {
    let first = parts
        .first()
        .ok_or_else(|| LayoutError::new(path, "nothing to concatenate"))?;
    if let Some(other) = parts.iter().find(|p| p.data_type != first.data_type) {
        return Err(LayoutError::new(
            path,
            format!("cannot concatenate {} with {}", first.data_type, other.data_type),
        ));
    }

    let validity = match &first.validity {
        None => {
            if parts.iter().any(|p| p.validity.is_some()) {
                return Err(LayoutError::new(path, "fragments disagree on nullability"));
            }
            None
        }
        Some(_) => {
            let mut merged = BooleanBufferBuilder::new(parts.iter().map(|p| p.len).sum());
            for part in parts {
                let bits = part
                    .validity
                    .as_ref()
                    .ok_or_else(|| LayoutError::new(path, "fragments disagree on nullability"))?;
                merged.append_buffer(bits);
            }
            Some(merged.finish())
        }
    };

    Ok(Column {
        data_type: first.data_type.clone(),
        len: parts.iter().map(|p| p.len).sum(),
        validity,
        data: concat_data(path, parts)?,
    })
}

macro_rules! concat_vecs {
    ($path:expr, $parts:expr, $variant:ident) => {{
        let mut out = Vec::with_capacity($parts.iter().map(|p| p.len).sum());
        for part in $parts {
            match &part.data {
                ColumnData::$variant(values) => out.extend_from_slice(values),
                _ => return Err(physical_mismatch($path)),
            }
        }
        ColumnData::$variant(out)
    }};
}

fn physical_mismatch(path: &str) -> LayoutError {
    LayoutError::new(path, "fragments disagree on physical layout")
}

fn concat_data(path: &str, parts: &[&Column]) -> Result<ColumnData, LayoutError> {
    let data = match &parts[0].data {
        ColumnData::Null => ColumnData::Null,
        ColumnData::Boolean(_) => {
            let mut out = BooleanBufferBuilder::new(parts.iter().map(|p| p.len).sum());
            for part in parts {
                match &part.data {
                    ColumnData::Boolean(bits) => out.append_buffer(bits),
                    _ => return Err(physical_mismatch(path)),
                }
            }
            ColumnData::Boolean(out.finish())
        }
        ColumnData::Int32(_) => concat_vecs!(path, parts, Int32),
        ColumnData::Int64(_) => concat_vecs!(path, parts, Int64),
        ColumnData::Float32(_) => concat_vecs!(path, parts, Float32),
        ColumnData::Float64(_) => concat_vecs!(path, parts, Float64),
        ColumnData::Decimal128(_) => concat_vecs!(path, parts, Decimal128),
        ColumnData::Binary { .. } => {
            let mut offsets = vec![0i64];
            let mut values = Vec::new();
            for part in parts {
                match &part.data {
                    ColumnData::Binary {
                        offsets: part_offsets,
                        values: part_values,
                    } => {
                        let base = values.len() as i64;
                        offsets.extend(part_offsets[1..].iter().map(|o| o + base));
                        values.extend_from_slice(part_values);
                    }
                    _ => return Err(physical_mismatch(path)),
                }
            }
            ColumnData::Binary { offsets, values }
        }
        ColumnData::FixedBinary { size, .. } => {
            let mut values = Vec::new();
            for part in parts {
                match &part.data {
                    ColumnData::FixedBinary {
                        size: part_size,
                        values: part_values,
                    } if part_size == size => values.extend_from_slice(part_values),
                    _ => return Err(physical_mismatch(path)),
                }
            }
            ColumnData::FixedBinary { size: *size, values }
        }
        ColumnData::List { .. } => {
            let mut offsets = vec![0i64];
            let mut children = Vec::with_capacity(parts.len());
            let mut base = 0i64;
            for part in parts {
                match &part.data {
                    ColumnData::List {
                        offsets: part_offsets,
                        values,
                    } => {
                        offsets.extend(part_offsets[1..].iter().map(|o| o + base));
                        base += values.len as i64;
                        children.push(values.as_ref());
                    }
                    _ => return Err(physical_mismatch(path)),
                }
            }
            ColumnData::List {
                offsets,
                values: Box::new(concat_parts(&format!("{}.item", path), &children)?),
            }
        }
        ColumnData::Map { .. } => {
            let mut offsets = vec![0i64];
            let mut key_parts = Vec::with_capacity(parts.len());
            let mut value_parts = Vec::with_capacity(parts.len());
            let mut base = 0i64;
            for part in parts {
                match &part.data {
                    ColumnData::Map {
                        offsets: part_offsets,
                        keys,
                        values,
                    } => {
                        offsets.extend(part_offsets[1..].iter().map(|o| o + base));
                        base += keys.len as i64;
                        key_parts.push(keys.as_ref());
                        value_parts.push(values.as_ref());
                    }
                    _ => return Err(physical_mismatch(path)),
                }
            }
            ColumnData::Map {
                offsets,
                keys: Box::new(concat_parts(&format!("{}.key", path), &key_parts)?),
                values: Box::new(concat_parts(&format!("{}.value", path), &value_parts)?),
            }
        }
        ColumnData::Struct(first_children) => {
            let mut children = Vec::with_capacity(first_children.len());
            for i in 0..first_children.len() {
                let child_parts = parts
                    .iter()
                    .map(|part| match &part.data {
                        ColumnData::Struct(children) => children.get(i).ok_or_else(|| physical_mismatch(path)),
                        _ => Err(physical_mismatch(path)),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                children.push(concat_parts(&child_path(path, &parts[0].data_type, i), &child_parts)?);
            }
            ColumnData::Struct(children)
        }
        ColumnData::Union {
            children: first_children,
            ..
        } => {
            let member_count = first_children.len();
            let mut type_ids = Vec::new();
            let mut offsets = Vec::new();
            let mut bases = vec![0i32; member_count];
            let mut member_parts: Vec<Vec<&Column>> = vec![Vec::with_capacity(parts.len()); member_count];
            for part in parts {
                match &part.data {
                    ColumnData::Union {
                        type_ids: part_ids,
                        offsets: part_offsets,
                        children,
                    } if children.len() == member_count => {
                        for (&id, &offset) in part_ids.iter().zip(part_offsets) {
                            type_ids.push(id);
                            offsets.push(offset + bases[id as usize]);
                        }
                        for (k, child) in children.iter().enumerate() {
                            bases[k] += i32::try_from(child.len).map_err(|_| {
                                LayoutError::new(path, "union member exceeds i32 offsets")
                            })?;
                            member_parts[k].push(child);
                        }
                    }
                    _ => return Err(physical_mismatch(path)),
                }
            }
            let children = member_parts
                .iter()
                .enumerate()
                .map(|(k, member)| concat_parts(&child_path(path, &parts[0].data_type, k), member))
                .collect::<Result<Vec<_>, _>>()?;
            ColumnData::Union {
                type_ids,
                offsets,
                children,
            }
        }
    };
    Ok(data)
}

fn child_path(path: &str, data_type: &DataType, index: usize) -> String {
    match data_type {
        DataType::Struct(fields) => format!("{}.{}", path, fields[index].name),
        _ => format!("{}.{}", path, index),
    }
}

fn validate_offsets(path: &str, offsets: &[i64], len: usize, end: usize) -> Result<(), LayoutError> {
    if offsets.len() != len + 1 {
        return Err(LayoutError::new(
            path,
            format!("{} offsets for {} rows", offsets.len(), len),
        ));
    }
    if offsets[0] != 0 {
        return Err(LayoutError::new(path, "offsets do not start at zero"));
    }
    if offsets.windows(2).any(|w| w[1] < w[0]) {
        return Err(LayoutError::new(path, "offsets decrease"));
    }
    if offsets[len] as usize != end {
        return Err(LayoutError::new(
            path,
            format!("last offset {} does not match child length {}", offsets[len], end),
        ));
    }
    Ok(())
}

fn validate_column(path: &str, column: &Column) -> Result<(), LayoutError> {
    let len = column.len;
    if let Some(validity) = &column.validity {
        if validity.len() != len {
            return Err(LayoutError::new(
                path,
                format!("validity has {} bits for {} rows", validity.len(), len),
            ));
        }
    }

    let check_len = |actual: usize| -> Result<(), LayoutError> {
        if actual == len {
            Ok(())
        } else {
            Err(LayoutError::new(
                path,
                format!("{} values for {} rows", actual, len),
            ))
        }
    };

    match &column.data {
        ColumnData::Null => Ok(()),
        ColumnData::Boolean(bits) => check_len(bits.len()),
        ColumnData::Int32(v) => check_len(v.len()),
        ColumnData::Int64(v) => check_len(v.len()),
        ColumnData::Float32(v) => check_len(v.len()),
        ColumnData::Float64(v) => check_len(v.len()),
        ColumnData::Decimal128(v) => check_len(v.len()),
        ColumnData::Binary { offsets, values } => validate_offsets(path, offsets, len, values.len()),
        ColumnData::FixedBinary { size, values } => check_len(if *size == 0 {
            len
        } else {
            if values.len() % size != 0 {
                return Err(LayoutError::new(path, "fixed buffer is not a multiple of the size"));
            }
            values.len() / size
        }),
        ColumnData::List { offsets, values } => {
            validate_offsets(path, offsets, len, values.len)?;
            validate_column(&format!("{}.item", path), values)
        }
        ColumnData::Map {
            offsets,
            keys,
            values,
        } => {
            if keys.len != values.len {
                return Err(LayoutError::new(
                    path,
                    format!("{} keys but {} values", keys.len, values.len),
                ));
            }
            validate_offsets(path, offsets, len, keys.len)?;
            validate_column(&format!("{}.key", path), keys)?;
            validate_column(&format!("{}.value", path), values)
        }
        ColumnData::Struct(children) => {
            for (i, child) in children.iter().enumerate() {
                let child_at = child_path(path, &column.data_type, i);
                if child.len != len {
                    return Err(LayoutError::new(
                        child_at,
                        format!("struct child has {} rows, parent has {}", child.len, len),
                    ));
                }
                validate_column(&child_at, child)?;
            }
            Ok(())
        }
        ColumnData::Union {
            type_ids,
            offsets,
            children,
        } => {
            check_len(type_ids.len())?;
            check_len(offsets.len())?;
            let mut counts = vec![0usize; children.len()];
            for (&id, &offset) in type_ids.iter().zip(offsets) {
                let child = children
                    .get(id as usize)
                    .filter(|_| id >= 0)
                    .ok_or_else(|| LayoutError::new(path, format!("type id {} out of range", id)))?;
                if offset < 0 || offset as usize >= child.len {
                    return Err(LayoutError::new(
                        path,
                        format!("offset {} out of range for member {}", offset, id),
                    ));
                }
                counts[id as usize] += 1;
            }
            for (k, child) in children.iter().enumerate() {
                if counts[k] != child.len {
                    return Err(LayoutError::new(
                        path,
                        format!("member {} has {} rows but {} are referenced", k, child.len, counts[k]),
                    ));
                }
                validate_column(&child_path(path, &column.data_type, k), child)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf8(rows: &[&str]) -> Column {
        let mut offsets = vec![0i64];
        let mut values = Vec::new();
        for row in rows {
            values.extend_from_slice(row.as_bytes());
            offsets.push(values.len() as i64);
        }
        Column {
            data_type: DataType::Utf8,
            len: rows.len(),
            validity: None,
            data: ColumnData::Binary { offsets, values },
        }
    }

    fn int_list(rows: &[&[i32]]) -> Column {
        let item = Field::new("item", DataType::Int32, false);
        let mut offsets = vec![0i64];
        let mut flat = Vec::new();
        for row in rows {
            flat.extend_from_slice(row);
            offsets.push(flat.len() as i64);
        }
        Column {
            data_type: DataType::List(Box::new(item)),
            len: rows.len(),
            validity: Some(BooleanBuffer::new_set(rows.len())),
            data: ColumnData::List {
                offsets,
                values: Box::new(Column {
                    data_type: DataType::Int32,
                    len: flat.len(),
                    validity: None,
                    data: ColumnData::Int32(flat),
                }),
            },
        }
    }

    #[test]
    fn test_empty_layout_is_valid() {
        let field = Field::new(
            "r",
            DataType::Struct(vec![
                Field::new("a", DataType::Utf8, true),
                Field::new(
                    "b",
                    DataType::Map(Box::new(Field::new("value", DataType::Int64, false))),
                    false,
                ),
            ]),
            false,
        );
        let column = Column::empty(&field);
        assert_eq!(column.len(), 0);
        assert!(column.validity().is_none());
        assert!(column.struct_field("a").unwrap().validity().is_some());
        column.validate().unwrap();
    }

    #[test]
    fn test_concat_rebases_binary_offsets() {
        let merged = Column::concat(&[utf8(&["ab", "c"]), utf8(&[]), utf8(&["def"])]).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.offsets().unwrap(), &[0, 2, 3, 6]);
        assert_eq!(merged.str_value(2), Some("def"));
        merged.validate().unwrap();
    }

    #[test]
    fn test_concat_rebases_list_offsets() {
        let merged = Column::concat(&[int_list(&[&[1, 2], &[]]), int_list(&[&[3], &[4, 5, 6]])]).unwrap();
        assert_eq!(merged.offsets().unwrap(), &[0, 2, 2, 3, 6]);
        assert_eq!(merged.list_range(3), Some(3..6));
        assert_eq!(merged.list_values().unwrap().i32_values().unwrap(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(merged.validity().unwrap().len(), 4);
        merged.validate().unwrap();
    }

    #[test]
    fn test_concat_joins_unaligned_bit_buffers() {
        let bools = |bits: &[bool], valid: &[bool]| Column {
            data_type: DataType::Boolean,
            len: bits.len(),
            validity: Some(valid.iter().copied().collect()),
            data: ColumnData::Boolean(bits.iter().copied().collect()),
        };
        let merged = Column::concat(&[
            bools(&[true, false, true], &[true, true, false]),
            bools(&[false; 7], &[true; 7]),
            bools(&[true, true], &[false, true]),
        ])
        .unwrap();
        merged.validate().unwrap();
        assert_eq!(merged.len(), 12);
        assert_eq!(merged.null_count(), 2);
        assert!(merged.is_null(2));
        assert!(merged.is_null(10));
        assert!(merged.is_null(12));
        assert_eq!(merged.as_bool(0), Some(true));
        assert_eq!(merged.as_bool(3), Some(false));
        assert_eq!(merged.as_bool(11), Some(true));
        assert_eq!(merged.as_bool(12), None);
    }

    #[test]
    fn test_concat_rejects_mismatched_types() {
        let err = Column::concat(&[utf8(&["a"]), int_list(&[&[1]])]).unwrap_err();
        assert_eq!(err.path, "$");
        assert!(Column::concat(&[]).is_err());
    }

    #[test]
    fn test_concat_dense_union_rebases_per_member() {
        let fields = vec![
            Field::new("int", DataType::Int32, false),
            Field::new("string", DataType::Utf8, false),
        ];
        let fragment = |ids: Vec<i8>, ints: Vec<i32>, strings: &[&str]| {
            let mut counters = [0i32; 2];
            let offsets = ids
                .iter()
                .map(|&id| {
                    let o = counters[id as usize];
                    counters[id as usize] += 1;
                    o
                })
                .collect();
            Column {
                data_type: DataType::Union(fields.clone()),
                len: ids.len(),
                validity: None,
                data: ColumnData::Union {
                    type_ids: ids,
                    offsets,
                    children: vec![
                        Column {
                            data_type: DataType::Int32,
                            len: ints.len(),
                            validity: None,
                            data: ColumnData::Int32(ints),
                        },
                        utf8(strings),
                    ],
                },
            }
        };

        let merged = Column::concat(&[
            fragment(vec![0, 1, 0], vec![1, 2], &["x"]),
            fragment(vec![1, 0], vec![3], &["y"]),
        ])
        .unwrap();
        merged.validate().unwrap();
        assert_eq!(merged.union_slot(3), Some((1, 1)));
        assert_eq!(merged.union_slot(4), Some((0, 2)));
        assert_eq!(merged.children()[1].str_value(1), Some("y"));
    }

    #[test]
    fn test_validate_catches_broken_offsets() {
        let mut column = utf8(&["ab", "c"]);
        if let ColumnData::Binary { offsets, .. } = &mut column.data {
            offsets[1] = 5;
        }
        assert!(column.validate().is_err());

        let mut short = int_list(&[&[1], &[2]]);
        short.len = 3;
        let err = short.validate().unwrap_err();
        assert!(err.message.contains("validity"));
    }
}
