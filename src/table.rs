//! Decoded tables and the block-to-column assembler

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::codec::Codec;
use crate::column::{Column, ColumnBuilder, DataType, Field};
use crate::config::{Parallelism, ReaderConfig};
use crate::error::{DecodeError, ReaderError, SchemaError};
use crate::reader::{decode_value, ContainerHeader, ContainerReader, Cursor, RawBlock};
use crate::schema::AvroSchema;

/// Column name used when the writer schema is not a record.
pub const VALUE_COLUMN: &str = "value";

/// A fully decoded container file.
#[derive(Debug, Clone)]
pub struct Table {
    fields: Vec<Field>,
    columns: Vec<Column>,
    num_rows: usize,
    schema: AvroSchema,
    metadata: HashMap<String, Vec<u8>>,
    codec: Codec,
    block_count: usize,
}

impl Table {
    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of top-level columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Top-level column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .map(|i| &self.columns[i])
    }

    /// Column at a dotted path.
    ///
    /// Struct children are addressed by field name, list elements by `item`,
    /// map keys and values by `key` and `value`, and union members by their
    /// position or type name, e.g. `orders.item.lines.item.sku`.
    pub fn column_by_path(&self, path: &str) -> Option<&Column> {
        let mut segments = path.split('.');
        let mut column = self.column(segments.next()?)?;
        for segment in segments {
            column = match column.data_type() {
                DataType::Struct(_) => column.struct_field(segment)?,
                DataType::List(_) if segment == "item" => column.list_values()?,
                DataType::Map(_) if segment == "key" => column.map_keys()?,
                DataType::Map(_) if segment == "value" => column.map_values()?,
                DataType::Union(members) => {
                    let index = match segment.parse::<usize>() {
                        Ok(index) => index,
                        Err(_) => members.iter().position(|m| m.name == segment)?,
                    };
                    column.children().get(index)?
                }
                _ => return None,
            };
        }
        Some(column)
    }

    /// Schema the file was written with.
    pub fn writer_schema(&self) -> &AvroSchema {
        &self.schema
    }

    /// Writer schema rendered back to JSON.
    pub fn writer_schema_json(&self) -> String {
        self.schema.to_json()
    }

    /// User metadata from the header; reserved `avro.*` entries are left out.
    pub fn metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.metadata
    }

    /// Codec the blocks were compressed with.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Number of data blocks in the file.
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Consume the table, keeping the fields and columns.
    pub fn into_parts(self) -> (Vec<Field>, Vec<Column>) {
        (self.fields, self.columns)
    }
}

/// Top-level layout: one column per record field, or a single `value`
/// column for non-record schemas.
#[derive(Debug)]
struct TableLayout {
    fields: Vec<Field>,
    schemas: Vec<AvroSchema>,
}

impl TableLayout {
    fn new(schema: &AvroSchema) -> Result<Self, SchemaError> {
        let (names, schemas): (Vec<String>, Vec<AvroSchema>) = match schema {
            AvroSchema::Record(record) => record
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.schema.clone()))
                .unzip(),
            other => (vec![VALUE_COLUMN.to_string()], vec![other.clone()]),
        };
        let fields = names
            .into_iter()
            .zip(&schemas)
            .map(|(name, schema)| Field::from_schema(name, schema))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { fields, schemas })
    }

    fn builders(&self) -> Vec<ColumnBuilder> {
        self.fields.iter().cloned().map(ColumnBuilder::new).collect()
    }
}

/// Decode a whole container held in `data`.
pub(crate) fn assemble(data: &[u8], config: &ReaderConfig) -> Result<Table, ReaderError> {
    let mut reader = ContainerReader::new(data, config.strict_schema)?;
    let blocks = reader.frame_all()?;
    let header = reader.into_header();
    let layout = TableLayout::new(&header.schema)?;

    let columns = match config.parallelism {
        _ if blocks.len() <= 1 => decode_sequential(&blocks, &header, &layout, config)?,
        Parallelism::Sequential => decode_sequential(&blocks, &header, &layout, config)?,
        Parallelism::Auto => decode_parallel(&blocks, &header, &layout, config)?,
        Parallelism::Threads(threads) => {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(|| decode_parallel(&blocks, &header, &layout, config))?,
                Err(e) => {
                    warn!(threads, error = %e, "could not build decode pool, decoding sequentially");
                    decode_sequential(&blocks, &header, &layout, config)?
                }
            }
        }
    };

    let num_rows = columns.first().map_or_else(
        || blocks.iter().map(|b| b.row_count as usize).sum(),
        Column::len,
    );
    debug!(
        rows = num_rows,
        columns = columns.len(),
        blocks = blocks.len(),
        codec = %header.codec,
        "decoded table"
    );

    Ok(Table {
        fields: layout.fields,
        columns,
        num_rows,
        metadata: header.user_metadata(),
        codec: header.codec,
        block_count: blocks.len(),
        schema: header.schema,
    })
}

fn decode_sequential(
    blocks: &[RawBlock<'_>],
    header: &ContainerHeader,
    layout: &TableLayout,
    config: &ReaderConfig,
) -> Result<Vec<Column>, ReaderError> {
    let mut builders = layout.builders();
    for block in blocks {
        decode_block(block, header.codec, config, &layout.schemas, &mut builders)?;
    }
    Ok(builders.into_iter().map(ColumnBuilder::finish).collect())
}

fn decode_parallel(
    blocks: &[RawBlock<'_>],
    header: &ContainerHeader,
    layout: &TableLayout,
    config: &ReaderConfig,
) -> Result<Vec<Column>, ReaderError> {
    let results: Vec<Result<Vec<Column>, ReaderError>> = blocks
        .par_iter()
        .map(|block| {
            let mut builders = layout.builders();
            decode_block(block, header.codec, config, &layout.schemas, &mut builders)?;
            Ok(builders.into_iter().map(ColumnBuilder::finish).collect())
        })
        .collect();

    // Report the failure of the earliest block, as a sequential pass would.
    let fragments = results.into_iter().collect::<Result<Vec<_>, _>>()?;

    let mut per_column: Vec<Vec<Column>> = layout
        .fields
        .iter()
        .map(|_| Vec::with_capacity(fragments.len()))
        .collect();
    for fragment in fragments {
        for (slot, column) in per_column.iter_mut().zip(fragment) {
            slot.push(column);
        }
    }
    per_column
        .iter()
        .map(|parts| Column::concat(parts).map_err(ReaderError::from))
        .collect()
}

/// Decompress one block and append its records to `builders`.
fn decode_block(
    block: &RawBlock<'_>,
    codec: Codec,
    config: &ReaderConfig,
    schemas: &[AvroSchema],
    builders: &mut [ColumnBuilder],
) -> Result<(), ReaderError> {
    let data_block = block.decompress(codec, config.verify_snappy_checksum)?;
    let mut cursor = Cursor::new(&data_block.payload);

    // Rows with a non-zero width stop at the end of the payload on their own.
    if schemas.iter().all(|s| s.min_encoded_len() == 0) {
        let rows = usize::try_from(block.row_count).unwrap_or(usize::MAX);
        cursor
            .claim_items(rows, 0)
            .map_err(|source| record_error(block, 0, &cursor, source))?;
    }

    for record_index in 0..block.row_count {
        for (schema, builder) in schemas.iter().zip(builders.iter_mut()) {
            decode_value(schema, &mut cursor)
                .and_then(|value| builder.append(&value))
                .map_err(|source| record_error(block, record_index, &cursor, source))?;
        }
    }

    if !cursor.is_empty() {
        return Err(ReaderError::BlockLengthMismatch {
            block_index: block.index,
            expected_rows: block.row_count,
            decoded_rows: block.row_count,
            leftover_bytes: cursor.remaining(),
        });
    }
    Ok(())
}

fn record_error(block: &RawBlock<'_>, record_index: u64, cursor: &Cursor<'_>, source: DecodeError) -> ReaderError {
    match source {
        // The payload ran out before the declared record count was reached.
        DecodeError::UnexpectedEof => ReaderError::BlockLengthMismatch {
            block_index: block.index,
            expected_rows: block.row_count,
            decoded_rows: record_index,
            leftover_bytes: 0,
        },
        source => ReaderError::Decode {
            block_index: block.index,
            record_index,
            offset: cursor.position() as u64,
            source,
        },
    }
}
