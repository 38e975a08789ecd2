//! Avro object container files decoded into columnar tables
//!
//! A container file is framed once from start to end, checking every sync
//! marker, and its blocks are then decompressed and decoded, in parallel
//! when there are several. Every record field becomes a column with
//! bit-packed validity and `i64` offsets; nested records, arrays, maps and
//! unions become nested columns.
//!
//! ```no_run
//! # fn main() -> Result<(), avro_columnar::ReaderError> {
//! let table = avro_columnar::decode_file("users.avro")?;
//! for (field, column) in table.fields().iter().zip(table.columns()) {
//!     println!("{}: {} ({} nulls)", field.name, field.data_type, column.null_count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod column;
pub mod config;
pub mod convert;
pub mod error;
mod read;
pub mod reader;
pub mod schema;
pub mod source;
mod table;

pub use codec::Codec;
pub use column::{BooleanBuffer, Column, ColumnBuilder, ColumnData, DataType, Field, TimeUnit};
pub use config::{Parallelism, ReaderConfig};
pub use error::{
    CodecError, DecodeError, ErrorKind, LayoutError, ReaderError, SchemaError, SourceError,
};
pub use read::{decode_bytes, decode_file, TableReader};
pub use reader::{ContainerHeader, ContainerReader};
pub use schema::{parse_schema, AvroSchema, LogicalTypeName};
pub use source::ByteSource;
pub use table::{Table, VALUE_COLUMN};
