//! Avro schema types and parsing.
//!
//! The writer schema embedded in a container header is parsed into an
//! [`AvroSchema`] tree. Named types are resolved while parsing, so the tree
//! never contains unresolved references.

mod parser;
mod types;

pub use parser::{parse_schema, parse_schema_with_options, SchemaParser, MAX_DECIMAL_PRECISION};
pub use types::*;
