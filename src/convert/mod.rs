//! Conversion of decoded tables to other in-memory formats
//!
//! With the `arrow` feature, [`Table::to_record_batch`](crate::Table::to_record_batch)
//! turns a table into an Arrow record batch without re-decoding.

#[cfg(feature = "arrow")]
mod arrow;

#[cfg(feature = "arrow")]
pub use arrow::{arrow_data_type, arrow_field, to_arrow_array};
