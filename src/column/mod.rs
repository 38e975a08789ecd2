//! Columnar layout: data types, finished columns and builders

mod array;
mod builder;
mod types;

pub use arrow_buffer::BooleanBuffer;

pub use array::{Column, ColumnData};
pub use builder::ColumnBuilder;
pub use types::{DataType, Field, TimeUnit, MAX_UNION_MEMBERS};
