//! Data model: document values, typed columns and tables

mod column;
mod table;
mod value;

pub use column::{format_datetime, format_double, Cell, Column, ColumnData, ColumnType};
pub use table::{Table, Warning};
pub use value::{Decimal128, Document, ObjectId, Value, ValueKind};
