//! bsonframe - Columnar flattening of BSON document streams
//!
//! Decodes BSON documents (or Extended JSON lines) and flattens them page by
//! page into tables of named, typed columns, inferring column types from the
//! data and reconciling documents whose fields drift in order, presence or
//! type.
//!
//! ```
//! use bsonframe::{doc, flatten, VecSource};
//!
//! let mut source = VecSource::new([doc! { "a" => 1 }, doc! { "a" => 2.5, "b" => "x" }]);
//! let table = flatten(&mut source, 100)?;
//! assert_eq!(table.row_count(), 2);
//! assert_eq!(table.column_names().collect::<Vec<_>>(), ["a", "b"]);
//! # Ok::<(), bsonframe::Error>(())
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod flatten;
pub mod model;
pub mod output;
pub mod source;

pub use codec::{decode_document, encode_document};
pub use config::{Config, FlattenOptions};
pub use error::{Error, Result};
pub use flatten::{flatten, flatten_with, Pages};
pub use model::{Column, ColumnType, Document, Table, Value};
pub use source::{DocumentSource, VecSource};
