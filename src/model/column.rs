//! Typed column storage and column metadata

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::codec::json::to_relaxed_json;

/// Element type of a flattened column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Bool,
    Int32,
    Double,
    /// Milliseconds since the Unix epoch, rendered as UTC timestamps
    DateTime,
    String,
    /// Opaque per-row values: arrays, documents, binaries and timestamps
    List,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Bool => write!(f, "bool"),
            ColumnType::Int32 => write!(f, "int32"),
            ColumnType::Double => write!(f, "double"),
            ColumnType::DateTime => write!(f, "datetime"),
            ColumnType::String => write!(f, "string"),
            ColumnType::List => write!(f, "list"),
        }
    }
}

/// Cell buffers, one variant per column type. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Bool(Vec<Option<bool>>),
    Int32(Vec<Option<i32>>),
    Double(Vec<Option<f64>>),
    DateTime(Vec<Option<i64>>),
    String(Vec<Option<String>>),
    List(Vec<Option<Value>>),
}

impl ColumnData {
    pub fn with_capacity(column_type: ColumnType, capacity: usize) -> Self {
        match column_type {
            ColumnType::Bool => ColumnData::Bool(Vec::with_capacity(capacity)),
            ColumnType::Int32 => ColumnData::Int32(Vec::with_capacity(capacity)),
            ColumnType::Double => ColumnData::Double(Vec::with_capacity(capacity)),
            ColumnType::DateTime => ColumnData::DateTime(Vec::with_capacity(capacity)),
            ColumnType::String => ColumnData::String(Vec::with_capacity(capacity)),
            ColumnType::List => ColumnData::List(Vec::with_capacity(capacity)),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Bool(_) => ColumnType::Bool,
            ColumnData::Int32(_) => ColumnType::Int32,
            ColumnData::Double(_) => ColumnType::Double,
            ColumnData::DateTime(_) => ColumnType::DateTime,
            ColumnData::String(_) => ColumnType::String,
            ColumnData::List(_) => ColumnType::List,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool(c) => c.len(),
            ColumnData::Int32(c) => c.len(),
            ColumnData::Double(c) => c.len(),
            ColumnData::DateTime(c) => c.len(),
            ColumnData::String(c) => c.len(),
            ColumnData::List(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated cells, including the unused tail of a preallocated page
    pub fn capacity(&self) -> usize {
        match self {
            ColumnData::Bool(c) => c.capacity(),
            ColumnData::Int32(c) => c.capacity(),
            ColumnData::Double(c) => c.capacity(),
            ColumnData::DateTime(c) => c.capacity(),
            ColumnData::String(c) => c.capacity(),
            ColumnData::List(c) => c.capacity(),
        }
    }

    pub(crate) fn push_missing(&mut self) {
        self.fill_missing(1);
    }

    pub(crate) fn fill_missing(&mut self, count: usize) {
        let len = self.len() + count;
        match self {
            ColumnData::Bool(c) => c.resize(len, None),
            ColumnData::Int32(c) => c.resize(len, None),
            ColumnData::Double(c) => c.resize(len, None),
            ColumnData::DateTime(c) => c.resize(len, None),
            ColumnData::String(c) => c.resize(len, None),
            ColumnData::List(c) => c.resize(len, None),
        }
    }

    /// Drop everything past `rows` and release the unused allocation
    pub(crate) fn shrink_to(&mut self, rows: usize) {
        match self {
            ColumnData::Bool(c) => shrink(c, rows),
            ColumnData::Int32(c) => shrink(c, rows),
            ColumnData::Double(c) => shrink(c, rows),
            ColumnData::DateTime(c) => shrink(c, rows),
            ColumnData::String(c) => shrink(c, rows),
            ColumnData::List(c) => shrink(c, rows),
        }
    }

    /// Reallocate as `to`, converting every written cell.
    ///
    /// Only the promotions Bool → Int32 → Double and any scalar → String
    /// exist; other targets leave the column unchanged.
    pub(crate) fn widen(&mut self, to: ColumnType) {
        let current = std::mem::replace(self, ColumnData::Bool(Vec::new()));
        *self = match (current, to) {
            (ColumnData::Bool(cells), ColumnType::Int32) => {
                ColumnData::Int32(convert(cells, i32::from))
            }
            (ColumnData::Bool(cells), ColumnType::Double) => {
                ColumnData::Double(convert(cells, |b| if b { 1.0 } else { 0.0 }))
            }
            (ColumnData::Int32(cells), ColumnType::Double) => {
                ColumnData::Double(convert(cells, f64::from))
            }
            (ColumnData::Bool(cells), ColumnType::String) => {
                ColumnData::String(convert(cells, |b| b.to_string()))
            }
            (ColumnData::Int32(cells), ColumnType::String) => {
                ColumnData::String(convert(cells, |i| i.to_string()))
            }
            (ColumnData::Double(cells), ColumnType::String) => {
                ColumnData::String(convert(cells, format_double))
            }
            (current, _) => current,
        };
    }

    /// Borrowed view of one cell
    pub fn cell(&self, row: usize) -> Option<Cell<'_>> {
        let cell = match self {
            ColumnData::Bool(c) => c.get(row)?.map(Cell::Bool),
            ColumnData::Int32(c) => c.get(row)?.map(Cell::Int32),
            ColumnData::Double(c) => c.get(row)?.map(Cell::Double),
            ColumnData::DateTime(c) => c.get(row)?.map(Cell::DateTime),
            ColumnData::String(c) => c.get(row)?.as_deref().map(Cell::String),
            ColumnData::List(c) => c.get(row)?.as_ref().map(Cell::List),
        };
        Some(cell.unwrap_or(Cell::Missing))
    }
}

fn shrink<T>(cells: &mut Vec<Option<T>>, rows: usize) {
    cells.truncate(rows);
    cells.shrink_to_fit();
}

fn convert<T, U>(cells: Vec<Option<T>>, f: impl Fn(T) -> U) -> Vec<Option<U>> {
    let mut out = Vec::with_capacity(cells.capacity());
    out.extend(cells.into_iter().map(|cell| cell.map(&f)));
    out
}

/// String form of a double, as used when a numeric column widens to String
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let name = if value > 0.0 { "Infinity" } else { "-Infinity" };
        name.to_string()
    } else if value != 0.0 && (value.abs() >= 1e15 || value.abs() < 1e-5) {
        format!("{value:e}")
    } else {
        value.to_string()
    }
}

/// ISO-8601 UTC rendering of epoch milliseconds
pub fn format_datetime(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => millis.to_string(),
    }
}

/// A borrowed cell value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Missing,
    Bool(bool),
    Int32(i32),
    Double(f64),
    DateTime(i64),
    String(&'a str),
    List(&'a Value),
}

impl Cell<'_> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// The cell as a document-model value; `None` when missing
    pub fn to_value(&self) -> Option<Value> {
        match *self {
            Cell::Missing => None,
            Cell::Bool(b) => Some(Value::Bool(b)),
            Cell::Int32(i) => Some(Value::Int32(i)),
            Cell::Double(f) => Some(Value::Double(f)),
            Cell::DateTime(ms) => Some(Value::DateTime(ms)),
            Cell::String(s) => Some(Value::String(s.to_string())),
            Cell::List(v) => Some(v.clone()),
        }
    }
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => write!(f, "NA"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int32(i) => write!(f, "{i}"),
            Cell::Double(d) => write!(f, "{}", format_double(*d)),
            Cell::DateTime(ms) => write!(f, "{}", format_datetime(*ms)),
            Cell::String(s) => write!(f, "{s}"),
            Cell::List(v) => write!(f, "{}", to_relaxed_json(v)),
        }
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn with_capacity(name: impl Into<String>, column_type: ColumnType, capacity: usize) -> Self {
        Self::new(name, ColumnData::with_capacity(column_type, capacity))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> ColumnType {
        self.data.column_type()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut ColumnData {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn cell(&self, row: usize) -> Option<Cell<'_>> {
        self.data.cell(row)
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell<'_>> {
        (0..self.len()).filter_map(|row| self.cell(row))
    }

    pub fn missing_count(&self) -> usize {
        self.cells().filter(Cell::is_missing).count()
    }

    pub fn as_bool(&self) -> Option<&[Option<bool>]> {
        match &self.data {
            ColumnData::Bool(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_int32(&self) -> Option<&[Option<i32>]> {
        match &self.data {
            ColumnData::Int32(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Double(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&[Option<i64>]> {
        match &self.data {
            ColumnData::DateTime(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::String(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Option<Value>]> {
        match &self.data {
            ColumnData::List(c) => Some(c),
            _ => None,
        }
    }
}
