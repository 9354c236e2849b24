//! Column-oriented table produced by flattening

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::column::{Cell, Column, ColumnType};

/// Something noteworthy that happened while building a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A column was created from a null value and defaulted to `Bool`
    NullDefaultedToBool { column: String, row: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NullDefaultedToBool { column, row } => write!(
                f,
                "found a null for column '{column}' at row {row}; defaulting to bool"
            ),
        }
    }
}

/// A table of named, typed columns.
///
/// Every column holds exactly `row_count` cells. Tables are only built by
/// the flattening engine; callers get read-only access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
    warnings: Vec<Warning>,
}

impl Table {
    pub(crate) fn new(columns: Vec<Column>, row_count: usize, warnings: Vec<Warning>) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == row_count));
        Self {
            columns,
            row_count,
            warnings,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Get column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Column names mapped to their types, in column order
    pub fn schema(&self) -> IndexMap<String, ColumnType> {
        self.columns
            .iter()
            .map(|c| (c.name().to_string(), c.element_type()))
            .collect()
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Cells of one row, in column order
    pub fn row(&self, index: usize) -> Option<Vec<Cell<'_>>> {
        if index >= self.row_count {
            return None;
        }
        self.columns.iter().map(|c| c.cell(index)).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Cell<'_>>> {
        (0..self.row_count).filter_map(|i| self.row(i))
    }
}
