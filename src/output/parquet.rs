//! Parquet output via Arrow record batches

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int32Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType as ArrowType, Field, Schema, TimeUnit};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::ArrowWriter;

use crate::codec::to_relaxed_json;
use crate::model::{Column, ColumnData, ColumnType, Table};

use super::OutputFormatter;

fn arrow_type(column_type: ColumnType) -> ArrowType {
    match column_type {
        ColumnType::Bool => ArrowType::Boolean,
        ColumnType::Int32 => ArrowType::Int32,
        ColumnType::Double => ArrowType::Float64,
        ColumnType::DateTime => ArrowType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
        // List cells are stored as relaxed Extended JSON text
        ColumnType::String | ColumnType::List => ArrowType::Utf8,
    }
}

fn to_array(column: &Column) -> ArrayRef {
    match column.data() {
        ColumnData::Bool(cells) => Arc::new(BooleanArray::from(cells.clone())),
        ColumnData::Int32(cells) => Arc::new(Int32Array::from(cells.clone())),
        ColumnData::Double(cells) => Arc::new(Float64Array::from(cells.clone())),
        ColumnData::DateTime(cells) => {
            Arc::new(TimestampMillisecondArray::from(cells.clone()).with_timezone("UTC"))
        }
        ColumnData::String(cells) => {
            Arc::new(StringArray::from_iter(cells.iter().map(|c| c.as_deref())))
        }
        ColumnData::List(cells) => Arc::new(StringArray::from_iter(
            cells
                .iter()
                .map(|cell| cell.as_ref().map(|v| to_relaxed_json(v).to_string())),
        )),
    }
}

impl Table {
    /// Arrow schema matching this table's columns; every field is nullable
    pub fn arrow_schema(&self) -> Schema {
        Schema::new(
            self.columns()
                .iter()
                .map(|c| Field::new(c.name(), arrow_type(c.element_type()), true))
                .collect::<Vec<_>>(),
        )
    }

    /// Convert to a single Arrow record batch
    pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
        let columns: Vec<ArrayRef> = self.columns().iter().map(to_array).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.row_count()));
        RecordBatch::try_new_with_options(Arc::new(self.arrow_schema()), columns, &options)
    }
}

/// Parquet file with one row group per page
pub struct ParquetOutput;

impl ParquetOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ParquetOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for ParquetOutput {
    fn render(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        self.render_pages(std::slice::from_ref(table), writer)
    }

    /// All pages go into one file, so they must share a schema
    fn render_pages(&self, tables: &[Table], writer: &mut dyn Write) -> Result<()> {
        write_tables(tables, writer)
    }

    /// Every input lands in the same file, one row group per page
    fn render_inputs(&self, inputs: &[(String, Vec<Table>)], writer: &mut dyn Write) -> Result<()> {
        write_tables(inputs.iter().flat_map(|(_, tables)| tables), writer)
    }
}

fn write_tables<'t>(tables: impl IntoIterator<Item = &'t Table>, writer: &mut dyn Write) -> Result<()> {
    let mut tables = tables.into_iter().peekable();
    let Some(first) = tables.peek() else {
        bail!("No documents to write");
    };
    let schema = Arc::new(first.arrow_schema());

    // ArrowWriter needs a Send sink
    let mut buffer = Vec::new();
    let mut out = ArrowWriter::try_new(&mut buffer, schema.clone(), None)
        .context("Failed to create Parquet writer")?;
    for (i, table) in tables.enumerate() {
        let batch = table
            .to_record_batch()
            .with_context(|| format!("Failed to convert page {} to Arrow", i + 1))?;
        if batch.schema() != schema {
            bail!(
                "Page {} has a different schema than page 1; Parquet output needs a single schema (try a larger --page-size)",
                i + 1
            );
        }
        out.write(&batch).context("Failed to write Parquet row group")?;
        out.flush().context("Failed to write Parquet row group")?;
    }
    out.close().context("Failed to finish Parquet file")?;

    writer.write_all(&buffer)?;
    Ok(())
}
