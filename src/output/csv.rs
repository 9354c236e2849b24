//! CSV output format

use std::io::Write;

use anyhow::Result;

use crate::codec::to_relaxed_json;
use crate::model::{Cell, Table};

use super::OutputFormatter;

/// Header plus one record per row. Missing cells are empty fields and
/// list cells are compact JSON text.
pub struct CsvOutput {
    delimiter: u8,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvOutput {
    fn default() -> Self {
        Self::new()
    }
}

fn field(cell: &Cell<'_>) -> String {
    match cell {
        Cell::Missing => String::new(),
        Cell::List(value) => to_relaxed_json(value).to_string(),
        other => other.to_string(),
    }
}

impl OutputFormatter for CsvOutput {
    fn render(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        self.render_pages(std::slice::from_ref(table), writer)
    }

    /// Pages sharing a schema share one header; a header is written again
    /// whenever the column names change.
    fn render_pages(&self, tables: &[Table], writer: &mut dyn Write) -> Result<()> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(writer);

        let mut previous: Option<Vec<&str>> = None;
        for table in tables {
            let names: Vec<&str> = table.column_names().collect();
            if previous.as_ref() != Some(&names) {
                out.write_record(&names)?;
            }
            for row in table.rows() {
                out.write_record(row.iter().map(field))?;
            }
            previous = Some(names);
        }
        out.flush()?;
        Ok(())
    }
}
