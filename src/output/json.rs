//! JSON output format

use std::io::Write;

use anyhow::Result;
use serde_json::{json, Map, Value as Json};

use crate::codec::to_relaxed_json;
use crate::model::Table;

use super::OutputFormatter;

/// Rows as an array of relaxed Extended JSON objects.
/// Missing cells are left out of their row object.
pub struct JsonOutput {
    pretty: bool,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }

    fn write(&self, output: Json, writer: &mut dyn Write) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &output)?;
        } else {
            serde_json::to_writer(&mut *writer, &output)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

fn row_objects(table: &Table) -> impl Iterator<Item = Json> + '_ {
    table.rows().map(move |cells| {
        let object: Map<String, Json> = table
            .columns()
            .iter()
            .zip(cells)
            .filter_map(|(column, cell)| {
                let value = cell.to_value()?;
                Some((column.name().to_string(), to_relaxed_json(&value)))
            })
            .collect();
        Json::Object(object)
    })
}

impl OutputFormatter for JsonOutput {
    fn render(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        self.write(Json::Array(row_objects(table).collect()), writer)
    }

    /// One array holding the rows of every page, in order
    fn render_pages(&self, tables: &[Table], writer: &mut dyn Write) -> Result<()> {
        self.write(all_rows(tables), writer)
    }

    /// A single input is a plain row array; several become
    /// `[{"input": label, "rows": [...]}, ...]`
    fn render_inputs(&self, inputs: &[(String, Vec<Table>)], writer: &mut dyn Write) -> Result<()> {
        if let [(_, tables)] = inputs {
            return self.render_pages(tables, writer);
        }
        let output = inputs
            .iter()
            .map(|(label, tables)| json!({ "input": label, "rows": all_rows(tables) }))
            .collect();
        self.write(Json::Array(output), writer)
    }
}

fn all_rows(tables: &[Table]) -> Json {
    Json::Array(tables.iter().flat_map(row_objects).collect())
}
