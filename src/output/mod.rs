//! Output formatting for flattened tables

mod csv;
mod json;
mod parquet;
mod terminal;

use std::io::Write;

use anyhow::Result;
use termcolor::ColorChoice;

use crate::config::OutputFormat;
use crate::model::Table;

pub use self::csv::CsvOutput;
pub use self::json::JsonOutput;
pub use self::parquet::ParquetOutput;
pub use self::terminal::{write_summary, TerminalOutput};

/// Trait for output formatters
pub trait OutputFormatter {
    /// Render one table to a writer
    fn render(&self, table: &Table, writer: &mut dyn Write) -> Result<()>;

    /// Render consecutive pages of one stream
    fn render_pages(&self, tables: &[Table], writer: &mut dyn Write) -> Result<()> {
        for table in tables {
            self.render(table, writer)?;
        }
        Ok(())
    }

    /// Render the pages of several labelled inputs, one input after another
    fn render_inputs(&self, inputs: &[(String, Vec<Table>)], writer: &mut dyn Write) -> Result<()> {
        for (_, tables) in inputs {
            self.render_pages(tables, writer)?;
        }
        Ok(())
    }
}

/// Factory for creating output formatters
pub struct OutputFactory;

impl OutputFactory {
    /// Create an output formatter based on format type
    pub fn create(format: OutputFormat, color_choice: ColorChoice) -> Box<dyn OutputFormatter> {
        match format {
            OutputFormat::Terminal => Box::new(TerminalOutput::with_color_choice(color_choice)),
            OutputFormat::Json => Box::new(JsonOutput::new()),
            OutputFormat::Csv => Box::new(CsvOutput::new()),
            OutputFormat::Parquet => Box::new(ParquetOutput::new()),
        }
    }
}
