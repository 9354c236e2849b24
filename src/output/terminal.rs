//! Terminal table output

use std::io::{IsTerminal, Write};

use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use tabled::builder::Builder;
use tabled::settings::Style;
use termcolor::{Ansi, ColorChoice, ColorSpec, NoColor, WriteColor};

use crate::model::{ColumnType, Table};

use super::OutputFormatter;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Box-drawn tables, one per page
pub struct TerminalOutput {
    color_choice: ColorChoice,
}

impl TerminalOutput {
    pub fn new() -> Self {
        Self {
            color_choice: ColorChoice::Auto,
        }
    }

    pub fn with_color_choice(color_choice: ColorChoice) -> Self {
        Self { color_choice }
    }

    fn use_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always | ColorChoice::AlwaysAnsi => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
            }
        }
    }

    fn write_header(&self, title: &str, writer: &mut dyn Write) -> Result<()> {
        writeln!(writer, "{RULE}")?;
        if self.use_color() {
            let mut out = Ansi::new(&mut *writer);
            out.set_color(ColorSpec::new().set_bold(true))?;
            write!(out, " {title}")?;
            out.reset()?;
            writeln!(out)?;
        } else {
            let mut out = NoColor::new(&mut *writer);
            writeln!(out, " {title}")?;
        }
        writeln!(writer, "{RULE}")?;
        Ok(())
    }

    fn write_page(&self, table: &Table, page: Option<usize>, writer: &mut dyn Write) -> Result<()> {
        let shape = format!("{} rows × {} columns", table.row_count(), table.column_count());
        let title = match page {
            Some(page) => format!("Page {page}: {shape}"),
            None => shape,
        };
        self.write_header(&title, writer)?;

        if table.column_count() > 0 {
            let mut builder = Builder::default();
            builder.push_record(
                table
                    .columns()
                    .iter()
                    .map(|c| format!("{}\n<{}>", c.name(), c.element_type())),
            );
            for row in table.rows() {
                builder.push_record(row.iter().map(|cell| cell.to_string()));
            }
            let mut display = builder.build();
            display.with(Style::modern());
            writeln!(writer, "{display}")?;
        }

        write_warnings(table, writer)?;
        writeln!(writer)?;
        Ok(())
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TerminalOutput {
    fn render(&self, table: &Table, writer: &mut dyn Write) -> Result<()> {
        self.write_page(table, None, writer)
    }

    fn render_pages(&self, tables: &[Table], writer: &mut dyn Write) -> Result<()> {
        if tables.is_empty() {
            writeln!(writer, "No documents found.")?;
            return Ok(());
        }
        for (i, table) in tables.iter().enumerate() {
            self.write_page(table, Some(i + 1), writer)?;
        }
        Ok(())
    }

    /// Each input gets its own title, and its pages are numbered from 1
    fn render_inputs(&self, inputs: &[(String, Vec<Table>)], writer: &mut dyn Write) -> Result<()> {
        if let [(_, tables)] = inputs {
            return self.render_pages(tables, writer);
        }
        for (label, tables) in inputs {
            self.write_header(label, writer)?;
            self.render_pages(tables, writer)?;
        }
        Ok(())
    }
}

fn write_warnings(table: &Table, writer: &mut dyn Write) -> Result<()> {
    if table.warnings().is_empty() {
        return Ok(());
    }
    writeln!(writer, "Warnings:")?;
    for warning in table.warnings() {
        writeln!(writer, "  {}", warning)?;
    }
    Ok(())
}

#[derive(Default)]
struct ColumnSummary {
    types: IndexSet<ColumnType>,
    missing: usize,
}

fn summarize(tables: &[Table]) -> IndexMap<&str, ColumnSummary> {
    let mut columns: IndexMap<&str, ColumnSummary> = IndexMap::new();
    let mut rows_before = 0;
    for table in tables {
        let mut seen = IndexSet::new();
        for column in table.columns() {
            let summary = columns.entry(column.name()).or_insert_with(|| ColumnSummary {
                missing: rows_before,
                ..Default::default()
            });
            summary.types.insert(column.element_type());
            summary.missing += column.missing_count();
            seen.insert(column.name());
        }
        // columns absent from a page are missing for all of its rows
        for (name, summary) in columns.iter_mut() {
            if !seen.contains(name) {
                summary.missing += table.row_count();
            }
        }
        rows_before += table.row_count();
    }
    columns
}

/// Schema and counts across all pages of one input
pub fn write_summary(label: &str, tables: &[Table], writer: &mut dyn Write) -> Result<()> {
    let rows: usize = tables.iter().map(Table::row_count).sum();
    writeln!(writer, "{}: {} pages, {} rows", label, tables.len(), rows)?;

    let columns = summarize(tables);
    if columns.is_empty() {
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["column", "type", "missing"].map(String::from));
    for (name, summary) in &columns {
        let types: Vec<String> = summary.types.iter().map(ToString::to_string).collect();
        builder.push_record([name.to_string(), types.join(" | "), summary.missing.to_string()]);
    }
    let mut display = builder.build();
    display.with(Style::modern());
    writeln!(writer, "{display}")?;

    let warnings: usize = tables.iter().map(|t| t.warnings().len()).sum();
    if warnings > 0 {
        writeln!(writer, "{} warnings", warnings)?;
    }
    Ok(())
}
