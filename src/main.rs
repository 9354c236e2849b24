//! bsonframe - Flatten BSON document streams into tables

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use termcolor::ColorChoice;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use bsonframe::config::{Config, FlattenOptions, InputFormat, OutputFormat, DEFAULT_PAGE_SIZE};
use bsonframe::flatten::Pages;
use bsonframe::model::Table;
use bsonframe::output::{write_summary, OutputFactory};
use bsonframe::source::open_source;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Terminal,
    Json,
    Csv,
    Parquet,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Terminal => OutputFormat::Terminal,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Csv => OutputFormat::Csv,
            CliOutputFormat::Parquet => OutputFormat::Parquet,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliInputFormat {
    Auto,
    Bson,
    Jsonl,
}

impl From<CliInputFormat> for InputFormat {
    fn from(f: CliInputFormat) -> Self {
        match f {
            CliInputFormat::Auto => InputFormat::Auto,
            CliInputFormat::Bson => InputFormat::Bson,
            CliInputFormat::Jsonl => InputFormat::JsonLines,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliColor {
    Auto,
    Always,
    Never,
}

impl From<CliColor> for ColorChoice {
    fn from(c: CliColor) -> Self {
        match c {
            CliColor::Auto => ColorChoice::Auto,
            CliColor::Always => ColorChoice::Always,
            CliColor::Never => ColorChoice::Never,
        }
    }
}

/// Flatten BSON dumps or Extended JSON lines into typed tables
#[derive(Parser, Debug)]
#[command(name = "bsonframe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input files (.bson dumps, or .json/.jsonl/.ndjson Extended JSON lines)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: CliOutputFormat,

    /// Input encoding
    #[arg(short, long, value_enum, default_value = "auto")]
    input_format: CliInputFormat,

    /// Maximum rows per page
    #[arg(short = 'n', long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = parse_page_size)]
    page_size: usize,

    /// Stop after this many pages per input
    #[arg(long)]
    max_pages: Option<usize>,

    /// Write output to a file instead of stdout (required for parquet)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep 64-bit integers as exact strings instead of doubles
    #[arg(long)]
    bigint_as_string: bool,

    /// Render dates as ISO-8601 strings instead of a datetime column
    #[arg(long)]
    date_as_string: bool,

    /// Only show schema and row counts, not rows
    #[arg(long)]
    stats_only: bool,

    /// When to color terminal output
    #[arg(long, value_enum, default_value = "auto")]
    color: CliColor,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn parse_page_size(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("page size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "bsonframe=debug" } else { "bsonframe=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::new(cli.inputs)
        .with_input_format(cli.input_format.into())
        .with_output_format(cli.format.into())
        .with_page_size(cli.page_size)
        .with_flatten_options(
            FlattenOptions::new()
                .with_bigint_as_string(cli.bigint_as_string)
                .with_date_as_string(cli.date_as_string),
        )
        .with_stats_only(cli.stats_only);
    if let Some(max_pages) = cli.max_pages {
        config = config.with_max_pages(max_pages);
    }
    if let Some(path) = cli.output {
        config = config.with_output_path(path);
    }

    if config.output_format == OutputFormat::Parquet
        && config.output_path.is_none()
        && !config.stats_only
    {
        bail!("Parquet output needs a file: pass --output <PATH>");
    }

    // Inputs are independent, so flatten them in parallel and render in order
    let results: Vec<Result<Vec<Table>>> = config
        .inputs
        .par_iter()
        .map(|path| {
            read_pages(path, &config)
                .with_context(|| format!("Failed to flatten {}", path.display()))
        })
        .collect();
    let inputs: Vec<(String, Vec<Table>)> = config
        .inputs
        .iter()
        .zip(results)
        .map(|(path, tables)| tables.map(|t| (path.display().to_string(), t)))
        .collect::<Result<_>>()?;

    let mut writer: Box<dyn Write> = match &config.output_path {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file: {}", path.display())
        })?)),
        None => Box::new(std::io::stdout().lock()),
    };

    if config.stats_only {
        for (label, tables) in &inputs {
            write_summary(label, tables, &mut writer)?;
        }
    } else {
        let color = if config.output_path.is_some() {
            ColorChoice::Never
        } else {
            cli.color.into()
        };
        let formatter = OutputFactory::create(config.output_format, color);
        formatter.render_inputs(&inputs, &mut writer)?;
    }
    writer.flush()?;

    if let Some(path) = &config.output_path {
        info!(path = %path.display(), "output written");
    }
    Ok(())
}

fn read_pages(path: &Path, config: &Config) -> Result<Vec<Table>> {
    let mut source = open_source(path, config.input_format)?;
    let pages = Pages::new(&mut source, config.page_size).with_options(config.flatten);
    let tables = match config.max_pages {
        Some(max) => pages.take(max).collect::<bsonframe::Result<Vec<_>>>()?,
        None => pages.collect::<bsonframe::Result<Vec<_>>>()?,
    };
    let rows: usize = tables.iter().map(Table::row_count).sum();
    debug!(path = %path.display(), pages = tables.len(), rows, "input flattened");
    Ok(tables)
}
