//! Configuration handling for bsonframe

use std::path::{Path, PathBuf};

/// Output format for flattened tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Csv,
    Parquet,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Encoding of an input file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputFormat {
    /// Decide from the file extension
    #[default]
    Auto,
    /// Concatenated wire documents, as written by a dump tool
    Bson,
    /// One Extended JSON object per line
    JsonLines,
}

impl InputFormat {
    /// Resolve `Auto` against a path; explicit formats are returned as-is.
    /// `.json`, `.jsonl` and `.ndjson` files are JSON Lines, anything else
    /// is read as wire documents.
    pub fn resolve(self, path: &Path) -> InputFormat {
        if self != InputFormat::Auto {
            return self;
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "json" | "jsonl" | "ndjson" => InputFormat::JsonLines,
            _ => InputFormat::Bson,
        }
    }
}

impl std::str::FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(InputFormat::Auto),
            "bson" => Ok(InputFormat::Bson),
            "jsonl" | "ndjson" => Ok(InputFormat::JsonLines),
            _ => Err(format!("Unknown input format: {}", s)),
        }
    }
}

/// Switches controlling how numeric and temporal values are classified
/// during flattening
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Keep `Int64` values as exact decimal strings instead of narrowing
    /// them to `f64`
    pub bigint_as_string: bool,
    /// Render date-times as ISO-8601 strings instead of a temporal column
    pub date_as_string: bool,
}

impl FlattenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bigint_as_string(mut self, enabled: bool) -> Self {
        self.bigint_as_string = enabled;
        self
    }

    pub fn with_date_as_string(mut self, enabled: bool) -> Self {
        self.date_as_string = enabled;
        self
    }
}

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Configuration for a flattening run
#[derive(Debug, Clone)]
pub struct Config {
    /// Files to read
    pub inputs: Vec<PathBuf>,
    /// How to decode the inputs
    pub input_format: InputFormat,
    /// Output format
    pub output_format: OutputFormat,
    /// Destination file; stdout when absent
    pub output_path: Option<PathBuf>,
    /// Maximum rows per page
    pub page_size: usize,
    /// Stop after this many pages per input
    pub max_pages: Option<usize>,
    /// Value classification switches
    pub flatten: FlattenOptions,
    /// Only show schema and counts, not rows
    pub stats_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            input_format: InputFormat::default(),
            output_format: OutputFormat::default(),
            output_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
            flatten: FlattenOptions::default(),
            stats_only: false,
        }
    }
}

impl Config {
    /// Create a new Config for the given input files
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self {
            inputs,
            ..Default::default()
        }
    }

    /// Set input format
    pub fn with_input_format(mut self, format: InputFormat) -> Self {
        self.input_format = format;
        self
    }

    /// Set output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Write output to a file instead of stdout
    pub fn with_output_path(mut self, path: PathBuf) -> Self {
        self.output_path = Some(path);
        self
    }

    /// Set rows per page
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Limit the number of pages read from each input
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Set flattening switches
    pub fn with_flatten_options(mut self, options: FlattenOptions) -> Self {
        self.flatten = options;
        self
    }

    /// Enable stats-only mode
    pub fn with_stats_only(mut self, stats_only: bool) -> Self {
        self.stats_only = stats_only;
        self
    }
}
