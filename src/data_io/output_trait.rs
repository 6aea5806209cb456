use super::ascii_writer::AsciiTableWriter;
use super::json_writer::JsonTableWriter;
use super::table::Table;
use crate::errors::{AnalysisError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Generic trait for writing analysis tables to different formats
///
/// Writers buffer tables and attributes; nothing touches the output until
/// [`TableWriter::close`].
pub trait TableWriter {
    /// Queue a table for output
    fn write_table(&mut self, table: &Table) -> Result<()>;

    /// Add a global attribute, written as a header comment or metadata field
    fn add_attribute(&mut self, name: &str, value: &str) -> Result<()>;

    /// Render everything queued so far into `out`
    fn write_to(&self, out: &mut dyn Write) -> Result<()>;

    /// Destination file; `None` means standard output
    fn output_path(&self) -> Option<&Path>;

    /// Finalize: render into the output file, or stdout when there is none
    fn close(&mut self) -> Result<()> {
        match self.output_path() {
            Some(path) => {
                let mut file = BufWriter::new(File::create(path)?);
                self.write_to(&mut file)?;
                file.flush()?;
                log::info!("Wrote output to {}", path.display());
            }
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                self.write_to(&mut handle)?;
                handle.flush()?;
            }
        }
        Ok(())
    }
}

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Whitespace-aligned text with `#` header comments
    Ascii,
    Json,
}

impl OutputFormat {
    /// Detect output format from file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => OutputFormat::Json,
            Some("txt") | Some("ascii") | Some("dat") => OutputFormat::Ascii,
            _ => OutputFormat::Csv,
        }
    }

    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Ascii => "txt",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Ascii => write!(f, "ascii"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "ascii" | "txt" | "text" => Ok(OutputFormat::Ascii),
            "json" => Ok(OutputFormat::Json),
            _ => Err(AnalysisError::Parse(format!("Unknown output format: {}", s))),
        }
    }
}

/// Factory function to create appropriate writer for the format
pub fn create_writer(output_path: Option<&Path>, format: OutputFormat) -> Box<dyn TableWriter> {
    let output_path: Option<PathBuf> = output_path.map(Path::to_path_buf);
    match format {
        OutputFormat::Csv => Box::new(AsciiTableWriter::csv(output_path)),
        OutputFormat::Ascii => Box::new(AsciiTableWriter::whitespace(output_path)),
        OutputFormat::Json => Box::new(JsonTableWriter::new(output_path)),
    }
}
