use super::output_trait::TableWriter;
use super::table::Table;
use crate::array::Coord;
use crate::errors::{AnalysisError, Result};
use csv::WriterBuilder;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Csv,
    Whitespace,
}

/// Delimited text writer for analysis tables
///
/// Attributes become `# name: value` comment lines ahead of the tables;
/// each table gets its own header row and tables are separated by a blank
/// line. Missing values are empty cells in CSV and `NaN` in whitespace
/// layout.
pub struct AsciiTableWriter {
    output_path: Option<PathBuf>,
    layout: Layout,
    attributes: Vec<(String, String)>,
    tables: Vec<Table>,
}

impl AsciiTableWriter {
    pub fn csv(output_path: Option<PathBuf>) -> Self {
        Self::with_layout(output_path, Layout::Csv)
    }

    pub fn whitespace(output_path: Option<PathBuf>) -> Self {
        Self::with_layout(output_path, Layout::Whitespace)
    }

    fn with_layout(output_path: Option<PathBuf>, layout: Layout) -> Self {
        Self {
            output_path,
            layout,
            attributes: Vec::new(),
            tables: Vec::new(),
        }
    }

    fn coord_cell(&self, coord: &Coord) -> String {
        match (self.layout, coord) {
            (Layout::Whitespace, Coord::Interval(lower, upper)) => format!("({},{}]", lower, upper),
            _ => coord.to_string(),
        }
    }

    fn value_cell(&self, value: f64) -> String {
        match (self.layout, value.is_nan()) {
            (Layout::Csv, true) => String::new(),
            (Layout::Whitespace, true) => "NaN".to_string(),
            (_, false) => format!("{:.6}", value),
        }
    }

    fn write_csv(&self, table: &Table, out: &mut dyn Write) -> Result<()> {
        let mut writer = WriterBuilder::new().from_writer(out);
        writer.write_record(table.columns())?;
        for row in &table.rows {
            let mut record: Vec<String> = row.coords.iter().map(|c| self.coord_cell(c)).collect();
            record.push(self.value_cell(row.value));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_whitespace(&self, table: &Table, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "# Columns: {}", table.columns().join(" "))?;
        for row in &table.rows {
            let mut cells: Vec<String> = row.coords.iter().map(|c| self.coord_cell(c)).collect();
            cells.push(self.value_cell(row.value));
            writeln!(out, "{}", cells.join(" "))?;
        }
        Ok(())
    }
}

impl TableWriter for AsciiTableWriter {
    fn write_table(&mut self, table: &Table) -> Result<()> {
        self.tables.push(table.clone());
        Ok(())
    }

    fn add_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.attributes.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        if self.tables.is_empty() {
            return Err(AnalysisError::Config("No tables to write".to_string()));
        }

        for (name, value) in &self.attributes {
            writeln!(out, "# {}: {}", name, value)?;
        }

        for (i, table) in self.tables.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            match self.layout {
                Layout::Csv => self.write_csv(table, out)?,
                Layout::Whitespace => self.write_whitespace(table, out)?,
            }
        }
        Ok(())
    }

    fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }
}
