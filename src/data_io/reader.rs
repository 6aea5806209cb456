use super::{Dataset, DatasetLoader};
use crate::array::{Axis, Coord, LabeledArray};
use crate::errors::{AnalysisError, Result};
use crate::time_utils::parse_timestamp;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;

/// Default missing value indicator in delimited input
pub const DEFAULT_MISSING_VALUE: f64 = -9999.0;

/// Loader for delimited text tables
///
/// The header row names the columns. The first column is the coordinate axis
/// (ISO-8601 timestamps, integers, floats or labels, in that order of
/// preference); every other column becomes a one-dimensional variable along
/// it. Empty cells, `NaN` and the missing value indicator load as NaN.
#[derive(Debug, Clone)]
pub struct DelimitedTextLoader {
    delimiter: u8,
    missing_value: f64,
}

impl Default for DelimitedTextLoader {
    fn default() -> Self {
        Self {
            delimiter: b',',
            missing_value: DEFAULT_MISSING_VALUE,
        }
    }
}

impl DelimitedTextLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_missing_value(mut self, missing_value: f64) -> Self {
        self.missing_value = missing_value;
        self
    }

    /// Tab-delimited for `.tsv`/`.tab` files, comma otherwise
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("tsv") | Some("tab") => Self::default().with_delimiter(b'\t'),
            _ => Self::default(),
        }
    }

    /// Parse a table held in memory
    pub fn load_str(&self, name: &str, input: &str) -> Result<Dataset> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(b'#'))
            .from_reader(input.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(AnalysisError::Parse(format!(
                "{}: expected a coordinate column and at least one variable, found {} columns",
                name,
                headers.len()
            )));
        }

        let records: Vec<StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;
        let coord_cells: Vec<&str> = records.iter().map(|r| r.get(0).unwrap_or("")).collect();
        let axis = parse_axis(&headers[0], &coord_cells)?;

        let mut dataset = Dataset::new(name);
        dataset
            .attrs
            .insert("source_format".to_string(), "delimited".to_string());

        for (column, variable) in headers.iter().enumerate().skip(1) {
            let mut skipped = 0usize;
            let values: Vec<f64> = records
                .iter()
                .map(|record| {
                    let cell = record.get(column).unwrap_or("");
                    self.parse_value(cell).unwrap_or_else(|| {
                        skipped += 1;
                        f64::NAN
                    })
                })
                .collect();
            if skipped > 0 {
                log::warn!(
                    "{}: {} unparseable cells in column {} loaded as missing",
                    name,
                    skipped,
                    variable
                );
            }
            dataset.insert(LabeledArray::from_1d(variable, values, axis.clone())?);
        }

        log::info!(
            "Loaded {} variables with {} rows along {} from {}",
            dataset.len(),
            axis.len(),
            axis.name(),
            name
        );
        Ok(dataset)
    }

    /// `None` for a cell that is not a number at all
    fn parse_value(&self, cell: &str) -> Option<f64> {
        if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
            return Some(f64::NAN);
        }
        let value: f64 = cell.parse().ok()?;
        if is_missing(value, self.missing_value) {
            Some(f64::NAN)
        } else {
            Some(value)
        }
    }
}

impl DatasetLoader for DelimitedTextLoader {
    fn load(&self, location: &Path) -> Result<Dataset> {
        let input = std::fs::read_to_string(location)?;
        let name = location
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "dataset".to_string());
        self.load_str(&name, &input)
    }
}

fn is_missing(value: f64, missing_value: f64) -> bool {
    (value - missing_value).abs() <= f64::EPSILON * missing_value.abs().max(1.0)
}

fn parse_axis(name: &str, cells: &[&str]) -> Result<Axis> {
    if let Ok(ints) = cells.iter().map(|c| c.parse::<i64>()).collect::<std::result::Result<Vec<_>, _>>() {
        return Ok(Axis::from_ints(name, ints));
    }
    if let Ok(floats) = cells.iter().map(|c| c.parse::<f64>()).collect::<std::result::Result<Vec<_>, _>>() {
        return Ok(Axis::from_floats(name, floats));
    }
    if let Ok(times) = cells.iter().map(|c| parse_timestamp(c)).collect::<Result<Vec<_>>>() {
        return Ok(Axis::from_times(name, times));
    }

    let labels: Vec<Coord> = cells.iter().map(|c| Coord::Label(c.to_string())).collect();
    Ok(Axis::new(name, labels))
}
