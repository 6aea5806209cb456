pub mod ascii_writer;
pub mod json_writer;
pub mod output_trait;
pub mod reader;
pub mod sample;
pub mod table;

pub use ascii_writer::AsciiTableWriter;
pub use json_writer::JsonTableWriter;
pub use output_trait::{create_writer, OutputFormat, TableWriter};
pub use reader::DelimitedTextLoader;
pub use table::{to_records, Table};

use crate::array::LabeledArray;
use crate::errors::{AnalysisError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// A named collection of labeled arrays sharing a source
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Dataset name (usually the file stem)
    pub name: String,
    /// Variables keyed by name
    pub variables: BTreeMap<String, LabeledArray>,
    /// Global attributes
    pub attrs: BTreeMap<String, String>,
}

impl Dataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get variable by name
    pub fn get(&self, name: &str) -> Result<&LabeledArray> {
        self.variables
            .get(name)
            .ok_or_else(|| AnalysisError::UnknownVariable(name.to_string()))
    }

    /// Add or replace a variable, keyed by its own name
    pub fn insert(&mut self, array: LabeledArray) {
        self.variables.insert(array.name().to_string(), array);
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Common interface for anything that produces a [`Dataset`]
pub trait DatasetLoader {
    fn load(&self, location: &Path) -> Result<Dataset>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Axis;

    #[test]
    fn test_dataset_lookup() {
        let mut dataset = Dataset::new("obs");
        let array = LabeledArray::from_1d("sst", vec![1.0, 2.0], Axis::range("time", 2)).unwrap();
        dataset.insert(array);

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.variable_names(), vec!["sst"]);
        assert!(dataset.get("sst").is_ok());
        assert!(matches!(
            dataset.get("precip"),
            Err(AnalysisError::UnknownVariable(_))
        ));
    }
}
