use super::output_trait::TableWriter;
use super::table::Table;
use crate::errors::{AnalysisError, Result};
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON writer: one document with the attributes and every table as records
pub struct JsonTableWriter {
    output_path: Option<PathBuf>,
    attributes: Map<String, Value>,
    tables: Vec<Table>,
}

impl JsonTableWriter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self {
            output_path,
            attributes: Map::new(),
            tables: Vec::new(),
        }
    }

    fn table_value(table: &Table) -> Result<Value> {
        let records = table
            .rows
            .iter()
            .map(|row| -> Result<Value> {
                let mut record = Map::new();
                for (dim, coord) in table.dims.iter().zip(&row.coords) {
                    record.insert(dim.clone(), serde_json::to_value(coord)?);
                }
                // NaN has no JSON representation and becomes null
                record.insert(table.name.clone(), Value::from(row.value));
                Ok(Value::Object(record))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(json!({
            "name": table.name,
            "dims": table.dims,
            "attrs": table.attrs,
            "records": records,
        }))
    }

    /// The document that [`TableWriter::write_to`] renders
    pub fn document(&self) -> Result<Value> {
        let tables = self
            .tables
            .iter()
            .map(Self::table_value)
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({
            "attributes": self.attributes,
            "tables": tables,
        }))
    }
}

impl TableWriter for JsonTableWriter {
    fn write_table(&mut self, table: &Table) -> Result<()> {
        self.tables.push(table.clone());
        Ok(())
    }

    fn add_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        self.attributes
            .insert(name.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        if self.tables.is_empty() {
            return Err(AnalysisError::Config("No tables to write".to_string()));
        }
        serde_json::to_writer_pretty(&mut *out, &self.document()?)?;
        writeln!(out)?;
        Ok(())
    }

    fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{Axis, LabeledArray};
    use crate::time_utils::parse_timestamp;

    #[test]
    fn test_json_document() {
        let times = vec![
            parse_timestamp("2000-01-01").unwrap(),
            parse_timestamp("2000-02-01").unwrap(),
        ];
        let array = LabeledArray::from_1d("sst", vec![20.0, f64::NAN], Axis::from_times("time", times))
            .unwrap()
            .with_attr("units", "degC");

        let mut writer = JsonTableWriter::new(None);
        writer.add_attribute("operation", "resample").unwrap();
        writer.write_table(&Table::from_array(&array)).unwrap();

        let doc = writer.document().unwrap();
        assert_eq!(doc["attributes"]["operation"], "resample");
        let table = &doc["tables"][0];
        assert_eq!(table["attrs"]["units"], "degC");
        assert_eq!(table["records"][0]["time"], "2000-01-01T00:00:00");
        assert_eq!(table["records"][0]["sst"], 20.0);
        assert!(table["records"][1]["sst"].is_null());

        let mut buffer = Vec::new();
        writer.write_to(&mut buffer).unwrap();
        let parsed: Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed, doc);
    }
}
