use crate::array::{Coord, LabeledArray};
use crate::errors::{AnalysisError, Result};
use std::collections::BTreeMap;

/// `(coordinate, value)` pairs of a one-dimensional array
pub fn to_records(array: &LabeledArray) -> Result<Vec<(Coord, f64)>> {
    if array.ndim() != 1 {
        return Err(AnalysisError::ShapeMismatch(format!(
            "records need a one-dimensional array, {} has dims {:?}",
            array.name(),
            array.dims()
        )));
    }
    let axis = &array.axes()[0];
    Ok(axis
        .coords()
        .iter()
        .cloned()
        .zip(array.data().iter().copied())
        .collect())
}

/// One row per array element: the element's coordinates and its value
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub coords: Vec<Coord>,
    pub value: f64,
}

/// Long-format table of a labeled array
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Name of the value column
    pub name: String,
    /// Coordinate column names, one per axis
    pub dims: Vec<String>,
    pub rows: Vec<Row>,
    pub attrs: BTreeMap<String, String>,
}

impl Table {
    /// Flatten `array` in row-major order
    pub fn from_array(array: &LabeledArray) -> Self {
        let axes = array.axes();
        let rows = array
            .data()
            .indexed_iter()
            .map(|(index, value)| Row {
                coords: axes
                    .iter()
                    .enumerate()
                    .map(|(d, axis)| axis.coords()[index[d]].clone())
                    .collect(),
                value: *value,
            })
            .collect();

        Self {
            name: array.name().to_string(),
            dims: array.dims().iter().map(|d| d.to_string()).collect(),
            rows,
            attrs: array.attrs().clone(),
        }
    }

    /// Column headers: coordinate columns then the value column
    pub fn columns(&self) -> Vec<&str> {
        self.dims
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Axis;

    #[test]
    fn test_records_require_one_dimension() {
        let array = LabeledArray::from_1d(
            "mean",
            vec![1.0, 2.0],
            Axis::from_labels("season", vec!["DJF", "JJA"]),
        )
        .unwrap();
        let records = to_records(&array).unwrap();
        assert_eq!(records[1], (Coord::Label("JJA".to_string()), 2.0));

        let grid = LabeledArray::from_shape_vec(
            "x",
            vec![0.0; 4],
            vec![Axis::range("a", 2), Axis::range("b", 2)],
        )
        .unwrap();
        assert!(matches!(
            to_records(&grid),
            Err(AnalysisError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_table_is_row_major() {
        let grid = LabeledArray::from_shape_vec(
            "x",
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            vec![Axis::range("a", 2), Axis::from_floats("b", vec![0.5, 1.5, 2.5])],
        )
        .unwrap();
        let table = Table::from_array(&grid);
        assert_eq!(table.columns(), vec!["a", "b", "x"]);
        assert_eq!(table.len(), 6);
        assert_eq!(table.rows[4].coords, vec![Coord::Int(1), Coord::Float(1.5)]);
        assert_eq!(table.rows[4].value, 4.0);
    }
}
