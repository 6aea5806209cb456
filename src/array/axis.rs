use crate::errors::{AnalysisError, Result};
use crate::time_utils::format_timestamp;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// A single coordinate value along an axis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Coord {
    Int(i64),
    Float(f64),
    Time(NaiveDateTime),
    Label(String),
    /// Right-closed interval `(lower, upper]`, produced by bin grouping
    Interval(f64, f64),
}

impl Coord {
    /// Numeric view of the coordinate, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Coord::Int(v) => Some(*v as f64),
            Coord::Float(v) => Some(*v),
            Coord::Interval(lower, upper) => Some(0.5 * (lower + upper)),
            Coord::Time(_) | Coord::Label(_) => None,
        }
    }

    /// Equality that compares `Int` and `Float` coordinates by value
    pub fn matches(&self, other: &Coord) -> bool {
        match (self, other) {
            (Coord::Int(a), Coord::Float(b)) | (Coord::Float(b), Coord::Int(a)) => *a as f64 == *b,
            _ => self == other,
        }
    }

    pub fn as_time(&self) -> Option<&NaiveDateTime> {
        match self {
            Coord::Time(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coord::Int(v) => write!(f, "{}", v),
            Coord::Float(v) => write!(f, "{}", v),
            Coord::Time(t) => write!(f, "{}", format_timestamp(t)),
            Coord::Label(s) => write!(f, "{}", s),
            Coord::Interval(lower, upper) => write!(f, "({}, {}]", lower, upper),
        }
    }
}

/// A named dimension with its ordered coordinate values
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    name: String,
    coords: Vec<Coord>,
}

impl Axis {
    pub fn new(name: impl Into<String>, coords: Vec<Coord>) -> Self {
        Self {
            name: name.into(),
            coords,
        }
    }

    pub fn from_ints(name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::new(name, values.into_iter().map(Coord::Int).collect())
    }

    pub fn from_floats(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(name, values.into_iter().map(Coord::Float).collect())
    }

    pub fn from_times(
        name: impl Into<String>,
        values: impl IntoIterator<Item = NaiveDateTime>,
    ) -> Self {
        Self::new(name, values.into_iter().map(Coord::Time).collect())
    }

    pub fn from_labels<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            values.into_iter().map(|s| Coord::Label(s.into())).collect(),
        )
    }

    /// Integer coordinates `0..len`, used for dimensions without labels
    pub fn range(name: impl Into<String>, len: usize) -> Self {
        Self::from_ints(name, 0..len as i64)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    pub fn coord(&self, position: usize) -> Option<&Coord> {
        self.coords.get(position)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// First position whose coordinate matches `coord`; numeric kinds compare by value
    pub fn position(&self, coord: &Coord) -> Option<usize> {
        self.coords.iter().position(|c| c.matches(coord))
    }

    /// Sub-axis holding the coordinates at `positions`, in that order
    pub fn select(&self, positions: &[usize]) -> Result<Axis> {
        let coords = positions
            .iter()
            .map(|&p| {
                self.coords.get(p).cloned().ok_or_else(|| {
                    AnalysisError::ShapeMismatch(format!(
                        "position {} out of bounds for axis {} of length {}",
                        p,
                        self.name,
                        self.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Axis::new(self.name.clone(), coords))
    }

    pub fn renamed(&self, name: impl Into<String>) -> Axis {
        Axis::new(name, self.coords.clone())
    }

    /// True when every coordinate is a timestamp
    pub fn is_temporal(&self) -> bool {
        !self.coords.is_empty() && self.coords.iter().all(|c| matches!(c, Coord::Time(_)))
    }

    /// Timestamps of a temporal axis
    pub fn times(&self) -> Result<Vec<NaiveDateTime>> {
        self.coords
            .iter()
            .map(|c| {
                c.as_time()
                    .copied()
                    .ok_or_else(|| AnalysisError::NotTemporal(self.name.clone()))
            })
            .collect()
    }

    /// Numeric coordinates, NaN where a coordinate has no numeric value
    pub fn numeric_values(&self) -> Vec<f64> {
        self.coords
            .iter()
            .map(|c| c.as_f64().unwrap_or(f64::NAN))
            .collect()
    }
}
