use super::calendar::CalendarField;
use crate::array::{Axis, Coord, LabeledArray};
use crate::errors::{AnalysisError, Result};
use crate::math::interpolate::{bin_index, nearest_index};
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;

/// A group label with a total order
///
/// Keys of different kinds order by kind first (`Int < Float < Time <
/// Label < Interval`), then by value. Floats use `f64::total_cmp`.
#[derive(Debug, Clone)]
pub enum GroupKey {
    Int(i64),
    Float(f64),
    Time(NaiveDateTime),
    Label(String),
    Interval(f64, f64),
}

impl GroupKey {
    fn rank(&self) -> u8 {
        match self {
            GroupKey::Int(_) => 0,
            GroupKey::Float(_) => 1,
            GroupKey::Time(_) => 2,
            GroupKey::Label(_) => 3,
            GroupKey::Interval(..) => 4,
        }
    }

    /// Key of a coordinate value, keeping its kind; NaN floats are sentinels
    pub fn from_coord(coord: &Coord) -> Option<GroupKey> {
        match coord {
            Coord::Int(v) => Some(GroupKey::Int(*v)),
            Coord::Float(v) => (!v.is_nan()).then_some(GroupKey::Float(*v)),
            Coord::Time(t) => Some(GroupKey::Time(*t)),
            Coord::Label(s) => Some(GroupKey::Label(s.clone())),
            Coord::Interval(lower, upper) => Some(GroupKey::Interval(*lower, *upper)),
        }
    }

    /// Key of a data value: NaN is a sentinel and integral values become `Int`
    pub fn from_f64(value: f64) -> Option<GroupKey> {
        if value.is_nan() {
            None
        } else if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Some(GroupKey::Int(value as i64))
        } else {
            Some(GroupKey::Float(value))
        }
    }

    /// Coordinate used for this key on a combined result axis
    pub fn to_coord(&self) -> Coord {
        match self {
            GroupKey::Int(v) => Coord::Int(*v),
            GroupKey::Float(v) => Coord::Float(*v),
            GroupKey::Time(t) => Coord::Time(*t),
            GroupKey::Label(s) => Coord::Label(s.clone()),
            GroupKey::Interval(lower, upper) => Coord::Interval(*lower, *upper),
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GroupKey::Int(a), GroupKey::Int(b)) => a.cmp(b),
            (GroupKey::Float(a), GroupKey::Float(b)) => a.total_cmp(b),
            (GroupKey::Time(a), GroupKey::Time(b)) => a.cmp(b),
            (GroupKey::Label(a), GroupKey::Label(b)) => a.cmp(b),
            (GroupKey::Interval(a0, a1), GroupKey::Interval(b0, b1)) => {
                a0.total_cmp(b0).then_with(|| a1.total_cmp(b1))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_coord())
    }
}

/// How an external key array is matched onto the grouped axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Alignment {
    /// Coordinates must be equal
    Exact,
    /// Nearest numeric coordinate within `tolerance`
    Nearest { tolerance: f64 },
}

/// Group labels aligned position-by-position with one axis of a source array
///
/// `None` entries are sentinels: those positions belong to no group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupKeyVector {
    name: String,
    keys: Vec<Option<GroupKey>>,
}

impl GroupKeyVector {
    /// `name` becomes the name of the axis produced by a grouped reduction
    pub fn new(name: impl Into<String>, keys: Vec<Option<GroupKey>>) -> Self {
        Self {
            name: name.into(),
            keys,
        }
    }

    /// Group by the axis coordinates themselves
    pub fn from_axis(axis: &Axis) -> Self {
        Self::new(
            axis.name(),
            axis.coords().iter().map(GroupKey::from_coord).collect(),
        )
    }

    /// Group a temporal axis by a calendar field of its own coordinates
    pub fn from_calendar(axis: &Axis, field: CalendarField) -> Result<Self> {
        let keys = axis
            .times()?
            .iter()
            .map(|t| field.extract(t))
            .collect();
        Ok(Self::new(field.as_str(), keys))
    }

    /// Align the values of a 1-D array onto `target` by shared coordinate
    ///
    /// Target positions with no matching coordinate, or whose matched value
    /// is NaN, become sentinels. `Exact` compares `Int` and `Float`
    /// coordinates by value.
    pub fn from_array(values: &LabeledArray, target: &Axis, alignment: Alignment) -> Result<Self> {
        if values.ndim() != 1 {
            return Err(AnalysisError::ShapeMismatch(format!(
                "key array {} must be 1-D, got dims {:?}",
                values.name(),
                values.dims()
            )));
        }

        let source_axis = &values.axes()[0];
        let data: Vec<f64> = values.data().iter().copied().collect();

        let keys = match alignment {
            Alignment::Exact => target
                .coords()
                .iter()
                .map(|coord| {
                    source_axis
                        .position(coord)
                        .and_then(|p| GroupKey::from_f64(data[p]))
                })
                .collect(),
            Alignment::Nearest { tolerance } => {
                let source_coords = source_axis.numeric_values();
                target
                    .coords()
                    .iter()
                    .map(|coord| {
                        let x = coord.as_f64()?;
                        let p = nearest_index(&source_coords, x)?;
                        if (source_coords[p] - x).abs() <= tolerance {
                            GroupKey::from_f64(data[p])
                        } else {
                            None
                        }
                    })
                    .collect()
            }
        };

        Ok(Self::new(values.name(), keys))
    }

    /// Right-closed bins `(edges[i], edges[i+1]]` over a numeric axis
    pub fn from_bins(axis: &Axis, edges: &[f64]) -> Result<Self> {
        if edges.len() < 2 || edges.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(AnalysisError::InvalidWindow(format!(
                "bin edges must be strictly increasing with at least two values, got {:?}",
                edges
            )));
        }

        let keys = axis
            .coords()
            .iter()
            .map(|coord| {
                let x = coord.as_f64()?;
                let bin = bin_index(edges, x)?;
                Some(GroupKey::Interval(edges[bin], edges[bin + 1]))
            })
            .collect();

        Ok(Self::new(format!("{}_bins", axis.name()), keys))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &[Option<GroupKey>] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&GroupKey> {
        self.keys.get(position).and_then(Option::as_ref)
    }

    /// Number of sentinel positions
    pub fn missing(&self) -> usize {
        self.keys.iter().filter(|k| k.is_none()).count()
    }
}
