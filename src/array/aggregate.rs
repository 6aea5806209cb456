use crate::errors::{AnalysisError, Result};
use num_traits::Float;
use std::fmt;
use std::str::FromStr;

/// Built-in skip-missing aggregations
///
/// NaN inputs are excluded from every computation. A lane with no valid
/// values yields NaN, except `Sum` and `Count` which yield zero.
/// `Std` and `Var` use the population definition (ddof = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Mean,
    Sum,
    Min,
    Max,
    Std,
    Var,
    Count,
    Median,
    First,
    Last,
}

impl Aggregation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Std => "std",
            Self::Var => "var",
            Self::Count => "count",
            Self::Median => "median",
            Self::First => "first",
            Self::Last => "last",
        }
    }

    /// Aggregate a lane of values, skipping NaN
    pub fn aggregate<T: Float>(self, values: impl IntoIterator<Item = T>) -> T {
        let valid: Vec<T> = values.into_iter().filter(|v| !v.is_nan()).collect();

        match self {
            Self::Sum => valid.iter().fold(T::zero(), |acc, &v| acc + v),
            Self::Count => T::from(valid.len()).unwrap_or_else(T::nan),
            _ if valid.is_empty() => T::nan(),
            Self::Mean => mean(&valid),
            Self::Min => valid.iter().copied().fold(T::infinity(), T::min),
            Self::Max => valid.iter().copied().fold(T::neg_infinity(), T::max),
            Self::Var => variance(&valid),
            Self::Std => variance(&valid).sqrt(),
            Self::Median => {
                let mut sorted = valid;
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / (T::one() + T::one())
                } else {
                    sorted[mid]
                }
            }
            Self::First => valid[0],
            Self::Last => valid[valid.len() - 1],
        }
    }
}

fn mean<T: Float>(values: &[T]) -> T {
    let n = T::from(values.len()).unwrap_or_else(T::nan);
    values.iter().fold(T::zero(), |acc, &v| acc + v) / n
}

fn variance<T: Float>(values: &[T]) -> T {
    let m = mean(values);
    let n = T::from(values.len()).unwrap_or_else(T::nan);
    values
        .iter()
        .fold(T::zero(), |acc, &v| acc + (v - m) * (v - m))
        / n
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mean" | "avg" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "std" => Ok(Self::Std),
            "var" => Ok(Self::Var),
            "count" => Ok(Self::Count),
            "median" => Ok(Self::Median),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            _ => Err(AnalysisError::Parse(format!("Unknown aggregation: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_missing() {
        let values = [1.0, f64::NAN, 3.0];
        assert_eq!(Aggregation::Mean.aggregate(values), 2.0);
        assert_eq!(Aggregation::Sum.aggregate(values), 4.0);
        assert_eq!(Aggregation::Count.aggregate(values), 2.0);
        assert_eq!(Aggregation::Min.aggregate(values), 1.0);
        assert_eq!(Aggregation::Max.aggregate(values), 3.0);
        assert_eq!(Aggregation::First.aggregate(values), 1.0);
        assert_eq!(Aggregation::Last.aggregate(values), 3.0);
    }

    #[test]
    fn test_all_missing() {
        let values = [f64::NAN, f64::NAN];
        assert!(Aggregation::Mean.aggregate(values).is_nan());
        assert!(Aggregation::Std.aggregate(values).is_nan());
        assert_eq!(Aggregation::Sum.aggregate(values), 0.0);
        assert_eq!(Aggregation::Count.aggregate(values), 0.0);
    }

    #[test]
    fn test_spread() {
        let values = [2.0_f64, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(Aggregation::Var.aggregate(values), 4.0);
        assert_eq!(Aggregation::Std.aggregate(values), 2.0);
        assert_eq!(Aggregation::Median.aggregate(values), 4.5);
        assert_eq!(Aggregation::Median.aggregate([3.0_f64, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Mean".parse::<Aggregation>().unwrap(), Aggregation::Mean);
        assert!("mode".parse::<Aggregation>().is_err());
    }
}
