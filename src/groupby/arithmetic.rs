use super::keys::GroupKey;
use super::view::GroupbyView;
use crate::array::LabeledArray;
use crate::errors::{AnalysisError, Result};
use ndarray::{ArrayD, Axis as NdAxis, Zip};
use num_traits::Float;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Elementwise arithmetic between a source value and its group's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn apply<T: Float>(self, lhs: T, rhs: T) -> T {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for BinaryOp {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "+" | "add" => Ok(BinaryOp::Add),
            "-" | "sub" | "subtract" => Ok(BinaryOp::Sub),
            "*" | "mul" | "multiply" => Ok(BinaryOp::Mul),
            "/" | "div" | "divide" => Ok(BinaryOp::Div),
            _ => Err(AnalysisError::Parse(format!("Unknown binary operator: {}", s))),
        }
    }
}

/// Combine every source value with the value of its group
///
/// `per_group` must carry an axis named after the view's group dimension
/// whose coordinates are exactly the view's keys, in any order. Its other
/// axes must either match the source's non-grouped axes in order, or be
/// absent (one scalar per group). The result has the source's layout;
/// positions with a sentinel key hold NaN.
pub fn broadcast_binary(
    view: &GroupbyView<'_>,
    per_group: &LabeledArray,
    op: BinaryOp,
) -> Result<LabeledArray> {
    let source = view.source();
    let group_dim = view.group_dim();

    let group_index = per_group.axis_index(group_dim).map_err(|_| {
        AnalysisError::KeyMismatch(format!(
            "per-group values {} have no axis named {}",
            per_group.name(),
            group_dim
        ))
    })?;

    let lookup = key_lookup(view, per_group, group_index)?;

    let mut remaining: Vec<(&str, usize)> = source
        .axes()
        .iter()
        .map(|a| (a.name(), a.len()))
        .collect();
    remaining.remove(view.axis_index());
    let mut per_group_remaining: Vec<(&str, usize)> = per_group
        .axes()
        .iter()
        .map(|a| (a.name(), a.len()))
        .collect();
    per_group_remaining.remove(group_index);

    let scalar_per_group = per_group_remaining.is_empty();
    if !scalar_per_group && per_group_remaining != remaining {
        return Err(AnalysisError::ShapeMismatch(format!(
            "per-group values have dims {:?}, expected {:?} or only {}",
            per_group.dims(),
            remaining,
            group_dim
        )));
    }

    let axis_index = NdAxis(view.axis_index());
    let mut out = ArrayD::<f64>::from_elem(source.data().raw_dim(), f64::NAN);

    for position in 0..source.shape()[view.axis_index()] {
        let Some(key) = view.key_at(position) else {
            continue;
        };
        let row = lookup[key];
        let group_values = per_group.data().index_axis(NdAxis(group_index), row);
        let source_values = source.data().index_axis(axis_index, position);
        let target = out.index_axis_mut(axis_index, position);

        if scalar_per_group {
            let value = group_values.iter().next().copied().unwrap_or(f64::NAN);
            Zip::from(target)
                .and(&source_values)
                .for_each(|o, &s| *o = op.apply(s, value));
        } else {
            Zip::from(target)
                .and(&source_values)
                .and(&group_values)
                .for_each(|o, &s, &g| *o = op.apply(s, g));
        }
    }

    log::info!(
        "Broadcast {} {} {} over {} groups of {}",
        source.name(),
        op,
        per_group.name(),
        view.len(),
        group_dim
    );
    Ok(source.derive(out, source.axes().to_vec()))
}

/// Map each view key to its row in `per_group`, requiring identical key sets
fn key_lookup<'v>(
    view: &'v GroupbyView<'_>,
    per_group: &LabeledArray,
    group_index: usize,
) -> Result<BTreeMap<&'v GroupKey, usize>> {
    let axis = &per_group.axes()[group_index];
    let mut rows: BTreeMap<GroupKey, usize> = BTreeMap::new();
    for (row, coord) in axis.coords().iter().enumerate() {
        let key = GroupKey::from_coord(coord).ok_or_else(|| {
            AnalysisError::KeyMismatch(format!(
                "per-group coordinate {} on {} is missing",
                coord,
                axis.name()
            ))
        })?;
        if rows.insert(key, row).is_some() {
            return Err(AnalysisError::KeyMismatch(format!(
                "per-group coordinate {} appears more than once on {}",
                coord,
                axis.name()
            )));
        }
    }

    if rows.len() != view.len() {
        return Err(AnalysisError::KeyMismatch(format!(
            "per-group values have {} keys but the grouping has {}",
            rows.len(),
            view.len()
        )));
    }

    view.keys()
        .into_iter()
        .map(|key| {
            rows.get(key).map(|&row| (key, row)).ok_or_else(|| {
                AnalysisError::KeyMismatch(format!("group key {} has no per-group value", key))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{Axis, Coord};
    use crate::groupby::GroupKeyVector;

    fn setup() -> (LabeledArray, GroupKeyVector) {
        let source = LabeledArray::from_1d(
            "x",
            vec![1.0, 10.0, 3.0, 30.0, 5.0],
            Axis::range("time", 5),
        )
        .unwrap();
        let keys = GroupKeyVector::new(
            "parity",
            vec![
                Some(GroupKey::Int(1)),
                Some(GroupKey::Int(2)),
                Some(GroupKey::Int(1)),
                Some(GroupKey::Int(2)),
                None,
            ],
        );
        (source, keys)
    }

    #[test]
    fn test_binary_op_apply() {
        assert_eq!(BinaryOp::Sub.apply(5.0, 2.0), 3.0);
        assert_eq!(BinaryOp::Div.apply(6.0_f32, 3.0), 2.0);
        assert_eq!("-".parse::<BinaryOp>().unwrap(), BinaryOp::Sub);
    }

    #[test]
    fn test_broadcast_any_key_order() {
        let (source, keys) = setup();
        let view = GroupbyView::partition(&source, "time", keys).unwrap();

        // Keys deliberately listed in reverse order
        let per_group = LabeledArray::from_1d(
            "scale",
            vec![100.0, 2.0],
            Axis::new("parity", vec![Coord::Int(2), Coord::Int(1)]),
        )
        .unwrap();

        let out = broadcast_binary(&view, &per_group, BinaryOp::Mul).unwrap();
        let values = out.data().as_slice().unwrap();
        assert_eq!(&values[..4], &[2.0, 1000.0, 6.0, 3000.0]);
        assert!(values[4].is_nan());
    }

    #[test]
    fn test_broadcast_key_mismatch() {
        let (source, keys) = setup();
        let view = GroupbyView::partition(&source, "time", keys).unwrap();

        let wrong = LabeledArray::from_1d(
            "m",
            vec![1.0, 2.0],
            Axis::new("parity", vec![Coord::Int(1), Coord::Int(3)]),
        )
        .unwrap();
        assert!(matches!(
            broadcast_binary(&view, &wrong, BinaryOp::Sub),
            Err(AnalysisError::KeyMismatch(_))
        ));

        let short = LabeledArray::from_1d("m", vec![1.0], Axis::from_ints("parity", vec![1]))
            .unwrap();
        assert!(matches!(
            broadcast_binary(&view, &short, BinaryOp::Sub),
            Err(AnalysisError::KeyMismatch(_))
        ));

        let other_axis =
            LabeledArray::from_1d("m", vec![1.0, 2.0], Axis::from_ints("month", vec![1, 2]))
                .unwrap();
        assert!(matches!(
            broadcast_binary(&view, &other_axis, BinaryOp::Sub),
            Err(AnalysisError::KeyMismatch(_))
        ));
    }
}
