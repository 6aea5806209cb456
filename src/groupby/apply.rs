//! Split/apply/combine over a [`GroupbyView`]
//!
//! Operators come in exactly two shapes. A [`ReductionOp`] maps a group
//! sub-array to an array with the grouped axis removed; the combined result
//! replaces the grouped axis with one coordinate per group key. A
//! [`TransformOp`] maps a group to an array of the same shape; the combined
//! result scatters every group back to its original positions.

use super::view::GroupbyView;
use crate::array::{Aggregation, Axis, LabeledArray};
use crate::errors::{AnalysisError, Result};
use crate::parallel::{map_ordered, ExecutionOptions};
use ndarray::{ArrayD, ArrayViewD, Axis as NdAxis};

/// Collapses the grouped axis of a group sub-array
pub trait ReductionOp: Sync {
    fn name(&self) -> &str;

    /// Must return `group` with `axis` removed and every other axis kept in order
    fn reduce(&self, group: &LabeledArray, axis: &str) -> Result<LabeledArray>;
}

/// Maps a group sub-array to a new array of identical shape
pub trait TransformOp: Sync {
    fn name(&self) -> &str;

    fn transform(&self, group: &LabeledArray, axis: &str) -> Result<LabeledArray>;
}

/// The operator handed to [`apply`]
#[derive(Clone, Copy)]
pub enum GroupOp<'o> {
    Reduce(&'o dyn ReductionOp),
    Transform(&'o dyn TransformOp),
}

impl ReductionOp for Aggregation {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn reduce(&self, group: &LabeledArray, axis: &str) -> Result<LabeledArray> {
        group.reduce(axis, *self)
    }
}

/// Remove the group mean along the grouped axis (climatology removal)
#[derive(Debug, Clone, Copy, Default)]
pub struct Demean;

impl TransformOp for Demean {
    fn name(&self) -> &str {
        "demean"
    }

    fn transform(&self, group: &LabeledArray, axis: &str) -> Result<LabeledArray> {
        let index = group.axis_index(axis)?;
        let mean = group.reduce(axis, Aggregation::Mean)?;
        let expanded = mean.data().view().insert_axis(NdAxis(index));
        let data = group.data() - &expanded;
        Ok(group.derive(data, group.axes().to_vec()))
    }
}

/// Scale group anomalies by the group standard deviation
#[derive(Debug, Clone, Copy, Default)]
pub struct Standardize;

impl TransformOp for Standardize {
    fn name(&self) -> &str {
        "standardize"
    }

    fn transform(&self, group: &LabeledArray, axis: &str) -> Result<LabeledArray> {
        let index = group.axis_index(axis)?;
        let mean = group.reduce(axis, Aggregation::Mean)?;
        let std = group.reduce(axis, Aggregation::Std)?;
        let mean = mean.data().view().insert_axis(NdAxis(index));
        let std = std.data().view().insert_axis(NdAxis(index));
        let data = (group.data() - &mean) / &std;
        Ok(group.derive(data, group.axes().to_vec()))
    }
}

/// A named caller-supplied reduction
pub struct ReduceFn<F> {
    name: String,
    f: F,
}

impl<F> ReduceFn<F>
where
    F: Fn(&LabeledArray, &str) -> Result<LabeledArray> + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ReductionOp for ReduceFn<F>
where
    F: Fn(&LabeledArray, &str) -> Result<LabeledArray> + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn reduce(&self, group: &LabeledArray, axis: &str) -> Result<LabeledArray> {
        (self.f)(group, axis)
    }
}

/// A named caller-supplied transform
pub struct TransformFn<F> {
    name: String,
    f: F,
}

impl<F> TransformFn<F>
where
    F: Fn(&LabeledArray, &str) -> Result<LabeledArray> + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> TransformOp for TransformFn<F>
where
    F: Fn(&LabeledArray, &str) -> Result<LabeledArray> + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, group: &LabeledArray, axis: &str) -> Result<LabeledArray> {
        (self.f)(group, axis)
    }
}

/// Apply `op` to every group sequentially and combine the results
pub fn apply(view: &GroupbyView<'_>, op: GroupOp<'_>) -> Result<LabeledArray> {
    apply_with(view, op, &ExecutionOptions::sequential())
}

/// Apply `op` to every group under the given execution options
pub fn apply_with(
    view: &GroupbyView<'_>,
    op: GroupOp<'_>,
    execution: &ExecutionOptions,
) -> Result<LabeledArray> {
    match op {
        GroupOp::Reduce(reduction) => combine_reduction(view, reduction, execution),
        GroupOp::Transform(transform) => combine_transform(view, transform, execution),
    }
}

fn combine_reduction(
    view: &GroupbyView<'_>,
    op: &dyn ReductionOp,
    execution: &ExecutionOptions,
) -> Result<LabeledArray> {
    if view.is_empty() {
        return Err(AnalysisError::EmptyGroupResult(view.axis().to_string()));
    }

    let source = view.source();
    let axis = view.axis();
    let index = view.axis_index();

    let mut expected_axes: Vec<Axis> = source.axes().to_vec();
    expected_axes.remove(index);
    if expected_axes.iter().any(|a| a.name() == view.group_dim()) {
        return Err(AnalysisError::ShapeMismatch(format!(
            "group dimension {} collides with an existing axis of {}",
            view.group_dim(),
            source.name()
        )));
    }

    let results = map_ordered(view.groups(), execution, |(key, positions)| {
        let group = source.isel(axis, positions)?;
        let reduced = op.reduce(&group, axis)?;
        let shape_ok = reduced.ndim() == expected_axes.len()
            && reduced
                .axes()
                .iter()
                .zip(&expected_axes)
                .all(|(got, want)| got.name() == want.name() && got.len() == want.len());
        if !shape_ok {
            return Err(AnalysisError::ShapeMismatch(format!(
                "reduction {} returned dims {:?}{:?} for group {}, expected the group without axis {}",
                op.name(),
                reduced.dims(),
                reduced.shape(),
                key,
                axis
            )));
        }
        Ok(reduced.into_data())
    })?;

    let views: Vec<ArrayViewD<'_, f64>> = results.iter().map(|r| r.view()).collect();
    let data = ndarray::stack(NdAxis(index), &views)?;

    let group_axis = Axis::new(
        view.group_dim(),
        view.groups().iter().map(|(k, _)| k.to_coord()).collect(),
    );
    let mut axes = expected_axes;
    axes.insert(index, group_axis);

    log::info!(
        "Reduced {} over {} groups of {} with {}",
        source.name(),
        view.len(),
        view.group_dim(),
        op.name()
    );
    Ok(source.derive(data, axes).with_attr("groupby_op", op.name()))
}

fn combine_transform(
    view: &GroupbyView<'_>,
    op: &dyn TransformOp,
    execution: &ExecutionOptions,
) -> Result<LabeledArray> {
    let source = view.source();
    let axis = view.axis();
    let index = view.axis_index();

    let results = map_ordered(view.groups(), execution, |(key, positions)| {
        let group = source.isel(axis, positions)?;
        let transformed = op.transform(&group, axis)?;
        if transformed.dims() != group.dims() || transformed.shape() != group.shape() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "transform {} returned dims {:?}{:?} for group {}, expected {:?}{:?}",
                op.name(),
                transformed.dims(),
                transformed.shape(),
                key,
                group.dims(),
                group.shape()
            )));
        }
        Ok(transformed.into_data())
    })?;

    let axis_len = source.shape()[index];
    let mut out = ArrayD::<f64>::from_elem(source.data().raw_dim(), f64::NAN);
    let mut writes = vec![0usize; axis_len];

    for ((_, positions), result) in view.groups().iter().zip(&results) {
        for (j, &position) in positions.iter().enumerate() {
            out.index_axis_mut(NdAxis(index), position)
                .assign(&result.index_axis(NdAxis(index), j));
            writes[position] += 1;
        }
    }

    for (position, count) in writes.iter().enumerate() {
        let reachable = view.key_at(position).is_some();
        if reachable && *count != 1 {
            return Err(AnalysisError::IncompleteCoverage(format!(
                "position {} along {} written {} times",
                position, axis, count
            )));
        }
        if !reachable && *count != 0 {
            return Err(AnalysisError::IncompleteCoverage(format!(
                "sentinel position {} along {} was written",
                position, axis
            )));
        }
    }

    log::info!(
        "Transformed {} over {} groups of {} with {}",
        source.name(),
        view.len(),
        view.group_dim(),
        op.name()
    );
    Ok(source
        .derive(out, source.axes().to_vec())
        .with_attr("groupby_op", op.name()))
}
