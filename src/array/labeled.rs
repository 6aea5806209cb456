use super::aggregate::Aggregation;
use super::axis::{Axis, Coord};
use crate::errors::{AnalysisError, Result};
use ndarray::{ArrayD, ArrayViewD, Axis as NdAxis, IxDyn, Zip};
use std::collections::BTreeMap;

/// An n-dimensional array of f64 with named axes and per-axis coordinates
///
/// Missing values are stored as NaN. Invariant: the array rank equals the
/// number of axes and every axis holds exactly as many coordinates as the
/// array extent along it.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArray {
    name: String,
    data: ArrayD<f64>,
    axes: Vec<Axis>,
    attrs: BTreeMap<String, String>,
}

impl LabeledArray {
    pub fn new(name: impl Into<String>, data: ArrayD<f64>, axes: Vec<Axis>) -> Result<Self> {
        if data.ndim() != axes.len() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "array has rank {} but {} axes were given",
                data.ndim(),
                axes.len()
            )));
        }

        for (extent, axis) in data.shape().iter().zip(&axes) {
            if *extent != axis.len() {
                return Err(AnalysisError::ShapeMismatch(format!(
                    "axis {} has {} coordinates but the array extent is {}",
                    axis.name(),
                    axis.len(),
                    extent
                )));
            }
        }

        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].iter().any(|other| other.name() == axis.name()) {
                return Err(AnalysisError::ShapeMismatch(format!(
                    "duplicate axis name {}",
                    axis.name()
                )));
            }
        }

        Ok(Self {
            name: name.into(),
            data,
            axes,
            attrs: BTreeMap::new(),
        })
    }

    /// One-dimensional array along `axis`
    pub fn from_1d(name: impl Into<String>, values: Vec<f64>, axis: Axis) -> Result<Self> {
        let data = ArrayD::from_shape_vec(IxDyn(&[values.len()]), values)?;
        Self::new(name, data, vec![axis])
    }

    /// Build from row-major values and axes, deriving the shape from the axes
    pub fn from_shape_vec(
        name: impl Into<String>,
        values: Vec<f64>,
        axes: Vec<Axis>,
    ) -> Result<Self> {
        let shape: Vec<usize> = axes.iter().map(Axis::len).collect();
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
        Self::new(name, data, axes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    pub fn dims(&self) -> Vec<&str> {
        self.axes.iter().map(Axis::name).collect()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn has_axis(&self, name: &str) -> bool {
        self.axes.iter().any(|a| a.name() == name)
    }

    pub fn axis_index(&self, name: &str) -> Result<usize> {
        self.axes
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| AnalysisError::UnknownAxis(name.to_string()))
    }

    pub fn axis(&self, name: &str) -> Result<&Axis> {
        Ok(&self.axes[self.axis_index(name)?])
    }

    /// Extent of the array along a named axis
    pub fn len_of(&self, name: &str) -> Result<usize> {
        Ok(self.axis(name)?.len())
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Positional selection along an axis; positions may repeat or be reordered
    pub fn isel(&self, axis: &str, positions: &[usize]) -> Result<LabeledArray> {
        let index = self.axis_index(axis)?;
        let new_axis = self.axes[index].select(positions)?;
        let data = self.data.select(NdAxis(index), positions);

        let mut axes = self.axes.clone();
        axes[index] = new_axis;
        Ok(self.derive(data, axes))
    }

    /// Label selection of a single coordinate; the axis is dropped
    pub fn sel(&self, axis: &str, coord: &Coord) -> Result<LabeledArray> {
        let position = self.axis(axis)?.position(coord).ok_or_else(|| {
            AnalysisError::KeyMismatch(format!("coordinate {} not found on axis {}", coord, axis))
        })?;
        self.index_axis(axis, position)
    }

    /// The sub-array at `position` along `axis`, with that axis removed
    pub fn index_axis(&self, axis: &str, position: usize) -> Result<LabeledArray> {
        let index = self.axis_index(axis)?;
        if position >= self.shape()[index] {
            return Err(AnalysisError::ShapeMismatch(format!(
                "position {} out of bounds for axis {} of length {}",
                position,
                axis,
                self.shape()[index]
            )));
        }
        let data = self.data.index_axis(NdAxis(index), position).to_owned();
        let mut axes = self.axes.clone();
        axes.remove(index);
        Ok(self.derive(data, axes))
    }

    /// Skip-missing reduction along one axis; the axis is removed
    pub fn reduce(&self, axis: &str, aggregation: Aggregation) -> Result<LabeledArray> {
        let index = self.axis_index(axis)?;
        let data = self
            .data
            .map_axis(NdAxis(index), |lane| aggregation.aggregate(lane.iter().copied()));
        let mut axes = self.axes.clone();
        axes.remove(index);
        Ok(self.derive(data, axes))
    }

    /// Skip-missing reduction over every element
    pub fn reduce_all(&self, aggregation: Aggregation) -> f64 {
        aggregation.aggregate(self.data.iter().copied())
    }

    /// Elementwise map, keeping axes
    pub fn map<F>(&self, f: F) -> LabeledArray
    where
        F: Fn(f64) -> f64,
    {
        self.derive(self.data.mapv(f), self.axes.clone())
    }

    /// Elementwise combination with an array of identical dims and shape
    pub fn zip_with<F>(&self, other: &LabeledArray, f: F) -> Result<LabeledArray>
    where
        F: Fn(f64, f64) -> f64 + Sync + Send,
    {
        if self.dims() != other.dims() || self.shape() != other.shape() {
            return Err(AnalysisError::ShapeMismatch(format!(
                "cannot combine {:?}{:?} with {:?}{:?}",
                self.dims(),
                self.shape(),
                other.dims(),
                other.shape()
            )));
        }

        let mut out = ArrayD::<f64>::zeros(self.data.raw_dim());
        Zip::from(&mut out)
            .and(&self.data)
            .and(&other.data)
            .par_for_each(|o, &a, &b| *o = f(a, b));

        Ok(self.derive(out, self.axes.clone()))
    }

    /// Replace the axis at the position of `name` with `axis` (same length required)
    pub fn replace_axis(&self, name: &str, axis: Axis) -> Result<LabeledArray> {
        let index = self.axis_index(name)?;
        if axis.len() != self.shape()[index] {
            return Err(AnalysisError::ShapeMismatch(format!(
                "replacement axis {} has {} coordinates, expected {}",
                axis.name(),
                axis.len(),
                self.shape()[index]
            )));
        }
        let mut axes = self.axes.clone();
        axes[index] = axis;
        LabeledArray::new(self.name.clone(), self.data.clone(), axes)
            .map(|a| a.with_attrs(self.attrs.clone()))
    }

    pub fn rename_axis(&self, from: &str, to: &str) -> Result<LabeledArray> {
        let renamed = self.axis(from)?.renamed(to);
        self.replace_axis(from, renamed)
    }

    pub fn view(&self) -> ArrayViewD<'_, f64> {
        self.data.view()
    }

    /// Same name and attributes over new data and axes
    pub(crate) fn derive(&self, data: ArrayD<f64>, axes: Vec<Axis>) -> LabeledArray {
        LabeledArray {
            name: self.name.clone(),
            data,
            axes,
            attrs: self.attrs.clone(),
        }
    }

    fn with_attrs(mut self, attrs: BTreeMap<String, String>) -> Self {
        self.attrs = attrs;
        self
    }
}
