use crate::array::{Aggregation, Axis, Coord, LabeledArray};
use crate::errors::{AnalysisError, Result};
use crate::groupby::{GroupKey, GroupKeyVector, GroupbyView};
use crate::parallel::ExecutionOptions;
use ndarray::{ArrayD, Axis as NdAxis, IxDyn};
use std::fmt;
use std::str::FromStr;

/// What to do with a trailing partial block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Require the axis length to be a multiple of the window
    Exact,
    /// Drop the trailing partial block
    Trim,
    /// Keep the trailing partial block, padded with NaN
    Pad,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Exact => write!(f, "exact"),
            Boundary::Trim => write!(f, "trim"),
            Boundary::Pad => write!(f, "pad"),
        }
    }
}

impl FromStr for Boundary {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Boundary::Exact),
            "trim" => Ok(Boundary::Trim),
            "pad" => Ok(Boundary::Pad),
            _ => Err(AnalysisError::Parse(format!("Unknown boundary policy: {}", s))),
        }
    }
}

/// Contiguous blocks of `window` positions along one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coarsen {
    window: usize,
    boundary: Boundary,
    execution: ExecutionOptions,
}

impl Coarsen {
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(AnalysisError::InvalidWindow(
                "coarsen window must hold at least one position".to_string(),
            ));
        }
        Ok(Self {
            window,
            boundary: Boundary::Exact,
            execution: ExecutionOptions::default(),
        })
    }

    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionOptions) -> Self {
        self.execution = execution;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of blocks produced for an axis of length `len`
    ///
    /// A window longer than the axis is an `InvalidWindow` under every policy.
    pub fn block_count(&self, len: usize) -> Result<usize> {
        if self.window > len {
            return Err(AnalysisError::InvalidWindow(format!(
                "coarsen window {} is longer than the axis ({} positions)",
                self.window, len
            )));
        }
        let remainder = len % self.window;
        match self.boundary {
            Boundary::Exact if remainder != 0 => Err(AnalysisError::ShapeMismatch(format!(
                "axis length {} is not a multiple of the coarsen window {}",
                len, self.window
            ))),
            Boundary::Exact | Boundary::Trim => Ok(len / self.window),
            Boundary::Pad => Ok(len.div_ceil(self.window)),
        }
    }

    /// Block index of every position; trimmed positions are sentinels
    pub fn keys(&self, axis: &Axis) -> Result<GroupKeyVector> {
        let blocks = self.block_count(axis.len())?;
        let keys = (0..axis.len())
            .map(|p| {
                let block = p / self.window;
                (block < blocks).then_some(GroupKey::Int(block as i64))
            })
            .collect();
        Ok(GroupKeyVector::new(axis.name(), keys))
    }

    /// Coordinates of the coarsened axis
    ///
    /// Numeric coordinates average over the block's real positions; other
    /// coordinates take the block's first value.
    pub fn block_axis(&self, axis: &Axis) -> Result<Axis> {
        let blocks = self.block_count(axis.len())?;
        let coords = (0..blocks)
            .map(|b| {
                let start = b * self.window;
                let end = (start + self.window).min(axis.len());
                let members = &axis.coords()[start..end];
                let numeric = members
                    .iter()
                    .all(|c| matches!(c, Coord::Int(_) | Coord::Float(_)));
                if numeric {
                    let values: Vec<f64> = members.iter().filter_map(Coord::as_f64).collect();
                    Coord::Float(Aggregation::Mean.aggregate(values))
                } else {
                    members[0].clone()
                }
            })
            .collect();
        Ok(Axis::new(axis.name(), coords))
    }

    pub fn view<'a>(&self, array: &'a LabeledArray, axis: &str) -> Result<GroupbyView<'a>> {
        let keys = self.keys(array.axis(axis)?)?;
        Ok(GroupbyView::partition(array, axis, keys)?.with_execution(self.execution))
    }

    /// Reduce every block; the coarsened axis keeps the name `axis`
    pub fn reduce(
        &self,
        array: &LabeledArray,
        axis: &str,
        aggregation: Aggregation,
    ) -> Result<LabeledArray> {
        let block_axis = self.block_axis(array.axis(axis)?)?;
        let reduced = self.view(array, axis)?.reduce(aggregation)?;
        log::debug!(
            "Coarsened {} along {} into {} blocks of {} ({})",
            array.name(),
            axis,
            block_axis.len(),
            self.window,
            self.boundary
        );
        reduced.replace_axis(axis, block_axis)
    }

    /// Split `axis` into `(axis, window_dim)` of shape `(blocks, window)`
    ///
    /// With `Boundary::Pad` the tail of the last block is NaN.
    pub fn construct(
        &self,
        array: &LabeledArray,
        axis: &str,
        window_dim: &str,
    ) -> Result<LabeledArray> {
        let index = array.axis_index(axis)?;
        let len = array.shape()[index];
        let block_axis = self.block_axis(array.axis(axis)?)?;
        let blocks = block_axis.len();

        let mut shape = array.shape().to_vec();
        shape[index] = blocks;
        shape.insert(index + 1, self.window);
        let mut out = ArrayD::<f64>::from_elem(IxDyn(&shape), f64::NAN);

        for b in 0..blocks {
            let mut block = out.index_axis_mut(NdAxis(index), b);
            for j in 0..self.window {
                let p = b * self.window + j;
                if p < len {
                    block
                        .index_axis_mut(NdAxis(index), j)
                        .assign(&array.data().index_axis(NdAxis(index), p));
                }
            }
        }

        let mut axes = array.axes().to_vec();
        axes[index] = block_axis;
        axes.insert(index + 1, Axis::range(window_dim, self.window));
        LabeledArray::new(array.name(), out, axes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_count_policies() {
        let exact = Coarsen::new(12).unwrap();
        assert!(matches!(
            exact.block_count(13),
            Err(AnalysisError::ShapeMismatch(_))
        ));
        assert_eq!(exact.block_count(24).unwrap(), 2);
        assert_eq!(exact.boundary(Boundary::Trim).block_count(13).unwrap(), 1);
        assert_eq!(exact.boundary(Boundary::Pad).block_count(13).unwrap(), 2);
    }

    #[test]
    fn test_window_longer_than_axis() {
        for boundary in [Boundary::Exact, Boundary::Trim, Boundary::Pad] {
            let coarse = Coarsen::new(6).unwrap().boundary(boundary);
            assert!(matches!(
                coarse.block_count(5),
                Err(AnalysisError::InvalidWindow(_))
            ));
        }
        assert_eq!(Coarsen::new(5).unwrap().block_count(5).unwrap(), 1);
    }

    #[test]
    fn test_block_axis_coordinates() {
        let axis = Axis::from_floats("lat", vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let coarse = Coarsen::new(2).unwrap().boundary(Boundary::Pad);
        let blocks = coarse.block_axis(&axis).unwrap();
        assert_eq!(
            blocks.coords(),
            &[Coord::Float(0.5), Coord::Float(2.5), Coord::Float(4.0)]
        );

        let labels = Axis::from_labels("site", vec!["a", "b", "c", "d"]);
        let blocks = Coarsen::new(2).unwrap().block_axis(&labels).unwrap();
        assert_eq!(
            blocks.coords(),
            &[Coord::Label("a".into()), Coord::Label("c".into())]
        );
    }

    #[test]
    fn test_trim_excludes_tail() {
        let array = LabeledArray::from_1d(
            "x",
            vec![1.0, 2.0, 3.0, 4.0, 100.0],
            Axis::range("time", 5),
        )
        .unwrap();
        let out = Coarsen::new(2)
            .unwrap()
            .boundary(Boundary::Trim)
            .reduce(&array, "time", Aggregation::Sum)
            .unwrap();
        assert_eq!(out.data().as_slice().unwrap(), &[3.0, 7.0]);
        assert_eq!(out.dims(), vec!["time"]);
    }
}
