use crate::array::{Aggregation, Axis, LabeledArray};
use crate::errors::{AnalysisError, Result};
use ndarray::{ArrayD, Axis as NdAxis, IxDyn, Zip};

/// Moving window of fixed length along one axis
///
/// The window for position `i` spans `[i - w + 1, i]`, or when centred
/// `[i - w + 1 + o, i + o]` with `o = (w - 1) / 2`. A position whose window
/// holds fewer than `min_periods` valid (in-bounds, non-NaN) values is NaN;
/// by default `min_periods` equals the window length, so incomplete windows
/// at the edges produce NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rolling {
    window: usize,
    center: bool,
    min_periods: Option<usize>,
}

impl Rolling {
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(AnalysisError::InvalidWindow(
                "rolling window must hold at least one position".to_string(),
            ));
        }
        Ok(Self {
            window,
            center: false,
            min_periods: None,
        })
    }

    pub fn center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    pub fn min_periods(mut self, min_periods: usize) -> Result<Self> {
        if min_periods == 0 || min_periods > self.window {
            return Err(AnalysisError::InvalidWindow(format!(
                "min_periods must be in 1..={}, got {}",
                self.window, min_periods
            )));
        }
        self.min_periods = Some(min_periods);
        Ok(self)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    fn check_len(&self, axis: &str, len: usize) -> Result<()> {
        if self.window > len {
            return Err(AnalysisError::InvalidWindow(format!(
                "rolling window {} is longer than axis {} ({} positions)",
                self.window, axis, len
            )));
        }
        Ok(())
    }

    /// First position (possibly negative) of the window ending around `i`
    fn start(&self, i: usize) -> isize {
        let offset = if self.center { (self.window - 1) / 2 } else { 0 };
        i as isize + offset as isize - (self.window as isize - 1)
    }

    /// Aggregate each window; the array keeps its layout
    pub fn reduce(
        &self,
        array: &LabeledArray,
        axis: &str,
        aggregation: Aggregation,
    ) -> Result<LabeledArray> {
        let index = array.axis_index(axis)?;
        let len = array.shape()[index];
        self.check_len(axis, len)?;
        let required = self.min_periods.unwrap_or(self.window);

        let mut out = ArrayD::<f64>::from_elem(array.data().raw_dim(), f64::NAN);
        Zip::from(out.lanes_mut(NdAxis(index)))
            .and(array.data().lanes(NdAxis(index)))
            .for_each(|mut target, lane| {
                for i in 0..len {
                    let start = self.start(i);
                    let valid: Vec<f64> = (start..start + self.window as isize)
                        .filter(|&p| p >= 0 && (p as usize) < len)
                        .map(|p| lane[p as usize])
                        .filter(|v| !v.is_nan())
                        .collect();
                    if valid.len() >= required {
                        target[i] = aggregation.aggregate(valid);
                    }
                }
            });

        log::debug!(
            "Rolling {} over {} (window {}, center {})",
            aggregation,
            axis,
            self.window,
            self.center
        );
        Ok(array
            .derive(out, array.axes().to_vec())
            .with_attr("rolling", format!("{}:{}", aggregation, self.window)))
    }

    /// Materialise every window as a new trailing axis `window_dim`
    ///
    /// Out-of-bounds window slots are NaN.
    pub fn construct(
        &self,
        array: &LabeledArray,
        axis: &str,
        window_dim: &str,
    ) -> Result<LabeledArray> {
        let index = array.axis_index(axis)?;
        let len = array.shape()[index];
        self.check_len(axis, len)?;

        let mut shape = array.shape().to_vec();
        shape.push(self.window);
        let mut out = ArrayD::<f64>::from_elem(IxDyn(&shape), f64::NAN);
        let window_axis = NdAxis(shape.len() - 1);

        for k in 0..self.window {
            let mut slab = out.index_axis_mut(window_axis, k);
            for i in 0..len {
                let p = self.start(i) + k as isize;
                if p >= 0 && (p as usize) < len {
                    slab.index_axis_mut(NdAxis(index), i)
                        .assign(&array.data().index_axis(NdAxis(index), p as usize));
                }
            }
        }

        let mut axes = array.axes().to_vec();
        axes.push(Axis::range(window_dim, self.window));
        LabeledArray::new(array.name(), out, axes)
    }
}
