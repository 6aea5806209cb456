//! Label-aware split/apply/combine
//!
//! [`partition`] builds a [`GroupbyView`] from a source array, an axis and a
//! [`GroupKeyVector`]. The view feeds [`apply`] (reductions and transforms)
//! and [`broadcast_binary`] (groupby arithmetic such as anomaly removal).

pub mod apply;
pub mod arithmetic;
pub mod calendar;
pub mod keys;
pub mod view;

pub use apply::{
    apply, apply_with, Demean, GroupOp, ReduceFn, ReductionOp, Standardize, TransformFn,
    TransformOp,
};
pub use arithmetic::{broadcast_binary, BinaryOp};
pub use calendar::CalendarField;
pub use keys::{Alignment, GroupKey, GroupKeyVector};
pub use view::GroupbyView;

use crate::array::LabeledArray;
use crate::errors::Result;

/// Partition `source` along `axis` into groups keyed by `keys`
pub fn partition<'a>(
    source: &'a LabeledArray,
    axis: &str,
    keys: GroupKeyVector,
) -> Result<GroupbyView<'a>> {
    GroupbyView::partition(source, axis, keys)
}

/// Partition a temporal axis by a calendar field of its timestamps
pub fn partition_by_calendar<'a>(
    source: &'a LabeledArray,
    axis: &str,
    field: CalendarField,
) -> Result<GroupbyView<'a>> {
    let keys = GroupKeyVector::from_calendar(source.axis(axis)?, field)?;
    GroupbyView::partition(source, axis, keys)
}
