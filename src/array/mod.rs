//! Labeled n-dimensional arrays: axes with coordinates, selection and reductions

pub mod aggregate;
pub mod axis;
pub mod labeled;

pub use aggregate::Aggregation;
pub use axis::{Axis, Coord};
pub use labeled::LabeledArray;
