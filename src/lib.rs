pub mod array;
pub mod config;
pub mod data_io;
pub mod errors;
pub mod groupby;
pub mod math;
pub mod parallel;
pub mod time_utils;
pub mod window;

pub use array::{Aggregation, Axis, Coord, LabeledArray};
pub use errors::{AnalysisError, Result};
pub use groupby::{partition, partition_by_calendar, GroupKey, GroupKeyVector, GroupbyView};
