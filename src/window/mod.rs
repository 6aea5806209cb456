//! Window operations: rolling windows, calendar resampling and block coarsening
//!
//! Resample and coarsen are groupings with derived keys and reuse the
//! grouping engine; rolling windows overlap and are computed directly.

pub mod coarsen;
pub mod resample;
pub mod rolling;

pub use coarsen::{Boundary, Coarsen};
pub use resample::{Frequency, Resample};
pub use rolling::Rolling;
