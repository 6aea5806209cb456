//! Built-in demonstration dataset

use super::Dataset;
use crate::array::{Axis, LabeledArray};
use crate::errors::{AnalysisError, Result};
use crate::time_utils::add_months;
use chrono::NaiveDate;
use std::f64::consts::PI;

/// Latitudes of the sample grid (degrees north)
pub const SAMPLE_LATITUDES: [f64; 6] = [-50.0, -30.0, -10.0, 10.0, 30.0, 50.0];

/// Warming trend applied to every grid cell (K per year)
pub const SAMPLE_TREND: f64 = 0.02;

/// Deterministic monthly sea-surface temperature on a `(time, lat)` grid
///
/// Each cell follows `base(lat) + amplitude(lat) * cos(phase) + trend`, where
/// the seasonal cycle peaks in February south of the equator and in August
/// north of it. One value (third month, equatorial band) is missing. The
/// dataset also carries `basin`, an integer ocean-basin label along `lat`.
pub fn monthly_sst(start_year: i32, years: usize) -> Result<Dataset> {
    let origin = NaiveDate::from_ymd_opt(start_year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| AnalysisError::Config(format!("invalid start year {}", start_year)))?;

    let months = years * 12;
    let times = (0..months as i64)
        .map(|m| {
            add_months(&origin, m)
                .ok_or_else(|| AnalysisError::Config(format!("month {} out of range", m)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut values = Vec::with_capacity(months * SAMPLE_LATITUDES.len());
    for m in 0..months {
        let month_of_year = (m % 12) as f64;
        let elapsed_years = m as f64 / 12.0;
        for (j, lat) in SAMPLE_LATITUDES.iter().enumerate() {
            if m == 2 && j == 2 {
                values.push(f64::NAN);
                continue;
            }
            let base = 28.0 - 0.3 * lat.abs();
            let amplitude = 0.08 * lat.abs();
            let peak = if *lat < 0.0 { 1.0 } else { 7.0 };
            let seasonal = amplitude * (2.0 * PI * (month_of_year - peak) / 12.0).cos();
            values.push(base + seasonal + SAMPLE_TREND * elapsed_years);
        }
    }

    let lat_axis = Axis::from_floats("lat", SAMPLE_LATITUDES);
    let sst = LabeledArray::from_shape_vec(
        "sst",
        values,
        vec![Axis::from_times("time", times), lat_axis.clone()],
    )?
    .with_attr("units", "degC")
    .with_attr("long_name", "sea surface temperature");

    let basin = LabeledArray::from_1d("basin", vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0], lat_axis)?
        .with_attr("long_name", "ocean basin index");

    let mut dataset = Dataset::new("sample_sst");
    dataset.insert(sst);
    dataset.insert(basin);
    dataset
        .attrs
        .insert("source".to_string(), "synthetic".to_string());
    log::debug!("Built sample dataset with {} months from {}", months, start_year);
    Ok(dataset)
}
