use crate::array::{Aggregation, Axis, LabeledArray};
use crate::errors::{AnalysisError, Result};
use crate::groupby::{GroupKey, GroupKeyVector, GroupbyView};
use crate::parallel::ExecutionOptions;
use crate::time_utils::{
    add_months, format_timestamp, from_julian_day, julian_day, months_between, parse_timestamp,
};
use chrono::{Duration, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// Fixed-duration calendar bucket size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Years(u32),
    Months(u32),
    Days(u32),
    Hours(u32),
}

impl Frequency {
    /// Start of the bucket holding `timestamp`, for buckets anchored at `origin`
    ///
    /// Year and month buckets start on the first of a month; day buckets at
    /// midnight; hour buckets on whole multiples of the step from `origin`.
    pub fn bucket_start(
        self,
        origin: &NaiveDateTime,
        timestamp: &NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        match self {
            Frequency::Years(n) => {
                Frequency::Months(n.checked_mul(12)?).bucket_start(origin, timestamp)
            }
            Frequency::Months(n) => {
                let step = n as i64;
                let bucket = months_between(origin, timestamp).div_euclid(step);
                add_months(origin, bucket.checked_mul(step)?)
            }
            Frequency::Days(n) => {
                let step = n as i64;
                let anchor = julian_day(origin);
                let bucket = (julian_day(timestamp) - anchor).div_euclid(step);
                from_julian_day(anchor.checked_add(bucket.checked_mul(step)?)?)
            }
            Frequency::Hours(n) => {
                let step = n as i64 * 3600;
                let bucket = (*timestamp - *origin).num_seconds().div_euclid(step);
                let offset = Duration::try_seconds(bucket.checked_mul(step)?)?;
                origin.checked_add_signed(offset)
            }
        }
    }

    fn step(self) -> u32 {
        match self {
            Frequency::Years(n) | Frequency::Months(n) | Frequency::Days(n) | Frequency::Hours(n) => n,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Years(n) => write!(f, "{}Y", n),
            Frequency::Months(n) => write!(f, "{}M", n),
            Frequency::Days(n) => write!(f, "{}D", n),
            Frequency::Hours(n) => write!(f, "{}H", n),
        }
    }
}

impl FromStr for Frequency {
    type Err = AnalysisError;

    /// Accepts an optional count followed by a unit: `Y`/`YS`/`A`/`AS`,
    /// `M`/`MS`, `D` or `H`, e.g. `5Y`, `MS`, `10D`, `6H`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (count, unit) = s.split_at(split);

        let n: u32 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| AnalysisError::Parse(format!("Invalid frequency count: {}", s)))?
        };
        if n == 0 {
            return Err(AnalysisError::InvalidWindow(format!(
                "frequency count must be positive: {}",
                s
            )));
        }

        match unit.to_uppercase().as_str() {
            "Y" | "YS" | "A" | "AS" if n.checked_mul(12).is_none() => Err(
                AnalysisError::InvalidWindow(format!("frequency {} overflows a month count", s)),
            ),
            "Y" | "YS" | "A" | "AS" => Ok(Frequency::Years(n)),
            "M" | "MS" => Ok(Frequency::Months(n)),
            "D" => Ok(Frequency::Days(n)),
            "H" => Ok(Frequency::Hours(n)),
            _ => Err(AnalysisError::Parse(format!("Unknown frequency: {}", s))),
        }
    }
}

/// Calendar resampling of a temporal axis
///
/// Buckets are anchored at `origin`; only buckets that contain at least one
/// timestamp appear in the result, labelled by their start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resample {
    freq: Frequency,
    origin: NaiveDateTime,
    execution: ExecutionOptions,
}

impl Resample {
    pub fn new(freq: Frequency) -> Result<Self> {
        if freq.step() == 0 {
            return Err(AnalysisError::InvalidWindow(format!(
                "frequency {} has a zero step",
                freq
            )));
        }
        if let Frequency::Years(n) = freq {
            if n.checked_mul(12).is_none() {
                return Err(AnalysisError::InvalidWindow(format!(
                    "frequency {} overflows a month count",
                    freq
                )));
            }
        }
        Ok(Self {
            freq,
            origin: default_origin()?,
            execution: ExecutionOptions::default(),
        })
    }

    pub fn with_execution(mut self, execution: ExecutionOptions) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_origin(mut self, origin: NaiveDateTime) -> Self {
        self.origin = origin;
        self
    }

    pub fn freq(&self) -> Frequency {
        self.freq
    }

    pub fn origin(&self) -> &NaiveDateTime {
        &self.origin
    }

    /// Bucket-start keys for every timestamp of `axis`
    ///
    /// A bucket start outside the representable calendar is an `InvalidWindow`.
    pub fn keys(&self, axis: &Axis) -> Result<GroupKeyVector> {
        let keys = axis
            .times()?
            .iter()
            .map(|t| {
                self.freq
                    .bucket_start(&self.origin, t)
                    .map(|start| Some(GroupKey::Time(start)))
                    .ok_or_else(|| {
                        AnalysisError::InvalidWindow(format!(
                            "no {} bucket from {} holds {}",
                            self.freq,
                            format_timestamp(&self.origin),
                            format_timestamp(t)
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(GroupKeyVector::new(axis.name(), keys))
    }

    pub fn view<'a>(&self, array: &'a LabeledArray, axis: &str) -> Result<GroupbyView<'a>> {
        let keys = self.keys(array.axis(axis)?)?;
        Ok(GroupbyView::partition(array, axis, keys)?.with_execution(self.execution))
    }

    /// Reduce each bucket; the result axis keeps the name `axis`
    pub fn reduce(
        &self,
        array: &LabeledArray,
        axis: &str,
        aggregation: Aggregation,
    ) -> Result<LabeledArray> {
        let reduced = self.view(array, axis)?.reduce(aggregation)?;
        log::info!(
            "Resampled {} along {} to {} buckets of {}",
            array.name(),
            axis,
            reduced.len_of(axis)?,
            self.freq
        );
        Ok(reduced.with_attr("resample", self.freq.to_string()))
    }
}

fn default_origin() -> Result<NaiveDateTime> {
    parse_timestamp("1970-01-01")
}
