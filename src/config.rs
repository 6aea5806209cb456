use crate::array::Aggregation;
use crate::data_io::reader::DEFAULT_MISSING_VALUE;
use crate::data_io::OutputFormat;
use crate::errors::{AnalysisError, Result};
use crate::groupby::CalendarField;
use crate::parallel::ExecutionOptions;
use crate::time_utils::parse_timestamp;
use crate::window::{Boundary, Frequency};
use chrono::NaiveDateTime;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

/// Per-subcommand analysis parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Reduce every calendar group (e.g. the monthly climatology)
    Climatology {
        field: CalendarField,
        aggregation: Aggregation,
    },
    /// Subtract the calendar-group mean, optionally dividing by the group std
    Anomaly {
        field: CalendarField,
        standardize: bool,
    },
    Resample {
        freq: Frequency,
        aggregation: Aggregation,
        origin: Option<NaiveDateTime>,
    },
    Rolling {
        window: usize,
        center: bool,
        min_periods: Option<usize>,
        aggregation: Aggregation,
    },
    Coarsen {
        window: usize,
        boundary: Boundary,
        aggregation: Aggregation,
    },
    /// Reduce over right-closed bins of the axis coordinate
    Bins {
        edges: Vec<f64>,
        aggregation: Aggregation,
    },
    /// Run every analysis over the built-in sample dataset
    Demo { start_year: i32, years: usize },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Climatology { .. } => "climatology",
            Operation::Anomaly { .. } => "anomaly",
            Operation::Resample { .. } => "resample",
            Operation::Rolling { .. } => "rolling",
            Operation::Coarsen { .. } => "coarsen",
            Operation::Bins { .. } => "bins",
            Operation::Demo { .. } => "demo",
        }
    }
}

/// Command line configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Delimited text input; not used by `demo`
    pub input_path: Option<PathBuf>,
    /// Variable to analyse; may be omitted when the input holds exactly one
    pub variable: Option<String>,
    /// Axis the analysis runs along
    pub axis: String,
    /// Output file; standard output when absent
    pub output_path: Option<PathBuf>,
    pub output_format: OutputFormat,
    pub missing_value: f64,
    pub execution: ExecutionOptions,
    pub verbose: bool,
    pub operation: Operation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: None,
            variable: None,
            axis: "time".to_string(),
            output_path: None,
            output_format: OutputFormat::Csv,
            missing_value: DEFAULT_MISSING_VALUE,
            execution: ExecutionOptions::parallel(),
            verbose: false,
            operation: Operation::Demo {
                start_year: 2000,
                years: 3,
            },
        }
    }
}

fn aggregation_arg() -> Arg {
    Arg::new("agg")
        .long("agg")
        .value_name("AGGREGATION")
        .help("Aggregation: mean, sum, min, max, std, var, count, median, first, last")
        .default_value("mean")
}

fn window_arg(help: &'static str) -> Arg {
    Arg::new("window")
        .short('w')
        .long("window")
        .value_name("N")
        .help(help)
        .required(true)
}

fn field_arg() -> Arg {
    Arg::new("field")
        .short('g')
        .long("group")
        .value_name("FIELD")
        .help("Calendar field to group by (e.g. month, season, time.dayofyear)")
        .default_value("month")
}

/// Build the command line interface
pub fn build_cli() -> Command {
    Command::new("climgroup")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Label-aware grouping, resampling and window analysis of labeled arrays")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("PATH")
                .help("Delimited text input: header row, coordinate column, variable columns")
                .global(true),
        )
        .arg(
            Arg::new("variable")
                .short('v')
                .long("variable")
                .value_name("NAME")
                .help("Variable to analyse")
                .global(true),
        )
        .arg(
            Arg::new("axis")
                .short('a')
                .long("axis")
                .value_name("NAME")
                .help("Axis to group or window along")
                .default_value("time")
                .global(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .help("Output file (standard output when omitted)")
                .global(true),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .help("Output format; detected from the output extension when omitted")
                .value_parser(["csv", "ascii", "json"])
                .global(true),
        )
        .arg(
            Arg::new("missing-value")
                .long("missing-value")
                .value_name("VALUE")
                .help("Missing value indicator in the input")
                .default_value("-9999")
                .allow_negative_numbers(true)
                .global(true),
        )
        .arg(
            Arg::new("num-threads")
                .short('j')
                .long("num-threads")
                .value_name("COUNT")
                .help("Number of worker threads (default: all cores)")
                .global(true),
        )
        .arg(
            Arg::new("sequential")
                .long("sequential")
                .help("Process groups one at a time")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("climatology")
                .about("Reduce each calendar group along the time axis")
                .arg(field_arg())
                .arg(aggregation_arg()),
        )
        .subcommand(
            Command::new("anomaly")
                .about("Remove the calendar-group mean from every value")
                .arg(field_arg())
                .arg(
                    Arg::new("standardize")
                        .long("standardize")
                        .help("Also divide by the group standard deviation")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("resample")
                .about("Reduce calendar buckets of the time axis")
                .arg(
                    Arg::new("freq")
                        .short('f')
                        .long("freq")
                        .value_name("FREQ")
                        .help("Bucket size, e.g. 5Y, MS, 3M, 10D, 6H")
                        .required(true),
                )
                .arg(
                    Arg::new("origin")
                        .long("origin")
                        .value_name("DATETIME")
                        .help("Bucket anchor (default 1970-01-01)"),
                )
                .arg(aggregation_arg()),
        )
        .subcommand(
            Command::new("rolling")
                .about("Moving-window reduction along an axis")
                .arg(window_arg("Window length in positions"))
                .arg(
                    Arg::new("center")
                        .long("center")
                        .help("Centre the window on each position")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("min-periods")
                        .long("min-periods")
                        .value_name("N")
                        .help("Valid values required per window (default: window length)"),
                )
                .arg(aggregation_arg()),
        )
        .subcommand(
            Command::new("coarsen")
                .about("Reduce contiguous fixed-size blocks along an axis")
                .arg(window_arg("Block length in positions"))
                .arg(
                    Arg::new("boundary")
                        .long("boundary")
                        .value_name("POLICY")
                        .help("Trailing partial block handling")
                        .value_parser(["exact", "trim", "pad"])
                        .default_value("exact"),
                )
                .arg(aggregation_arg()),
        )
        .subcommand(
            Command::new("bins")
                .about("Reduce over right-closed bins of a numeric axis")
                .arg(
                    Arg::new("edges")
                        .short('e')
                        .long("edges")
                        .value_name("E0,E1,...")
                        .help("Strictly increasing bin edges")
                        .allow_hyphen_values(true)
                        .required(true),
                )
                .arg(aggregation_arg()),
        )
        .subcommand(
            Command::new("demo")
                .about("Run every analysis over the built-in sample dataset")
                .arg(
                    Arg::new("start-year")
                        .long("start-year")
                        .value_name("YEAR")
                        .default_value("2000"),
                )
                .arg(
                    Arg::new("years")
                        .long("years")
                        .value_name("COUNT")
                        .default_value("3"),
                ),
        )
}

fn string_arg<'m>(matches: &'m ArgMatches, name: &str) -> Result<&'m str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| AnalysisError::Config(format!("missing argument --{}", name)))
}

fn parsed_arg<T>(matches: &ArgMatches, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = string_arg(matches, name)?;
    raw.parse::<T>()
        .map_err(|e| AnalysisError::Config(format!("invalid --{} {}: {}", name, raw, e)))
}

fn optional_arg<T>(matches: &ArgMatches, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match matches.get_one::<String>(name) {
        Some(_) => parsed_arg(matches, name).map(Some),
        None => Ok(None),
    }
}

fn parse_edges(text: &str) -> Result<Vec<f64>> {
    text.split(',')
        .map(|e| {
            e.trim()
                .parse::<f64>()
                .map_err(|_| AnalysisError::Config(format!("invalid bin edge: {}", e)))
        })
        .collect()
}

impl Config {
    /// Parse configuration from command line arguments
    ///
    /// Help, version and usage errors are reported by clap, which exits.
    pub fn from_args() -> Result<Self> {
        Self::from_matches(&build_cli().get_matches())
    }

    /// Parse an explicit argument list (the first item is the program name)
    pub fn parse_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = build_cli()
            .try_get_matches_from(args)
            .map_err(|e| AnalysisError::Config(e.to_string()))?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let (name, sub) = matches
            .subcommand()
            .ok_or_else(|| AnalysisError::Config("no analysis subcommand given".to_string()))?;

        let operation = match name {
            "climatology" => Operation::Climatology {
                field: parsed_arg(sub, "field")?,
                aggregation: parsed_arg(sub, "agg")?,
            },
            "anomaly" => Operation::Anomaly {
                field: parsed_arg(sub, "field")?,
                standardize: sub.get_flag("standardize"),
            },
            "resample" => Operation::Resample {
                freq: parsed_arg(sub, "freq")?,
                aggregation: parsed_arg(sub, "agg")?,
                origin: sub
                    .get_one::<String>("origin")
                    .map(|s| parse_timestamp(s))
                    .transpose()?,
            },
            "rolling" => Operation::Rolling {
                window: parsed_arg(sub, "window")?,
                center: sub.get_flag("center"),
                min_periods: optional_arg(sub, "min-periods")?,
                aggregation: parsed_arg(sub, "agg")?,
            },
            "coarsen" => Operation::Coarsen {
                window: parsed_arg(sub, "window")?,
                boundary: parsed_arg(sub, "boundary")?,
                aggregation: parsed_arg(sub, "agg")?,
            },
            "bins" => Operation::Bins {
                edges: parse_edges(string_arg(sub, "edges")?)?,
                aggregation: parsed_arg(sub, "agg")?,
            },
            "demo" => Operation::Demo {
                start_year: parsed_arg(sub, "start-year")?,
                years: parsed_arg(sub, "years")?,
            },
            other => {
                return Err(AnalysisError::Config(format!(
                    "unknown subcommand: {}",
                    other
                )))
            }
        };

        // Global arguments are propagated to the subcommand matches
        let output_path = sub.get_one::<String>("output").map(PathBuf::from);
        let output_format = match sub.get_one::<String>("format") {
            Some(format) => format.parse()?,
            None => output_path
                .as_deref()
                .map(OutputFormat::from_path)
                .unwrap_or_default(),
        };

        let num_threads: Option<usize> = optional_arg(sub, "num-threads")?;
        let execution = if sub.get_flag("sequential") {
            ExecutionOptions::sequential()
        } else {
            match num_threads {
                Some(n) => ExecutionOptions::with_threads(n),
                None => ExecutionOptions::parallel(),
            }
        };

        let config = Config {
            input_path: sub.get_one::<String>("input").map(PathBuf::from),
            variable: sub.get_one::<String>("variable").cloned(),
            axis: string_arg(sub, "axis")?.to_string(),
            output_path,
            output_format,
            missing_value: parsed_arg(sub, "missing-value")?,
            execution,
            verbose: sub.get_flag("verbose"),
            operation,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.execution.num_threads == Some(0) {
            return Err(AnalysisError::Config(
                "Number of threads must be positive".to_string(),
            ));
        }
        if self.axis.is_empty() {
            return Err(AnalysisError::Config("Axis name must not be empty".to_string()));
        }

        match &self.operation {
            Operation::Rolling {
                window,
                min_periods,
                ..
            } => {
                if *window == 0 {
                    return Err(AnalysisError::Config(
                        "Rolling window must be positive".to_string(),
                    ));
                }
                if let Some(min) = min_periods {
                    if *min == 0 || min > window {
                        return Err(AnalysisError::Config(format!(
                            "min-periods must be between 1 and the window length {}",
                            window
                        )));
                    }
                }
            }
            Operation::Coarsen { window, .. } if *window == 0 => {
                return Err(AnalysisError::Config(
                    "Coarsen window must be positive".to_string(),
                ));
            }
            Operation::Bins { edges, .. } => {
                if edges.len() < 2 || edges.windows(2).any(|w| !(w[0] < w[1])) {
                    return Err(AnalysisError::Config(
                        "Bin edges must hold at least two strictly increasing values".to_string(),
                    ));
                }
            }
            Operation::Demo { years, .. } if *years == 0 => {
                return Err(AnalysisError::Config(
                    "Demo needs at least one year".to_string(),
                ));
            }
            _ => {}
        }

        if !matches!(self.operation, Operation::Demo { .. }) {
            let input = self.input_path.as_ref().ok_or_else(|| {
                AnalysisError::Config(format!("{} needs --input", self.operation.name()))
            })?;
            if !input.is_file() {
                return Err(AnalysisError::Config(format!(
                    "Input path does not exist or is not a file: {}",
                    input.display()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn input_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "time,sst\n2000-01-01,1.0").unwrap();
        file
    }

    #[test]
    fn test_demo_defaults() {
        let config = Config::parse_from(["climgroup", "demo"]).unwrap();
        assert_eq!(
            config.operation,
            Operation::Demo {
                start_year: 2000,
                years: 3
            }
        );
        assert_eq!(config.axis, "time");
        assert_eq!(config.output_format, OutputFormat::Csv);
        assert_eq!(config.missing_value, -9999.0);
        assert!(config.execution.parallel);
        assert!(!config.verbose);
    }

    #[test]
    fn test_climatology_arguments() {
        let file = input_file();
        let path = file.path().to_string_lossy().to_string();
        let path = path.as_str();
        let config = Config::parse_from([
            "climgroup",
            "climatology",
            "-i",
            path,
            "-v",
            "sst",
            "--group",
            "time.season",
            "--agg",
            "median",
            "-o",
            "out.json",
            "--sequential",
            "--verbose",
        ])
        .unwrap();

        assert_eq!(
            config.operation,
            Operation::Climatology {
                field: CalendarField::Season,
                aggregation: Aggregation::Median
            }
        );
        assert_eq!(config.variable.as_deref(), Some("sst"));
        assert_eq!(config.output_format, OutputFormat::Json);
        assert!(!config.execution.parallel);
        assert!(config.verbose);
    }

    #[test]
    fn test_window_arguments() {
        let file = input_file();
        let path = file.path().to_string_lossy().to_string();
        let path = path.as_str();

        let config = Config::parse_from([
            "climgroup", "rolling", "-i", path, "-w", "3", "--center", "--min-periods", "2",
            "-j", "2",
        ])
        .unwrap();
        assert_eq!(
            config.operation,
            Operation::Rolling {
                window: 3,
                center: true,
                min_periods: Some(2),
                aggregation: Aggregation::Mean
            }
        );
        assert_eq!(config.execution, ExecutionOptions::with_threads(2));

        let config = Config::parse_from([
            "climgroup", "bins", "-i", path, "-a", "lat", "--edges", "-60,-20,20,60",
        ])
        .unwrap();
        assert_eq!(
            config.operation,
            Operation::Bins {
                edges: vec![-60.0, -20.0, 20.0, 60.0],
                aggregation: Aggregation::Mean
            }
        );
    }

    #[test]
    fn test_validation_failures() {
        let file = input_file();
        let path = file.path().to_string_lossy().to_string();
        let path = path.as_str();

        let err = Config::parse_from(["climgroup", "rolling", "-i", path, "-w", "0"]);
        assert!(matches!(err, Err(AnalysisError::Config(_))));

        let err = Config::parse_from([
            "climgroup", "rolling", "-i", path, "-w", "3", "--min-periods", "4",
        ]);
        assert!(matches!(err, Err(AnalysisError::Config(_))));

        let err = Config::parse_from(["climgroup", "bins", "-i", path, "--edges", "1,1"]);
        assert!(matches!(err, Err(AnalysisError::Config(_))));

        let err = Config::parse_from(["climgroup", "demo", "-j", "0"]);
        assert!(matches!(err, Err(AnalysisError::Config(_))));
    }

    #[test]
    fn test_input_required_outside_demo() {
        let err = Config::parse_from(["climgroup", "climatology"]);
        assert!(matches!(err, Err(AnalysisError::Config(_))));

        let err = Config::parse_from([
            "climgroup",
            "climatology",
            "-i",
            "nonexistent_input_12345.csv",
        ]);
        assert!(matches!(err, Err(AnalysisError::Config(_))));
    }

    #[test]
    fn test_bad_frequency_is_reported() {
        let file = input_file();
        let path = file.path().to_string_lossy().to_string();
        let path = path.as_str();
        let err = Config::parse_from(["climgroup", "resample", "-i", path, "-f", "3W"]);
        assert!(matches!(err, Err(AnalysisError::Config(_))));
    }
}
