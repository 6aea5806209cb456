use climgroup::{
    config::{Config, Operation},
    data_io::{
        create_writer, sample, Dataset, DatasetLoader, DelimitedTextLoader, Table, TableWriter,
    },
    errors::{AnalysisError, Result},
    groupby::{partition, partition_by_calendar, Alignment, CalendarField, GroupKeyVector, Standardize},
    parallel::ExecutionOptions,
    window::{Boundary, Coarsen, Frequency, Resample, Rolling},
    Aggregation, LabeledArray,
};
use env_logger::Env;

fn main() {
    let config = match Config::from_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let default_level = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    if let Err(e) = run(&config) {
        eprintln!("{} error: {}", config.operation.name(), e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<()> {
    let mut writer = create_writer(config.output_path.as_deref(), config.output_format);
    writer.add_attribute("operation", config.operation.name())?;

    match &config.operation {
        Operation::Demo { start_year, years } => {
            run_demo(*start_year, *years, &config.execution, writer.as_mut())?
        }
        operation => {
            let dataset = load_input(config)?;
            let array = select_variable(&dataset, config.variable.as_deref())?;
            writer.add_attribute("source", &dataset.name)?;
            writer.add_attribute("variable", array.name())?;
            let result = run_operation(operation, array, &config.axis, &config.execution)?;
            writer.write_table(&Table::from_array(&result))?;
        }
    }

    writer.close()
}

fn load_input(config: &Config) -> Result<Dataset> {
    let path = config
        .input_path
        .as_deref()
        .ok_or_else(|| AnalysisError::Config("no input file given".to_string()))?;
    DelimitedTextLoader::for_path(path)
        .with_missing_value(config.missing_value)
        .load(path)
}

/// The requested variable, or the only one when none was named
fn select_variable<'d>(dataset: &'d Dataset, variable: Option<&str>) -> Result<&'d LabeledArray> {
    match variable {
        Some(name) => dataset.get(name),
        None if dataset.len() == 1 => dataset
            .variables
            .values()
            .next()
            .ok_or_else(|| AnalysisError::UnknownVariable("<none>".to_string())),
        None => Err(AnalysisError::Config(format!(
            "input holds {} variables ({}); choose one with --variable",
            dataset.len(),
            dataset.variable_names().join(", ")
        ))),
    }
}

fn run_operation(
    operation: &Operation,
    array: &LabeledArray,
    axis: &str,
    execution: &ExecutionOptions,
) -> Result<LabeledArray> {
    match operation {
        Operation::Climatology { field, aggregation } => partition_by_calendar(array, axis, *field)?
            .with_execution(*execution)
            .reduce(*aggregation),
        Operation::Anomaly { field, standardize } => {
            let view = partition_by_calendar(array, axis, *field)?.with_execution(*execution);
            if *standardize {
                view.transform(&Standardize)
            } else {
                view.anomalies()
            }
        }
        Operation::Resample {
            freq,
            aggregation,
            origin,
        } => {
            let mut resample = Resample::new(*freq)?.with_execution(*execution);
            if let Some(origin) = origin {
                resample = resample.with_origin(*origin);
            }
            resample.reduce(array, axis, *aggregation)
        }
        Operation::Rolling {
            window,
            center,
            min_periods,
            aggregation,
        } => {
            let mut rolling = Rolling::new(*window)?.center(*center);
            if let Some(min_periods) = min_periods {
                rolling = rolling.min_periods(*min_periods)?;
            }
            rolling.reduce(array, axis, *aggregation)
        }
        Operation::Coarsen {
            window,
            boundary,
            aggregation,
        } => Coarsen::new(*window)?
            .boundary(*boundary)
            .with_execution(*execution)
            .reduce(array, axis, *aggregation),
        Operation::Bins { edges, aggregation } => {
            let keys = GroupKeyVector::from_bins(array.axis(axis)?, edges)?;
            partition(array, axis, keys)?
                .with_execution(*execution)
                .reduce(*aggregation)
        }
        Operation::Demo { .. } => Err(AnalysisError::Config(
            "demo runs over the sample dataset".to_string(),
        )),
    }
}

fn run_demo(
    start_year: i32,
    years: usize,
    execution: &ExecutionOptions,
    writer: &mut dyn TableWriter,
) -> Result<()> {
    let dataset = sample::monthly_sst(start_year, years)?;
    let sst = dataset.get("sst")?;
    let basin = dataset.get("basin")?;
    writer.add_attribute("source", &dataset.name)?;

    let monthly = partition_by_calendar(sst, "time", CalendarField::Month)?.with_execution(*execution);
    let climatology = monthly.mean()?;
    log::info!(
        "Monthly climatology over {} months ({} dropped)",
        sst.len_of("time")?,
        monthly.dropped()
    );
    writer.write_table(&Table::from_array(&climatology.with_name("sst_monthly_climatology")))?;

    let anomalies = monthly.anomalies()?;
    let residual = anomalies.reduce("time", Aggregation::Mean)?;
    writer.write_table(&Table::from_array(&residual.with_name("sst_anomaly_mean")))?;

    let seasonal = partition_by_calendar(sst, "time", CalendarField::Season)?
        .with_execution(*execution)
        .reduce(Aggregation::Std)?;
    writer.write_table(&Table::from_array(&seasonal.with_name("sst_seasonal_std")))?;

    let annual = Resample::new(Frequency::Years(1))?
        .with_execution(*execution)
        .reduce(sst, "time", Aggregation::Mean)?;
    writer.write_table(&Table::from_array(&annual.with_name("sst_annual_mean")))?;

    let smoothed = Rolling::new(12)?
        .center(true)
        .reduce(sst, "time", Aggregation::Mean)?;
    writer.write_table(&Table::from_array(&smoothed.with_name("sst_rolling_12")))?;

    let bands = Coarsen::new(2)?
        .boundary(Boundary::Trim)
        .with_execution(*execution)
        .reduce(sst, "lat", Aggregation::Mean)?;
    writer.write_table(&Table::from_array(&bands.with_name("sst_lat_bands")))?;

    let hemispheres = GroupKeyVector::from_bins(sst.axis("lat")?, &[-90.0, 0.0, 90.0])?;
    let by_hemisphere = partition(sst, "lat", hemispheres)?
        .with_execution(*execution)
        .reduce(Aggregation::Mean)?;
    writer.write_table(&Table::from_array(&by_hemisphere.with_name("sst_hemisphere_mean")))?;

    let basins = GroupKeyVector::from_array(basin, sst.axis("lat")?, Alignment::Exact)?;
    let by_basin = partition(sst, "lat", basins)?
        .with_execution(*execution)
        .reduce(Aggregation::Mean)?;
    writer.write_table(&Table::from_array(&by_basin.with_name("sst_basin_mean")))?;

    Ok(())
}
