use climgroup::parallel::ExecutionOptions;
use climgroup::time_utils::{add_months, parse_timestamp};
use climgroup::window::{Boundary, Coarsen, Frequency, Resample, Rolling};
use climgroup::{Aggregation, AnalysisError, Axis, Coord, LabeledArray};

fn monthly(start: &str, months: i64, values: impl Fn(i64) -> f64) -> LabeledArray {
    let origin = parse_timestamp(start).unwrap();
    let times: Vec<_> = (0..months).map(|m| add_months(&origin, m).unwrap()).collect();
    let data: Vec<f64> = (0..months).map(values).collect();
    LabeledArray::from_1d("x", data, Axis::from_times("time", times)).unwrap()
}

#[test]
fn test_coarsen_pad_on_length_thirteen() {
    let array = LabeledArray::from_1d(
        "x",
        (1..=13).map(|v| v as f64).collect(),
        Axis::range("time", 13),
    )
    .unwrap();

    let blocks = Coarsen::new(12)
        .unwrap()
        .boundary(Boundary::Pad)
        .construct(&array, "time", "month")
        .unwrap();
    assert_eq!(blocks.dims(), vec!["time", "month"]);
    assert_eq!(blocks.shape(), &[2, 12]);
    assert_eq!(blocks.data()[[0, 11]], 12.0);
    assert_eq!(blocks.data()[[1, 0]], 13.0);
    assert!((1..12).all(|j| blocks.data()[[1, j]].is_nan()));

    let sums = Coarsen::new(12)
        .unwrap()
        .boundary(Boundary::Pad)
        .reduce(&array, "time", Aggregation::Sum)
        .unwrap();
    assert_eq!(sums.data().as_slice().unwrap(), &[78.0, 13.0]);
    assert_eq!(
        sums.axis("time").unwrap().coords(),
        &[Coord::Float(5.5), Coord::Float(12.0)]
    );
}

#[test]
fn test_coarsen_exact_rejects_remainder() {
    let array = LabeledArray::from_1d("x", vec![0.0; 13], Axis::range("time", 13)).unwrap();
    let err = Coarsen::new(12).unwrap().reduce(&array, "time", Aggregation::Mean);
    assert!(matches!(err, Err(AnalysisError::ShapeMismatch(_))));
    assert!(matches!(
        Coarsen::new(0),
        Err(AnalysisError::InvalidWindow(_))
    ));
}

#[test]
fn test_coarsen_time_axis_keeps_first_timestamp() {
    let array = monthly("2000-01-01", 24, |m| m as f64);
    let annual = Coarsen::new(12)
        .unwrap()
        .reduce(&array, "time", Aggregation::Mean)
        .unwrap();
    assert_eq!(annual.data().as_slice().unwrap(), &[5.5, 17.5]);
    assert_eq!(
        annual.axis("time").unwrap().coords()[1],
        Coord::Time(parse_timestamp("2001-01-01").unwrap())
    );
}

#[test]
fn test_five_year_resample_buckets() {
    // 1998-01 .. 2006-12
    let array = monthly("1998-01-01", 108, |_| 1.0);
    let counts = Resample::new(Frequency::Years(5))
        .unwrap()
        .reduce(&array, "time", Aggregation::Count)
        .unwrap();

    assert_eq!(counts.dims(), vec!["time"]);
    assert_eq!(
        counts.axis("time").unwrap().coords(),
        &[
            Coord::Time(parse_timestamp("1995-01-01").unwrap()),
            Coord::Time(parse_timestamp("2000-01-01").unwrap()),
            Coord::Time(parse_timestamp("2005-01-01").unwrap()),
        ]
    );
    assert_eq!(counts.data().as_slice().unwrap(), &[24.0, 60.0, 24.0]);
    assert_eq!(counts.attrs().get("resample").map(String::as_str), Some("5Y"));
}

#[test]
fn test_quarterly_resample_with_origin() {
    let array = monthly("2000-01-01", 12, |m| m as f64);
    let quarterly = Resample::new("3M".parse().unwrap())
        .unwrap()
        .with_origin(parse_timestamp("2000-02-01").unwrap())
        .reduce(&array, "time", Aggregation::Sum)
        .unwrap();

    // Buckets start in Nov, Feb, May, Aug, Nov
    assert_eq!(quarterly.len_of("time").unwrap(), 5);
    assert_eq!(
        quarterly.data().as_slice().unwrap(),
        &[0.0, 6.0, 15.0, 24.0, 21.0]
    );
}

#[test]
fn test_resample_skips_empty_buckets() {
    let times = vec![
        parse_timestamp("2000-01-01").unwrap(),
        parse_timestamp("2000-01-02").unwrap(),
        parse_timestamp("2000-01-20").unwrap(),
    ];
    let array = LabeledArray::from_1d("x", vec![1.0, 2.0, 3.0], Axis::from_times("time", times))
        .unwrap();
    let daily = Resample::new(Frequency::Days(5))
        .unwrap()
        .reduce(&array, "time", Aggregation::Sum)
        .unwrap();
    assert_eq!(daily.data().as_slice().unwrap(), &[3.0, 3.0]);
}

#[test]
fn test_resample_requires_time_axis() {
    let array = LabeledArray::from_1d("x", vec![1.0], Axis::range("step", 1)).unwrap();
    let err = Resample::new(Frequency::Months(1))
        .unwrap()
        .reduce(&array, "step", Aggregation::Mean);
    assert!(matches!(err, Err(AnalysisError::NotTemporal(_))));
}

#[test]
fn test_rolling_on_two_dimensional_grid() {
    let array = LabeledArray::from_shape_vec(
        "x",
        vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0],
        vec![Axis::range("time", 4), Axis::from_floats("lat", vec![0.0, 10.0])],
    )
    .unwrap();
    let sums = Rolling::new(2)
        .unwrap()
        .reduce(&array, "time", Aggregation::Sum)
        .unwrap();

    assert_eq!(sums.dims(), array.dims());
    assert!(sums.data()[[0, 0]].is_nan());
    assert_eq!(sums.data()[[1, 0]], 3.0);
    assert_eq!(sums.data()[[3, 1]], 70.0);
}

#[test]
fn test_rolling_construct_matches_reduce() {
    let array = monthly("2000-01-01", 6, |m| (m * m) as f64);
    let rolling = Rolling::new(3).unwrap().center(true);
    let windows = rolling.construct(&array, "time", "window").unwrap();
    let from_windows = windows.reduce("window", Aggregation::Max).unwrap();
    let direct = rolling.min_periods(1).unwrap().reduce(&array, "time", Aggregation::Max).unwrap();
    assert_eq!(from_windows.data(), direct.data());
}

#[test]
fn test_windows_longer_than_the_axis_are_rejected() {
    let array = monthly("2000-01-01", 5, |m| m as f64);
    for boundary in [Boundary::Exact, Boundary::Trim, Boundary::Pad] {
        let err = Coarsen::new(6)
            .unwrap()
            .boundary(boundary)
            .reduce(&array, "time", Aggregation::Mean);
        assert!(matches!(err, Err(AnalysisError::InvalidWindow(_))));
    }
    let err = Rolling::new(6).unwrap().reduce(&array, "time", Aggregation::Mean);
    assert!(matches!(err, Err(AnalysisError::InvalidWindow(_))));
}

#[test]
fn test_huge_year_frequency_is_rejected() {
    let err = "400000000Y".parse::<Frequency>();
    assert!(matches!(err, Err(AnalysisError::InvalidWindow(_))));
    assert!(matches!(
        Resample::new(Frequency::Years(400_000_000)),
        Err(AnalysisError::InvalidWindow(_))
    ));

    // Largest accepted step folds the whole record into one bucket
    let array = monthly("2000-01-01", 24, |_| 1.0);
    let counts = Resample::new(Frequency::Years(u32::MAX / 12))
        .unwrap()
        .reduce(&array, "time", Aggregation::Count)
        .unwrap();
    assert_eq!(counts.data().as_slice().unwrap(), &[24.0]);
}

#[test]
fn test_window_reductions_honour_execution_options() {
    let array = LabeledArray::from_shape_vec(
        "x",
        (0..48).map(|v| (v * 7 % 11) as f64).collect(),
        vec![
            Axis::from_times(
                "time",
                (0..24)
                    .map(|m| add_months(&parse_timestamp("2000-01-01").unwrap(), m).unwrap())
                    .collect::<Vec<_>>(),
            ),
            Axis::from_floats("lat", vec![-10.0, 10.0]),
        ],
    )
    .unwrap();
    let parallel = ExecutionOptions::with_threads(2);

    let quarterly = Resample::new(Frequency::Months(3)).unwrap();
    assert_eq!(
        quarterly.view(&array, "time").unwrap().execution(),
        &ExecutionOptions::default()
    );
    let threaded = quarterly.with_execution(parallel);
    assert_eq!(threaded.view(&array, "time").unwrap().execution(), &parallel);
    assert_eq!(
        threaded.reduce(&array, "time", Aggregation::Sum).unwrap().data(),
        quarterly.reduce(&array, "time", Aggregation::Sum).unwrap().data()
    );

    let blocks = Coarsen::new(12).unwrap().with_execution(parallel);
    assert_eq!(blocks.view(&array, "time").unwrap().execution(), &parallel);
    assert_eq!(
        blocks.reduce(&array, "time", Aggregation::Mean).unwrap().data(),
        Coarsen::new(12)
            .unwrap()
            .reduce(&array, "time", Aggregation::Mean)
            .unwrap()
            .data()
    );
}
