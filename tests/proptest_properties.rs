//! Property-based checks of the grouping invariants over arbitrary inputs

use proptest::collection::vec;
use proptest::prelude::*;

use climgroup::groupby::{apply, apply_with, partition, GroupKey, GroupKeyVector, GroupOp, TransformFn};
use climgroup::parallel::ExecutionOptions;
use climgroup::window::{Boundary, Coarsen};
use climgroup::{Aggregation, Axis, LabeledArray};

// ---------------------------------------------------------------------------
// Strategy generators
// ---------------------------------------------------------------------------

/// Values along `time` with one integer key per position
fn arb_grouped_series() -> impl Strategy<Value = (Vec<f64>, Vec<i64>)> {
    (1usize..40).prop_flat_map(|len| (vec(-1e3_f64..1e3_f64, len), vec(0i64..5, len)))
}

/// Keys where roughly one position in five is a sentinel
fn arb_sparse_keys(len: usize) -> impl Strategy<Value = Vec<Option<i64>>> {
    vec(
        prop_oneof![
            4 => (0i64..4).prop_map(Some),
            1 => Just(None),
        ],
        len,
    )
}

fn series(values: Vec<f64>) -> LabeledArray {
    let len = values.len();
    LabeledArray::from_1d("x", values, Axis::range("time", len)).unwrap()
}

fn keys(raw: &[i64]) -> GroupKeyVector {
    GroupKeyVector::new("key", raw.iter().map(|k| Some(GroupKey::Int(*k))).collect())
}

fn tolerance(values: &[f64]) -> f64 {
    1e-9 * values.iter().map(|v| v.abs()).sum::<f64>().max(1.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Grouped sums add up to the ungrouped total.
    #[test]
    fn prop_grouped_sums_partition_total((values, raw) in arb_grouped_series()) {
        let source = series(values.clone());
        let view = partition(&source, "time", keys(&raw)).unwrap();
        let grouped = view.sum().unwrap();

        let total = source.reduce_all(Aggregation::Sum);
        let regrouped = grouped.reduce_all(Aggregation::Sum);
        prop_assert!((total - regrouped).abs() <= tolerance(&values));
    }

    /// Demeaned groups have zero mean.
    #[test]
    fn prop_demean_zeroes_group_means((values, raw) in arb_grouped_series()) {
        let source = series(values.clone());
        let view = partition(&source, "time", keys(&raw)).unwrap();
        let anomalies = view.demean().unwrap();

        let check = partition(&anomalies, "time", keys(&raw)).unwrap().mean().unwrap();
        for mean in check.data().iter() {
            prop_assert!(mean.abs() <= tolerance(&values));
        }
    }

    /// Broadcast subtraction of the group mean also leaves zero-mean groups.
    #[test]
    fn prop_broadcast_anomalies_zero_mean((values, raw) in arb_grouped_series()) {
        let source = series(values.clone());
        let view = partition(&source, "time", keys(&raw)).unwrap();
        let anomalies = view.anomalies().unwrap();

        let check = partition(&anomalies, "time", keys(&raw)).unwrap().mean().unwrap();
        for mean in check.data().iter() {
            prop_assert!(mean.abs() <= tolerance(&values));
        }
    }

    /// Every keyed position comes back exactly where it started.
    #[test]
    fn prop_transform_covers_keyed_positions(
        (values, raw) in (1usize..40).prop_flat_map(|len| (vec(-1e3_f64..1e3_f64, len), arb_sparse_keys(len)))
    ) {
        let source = series(values.clone());
        let key_vector = GroupKeyVector::new(
            "key",
            raw.iter().map(|k| k.map(GroupKey::Int)).collect(),
        );
        let view = partition(&source, "time", key_vector).unwrap();
        let identity = TransformFn::new("identity", |group: &LabeledArray, _axis: &str| Ok(group.clone()));
        let result = apply(&view, GroupOp::Transform(&identity)).unwrap();

        for (position, key) in raw.iter().enumerate() {
            let value = result.data()[[position]];
            match key {
                Some(_) => {
                    prop_assert_eq!(value.to_bits(), values[position].to_bits());
                }
                None => {
                    prop_assert!(value.is_nan());
                }
            }
        }
    }

    /// Parallel and sequential reductions are bit-identical.
    #[test]
    fn prop_parallel_matches_sequential((values, raw) in arb_grouped_series()) {
        let source = series(values);
        let view = partition(&source, "time", keys(&raw)).unwrap();

        for aggregation in [Aggregation::Mean, Aggregation::Var, Aggregation::Median] {
            let sequential = apply(&view, GroupOp::Reduce(&aggregation)).unwrap();
            let parallel = apply_with(&view, GroupOp::Reduce(&aggregation), &ExecutionOptions::parallel()).unwrap();
            prop_assert_eq!(sequential.axes(), parallel.axes());
            for (a, b) in sequential.data().iter().zip(parallel.data().iter()) {
                prop_assert_eq!(a.to_bits(), b.to_bits());
            }
        }
    }

    /// Padded coarsening keeps every value and produces ceil(len / n) blocks.
    #[test]
    fn prop_coarsen_pad_keeps_all_values(
        (values, window) in vec(-1e3_f64..1e3_f64, 1..50)
            .prop_flat_map(|values| {
                let longest = values.len().min(7);
                (Just(values), 1usize..=longest)
            })
    ) {
        let len = values.len();
        let source = series(values.clone());
        let sums = Coarsen::new(window)
            .unwrap()
            .boundary(Boundary::Pad)
            .reduce(&source, "time", Aggregation::Sum)
            .unwrap();

        prop_assert_eq!(sums.len_of("time").unwrap(), len.div_ceil(window));
        let total: f64 = values.iter().sum();
        prop_assert!((sums.reduce_all(Aggregation::Sum) - total).abs() <= tolerance(&values));
    }
}
