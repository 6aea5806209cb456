use super::apply::{apply_with, Demean, GroupOp, TransformOp};
use super::arithmetic::{broadcast_binary, BinaryOp};
use super::keys::{GroupKey, GroupKeyVector};
use crate::array::{Aggregation, LabeledArray};
use crate::errors::{AnalysisError, Result};
use crate::parallel::ExecutionOptions;
use std::collections::BTreeMap;

/// A partition of a source array along one axis, by key
///
/// Holds only index sets into the borrowed source; sub-arrays are
/// materialised on demand. Groups enumerate in ascending key order.
#[derive(Debug, Clone)]
pub struct GroupbyView<'a> {
    source: &'a LabeledArray,
    axis: String,
    axis_index: usize,
    keys: GroupKeyVector,
    groups: Vec<(GroupKey, Vec<usize>)>,
    execution: ExecutionOptions,
}

impl<'a> GroupbyView<'a> {
    /// Partition `source` along `axis` by `keys`
    ///
    /// Sentinel keys are excluded from every group.
    pub fn partition(source: &'a LabeledArray, axis: &str, keys: GroupKeyVector) -> Result<Self> {
        let axis_index = source.axis_index(axis)?;
        let axis_len = source.shape()[axis_index];

        if keys.len() != axis_len {
            return Err(AnalysisError::ShapeMismatch(format!(
                "key vector {} has length {} but axis {} has length {}",
                keys.name(),
                keys.len(),
                axis,
                axis_len
            )));
        }

        let mut members: BTreeMap<&GroupKey, Vec<usize>> = BTreeMap::new();
        for (position, key) in keys.keys().iter().enumerate() {
            if let Some(key) = key {
                members.entry(key).or_default().push(position);
            }
        }
        let groups: Vec<(GroupKey, Vec<usize>)> = members
            .into_iter()
            .map(|(key, positions)| (key.clone(), positions))
            .collect();

        let dropped = keys.missing();
        if dropped > 0 {
            log::warn!(
                "{} of {} positions along {} have no group key and are excluded",
                dropped,
                axis_len,
                axis
            );
        }
        log::debug!(
            "Partitioned {} along {} into {} groups by {}",
            source.name(),
            axis,
            groups.len(),
            keys.name()
        );

        Ok(Self {
            source,
            axis: axis.to_string(),
            axis_index,
            keys,
            groups,
            execution: ExecutionOptions::default(),
        })
    }

    /// Execution options used by the convenience methods on this view
    pub fn with_execution(mut self, execution: ExecutionOptions) -> Self {
        self.execution = execution;
        self
    }

    pub fn source(&self) -> &'a LabeledArray {
        self.source
    }

    /// Name of the grouped axis of the source
    pub fn axis(&self) -> &str {
        &self.axis
    }

    pub fn axis_index(&self) -> usize {
        self.axis_index
    }

    /// Name of the axis a reduction produces
    pub fn group_dim(&self) -> &str {
        self.keys.name()
    }

    pub fn key_vector(&self) -> &GroupKeyVector {
        &self.keys
    }

    pub fn execution(&self) -> &ExecutionOptions {
        &self.execution
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Distinct keys in ascending order
    pub fn keys(&self) -> Vec<&GroupKey> {
        self.groups.iter().map(|(k, _)| k).collect()
    }

    /// Positions along the grouped axis belonging to `key`
    pub fn positions(&self, key: &GroupKey) -> Option<&[usize]> {
        self.groups
            .binary_search_by(|(k, _)| k.cmp(key))
            .ok()
            .map(|i| self.groups[i].1.as_slice())
    }

    /// Key of a position along the grouped axis, `None` for sentinels
    pub fn key_at(&self, position: usize) -> Option<&GroupKey> {
        self.keys.get(position)
    }

    /// Group sizes in key order
    pub fn sizes(&self) -> Vec<(&GroupKey, usize)> {
        self.groups.iter().map(|(k, p)| (k, p.len())).collect()
    }

    /// Number of sentinel positions left out of every group
    pub fn dropped(&self) -> usize {
        self.keys.missing()
    }

    /// `(key, positions)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, &[usize])> {
        self.groups.iter().map(|(k, p)| (k, p.as_slice()))
    }

    pub(crate) fn groups(&self) -> &[(GroupKey, Vec<usize>)] {
        &self.groups
    }

    /// Materialise the sub-array of one group
    pub fn group(&self, key: &GroupKey) -> Result<LabeledArray> {
        let positions = self
            .positions(key)
            .ok_or_else(|| AnalysisError::KeyMismatch(format!("no group with key {}", key)))?;
        self.source.isel(&self.axis, positions)
    }

    /// Reduce every group with a built-in aggregation
    pub fn reduce(&self, aggregation: Aggregation) -> Result<LabeledArray> {
        apply_with(self, GroupOp::Reduce(&aggregation), &self.execution)
    }

    pub fn mean(&self) -> Result<LabeledArray> {
        self.reduce(Aggregation::Mean)
    }

    pub fn sum(&self) -> Result<LabeledArray> {
        self.reduce(Aggregation::Sum)
    }

    pub fn count(&self) -> Result<LabeledArray> {
        self.reduce(Aggregation::Count)
    }

    /// Transform every group, keeping the source layout
    pub fn transform(&self, op: &dyn TransformOp) -> Result<LabeledArray> {
        apply_with(self, GroupOp::Transform(op), &self.execution)
    }

    /// Combine the source with per-group values, re-expanded along the grouped axis
    pub fn broadcast(&self, per_group: &LabeledArray, op: BinaryOp) -> Result<LabeledArray> {
        broadcast_binary(self, per_group, op)
    }

    /// Source minus its per-group mean
    pub fn anomalies(&self) -> Result<LabeledArray> {
        let climatology = self.mean()?;
        self.broadcast(&climatology, BinaryOp::Sub)
    }

    /// Group-wise demeaning as a transform
    pub fn demean(&self) -> Result<LabeledArray> {
        self.transform(&Demean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Axis;

    fn series() -> LabeledArray {
        LabeledArray::from_1d(
            "x",
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            Axis::range("time", 6),
        )
        .unwrap()
    }

    fn keys(values: &[Option<i64>]) -> GroupKeyVector {
        GroupKeyVector::new("k", values.iter().map(|v| v.map(GroupKey::Int)).collect())
    }

    #[test]
    fn test_partition_sorted_groups() {
        let source = series();
        let view = GroupbyView::partition(
            &source,
            "time",
            keys(&[Some(3), Some(1), None, Some(3), Some(1), Some(2)]),
        )
        .unwrap();

        assert_eq!(view.len(), 3);
        assert_eq!(
            view.keys(),
            vec![&GroupKey::Int(1), &GroupKey::Int(2), &GroupKey::Int(3)]
        );
        assert_eq!(view.positions(&GroupKey::Int(1)), Some(&[1, 4][..]));
        assert_eq!(view.positions(&GroupKey::Int(3)), Some(&[0, 3][..]));
        assert_eq!(view.positions(&GroupKey::Int(9)), None);
        assert_eq!(view.dropped(), 1);
        assert_eq!(view.key_at(2), None);
        assert_eq!(view.group_dim(), "k");
    }

    #[test]
    fn test_partition_errors() {
        let source = series();
        assert!(matches!(
            GroupbyView::partition(&source, "lat", keys(&[Some(1); 6])),
            Err(AnalysisError::UnknownAxis(_))
        ));
        assert!(matches!(
            GroupbyView::partition(&source, "time", keys(&[Some(1); 5])),
            Err(AnalysisError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_group_materialises_lazily() {
        let source = series();
        let view = GroupbyView::partition(
            &source,
            "time",
            keys(&[Some(0), Some(1), Some(0), Some(1), Some(0), Some(1)]),
        )
        .unwrap();

        let odd = view.group(&GroupKey::Int(1)).unwrap();
        assert_eq!(odd.data().as_slice().unwrap(), &[2.0, 4.0, 6.0]);
        assert!(view.group(&GroupKey::Int(7)).is_err());
    }
}
