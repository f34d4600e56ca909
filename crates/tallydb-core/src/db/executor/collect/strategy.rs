use crate::{
    db::executor::{
        aggregate::{AggregateFunction, AggregateState},
        group::{
            ExecutionContext, GroupError, GroupKey, StableHash, estimated_new_group_bytes,
        },
    },
    value::Value,
};
use std::{collections::BTreeMap, mem};

///
/// RowInputs
///
/// Per-row values a group record folds: one input per aggregate plus the
/// optional INTO payload.
///

#[derive(Debug, Default)]
pub(super) struct RowInputs {
    pub(super) aggregates: Vec<Value>,
    pub(super) into: Option<Value>,
}

///
/// GroupRecord
///
/// Mutable per-group state. Created on first key sighting and consumed
/// exactly once when finalized into an output row.
///

#[derive(Debug)]
pub(super) struct GroupRecord {
    pub(super) key: GroupKey,
    pub(super) states: Vec<AggregateState>,
    pub(super) count: u64,
    pub(super) into_rows: Vec<Value>,
}

impl GroupRecord {
    pub(super) fn new(key: GroupKey, functions: &[AggregateFunction]) -> Self {
        Self {
            key,
            states: functions.iter().map(|f| f.new_state()).collect(),
            count: 0,
            into_rows: Vec::new(),
        }
    }

    fn absorb(&mut self, inputs: RowInputs) {
        for (state, value) in self.states.iter_mut().zip(inputs.aggregates) {
            state.update(value);
        }
        self.count = self.count.saturating_add(1);
        if let Some(payload) = inputs.into {
            self.into_rows.push(payload);
        }
    }

    fn estimated_bytes(&self) -> u64 {
        self.states
            .iter()
            .map(AggregateState::estimated_bytes)
            .sum::<u64>()
            .saturating_add(self.key.estimated_bytes())
    }
}

///
/// GroupingStrategy
///
/// One way of turning keyed rows into group records. `accept` may hand back
/// a record that is already complete; `finish` hands back everything still held.
///

pub(super) trait GroupingStrategy {
    fn accept(
        &mut self,
        key: GroupKey,
        inputs: RowInputs,
        context: &mut ExecutionContext,
    ) -> Result<Option<GroupRecord>, GroupError>;

    fn finish(&mut self) -> Vec<GroupRecord>;
}

///
/// HashGrouping
///
/// Buckets records by stable key hash with canonical-equality collision
/// chains. Holds every group until end of input; each new group is admitted
/// through the execution budget.
///

pub(super) struct HashGrouping {
    functions: Vec<AggregateFunction>,
    buckets: BTreeMap<StableHash, Vec<GroupRecord>>,
}

impl HashGrouping {
    pub(super) const fn new(functions: Vec<AggregateFunction>) -> Self {
        Self {
            functions,
            buckets: BTreeMap::new(),
        }
    }
}

impl GroupingStrategy for HashGrouping {
    fn accept(
        &mut self,
        key: GroupKey,
        inputs: RowInputs,
        context: &mut ExecutionContext,
    ) -> Result<Option<GroupRecord>, GroupError> {
        let created_bucket = !self.buckets.contains_key(&key.hash());
        let bucket = self.buckets.entry(key.hash()).or_default();

        if let Some(record) = bucket.iter_mut().find(|record| record.key == key) {
            record.absorb(inputs);
            return Ok(None);
        }

        let mut record = GroupRecord::new(key, &self.functions);
        let bytes = estimated_new_group_bytes::<GroupRecord>(
            created_bucket,
            bucket.len(),
            bucket.capacity(),
            record.estimated_bytes(),
        );
        context.record_new_group(record.states.len(), bytes)?;

        record.absorb(inputs);
        bucket.push(record);

        Ok(None)
    }

    fn finish(&mut self) -> Vec<GroupRecord> {
        mem::take(&mut self.buckets)
            .into_values()
            .flatten()
            .collect()
    }
}

///
/// MergeGrouping
///
/// Folds runs of consecutive equal keys. Holds at most one record; a key
/// change completes the current record immediately.
///

pub(super) struct MergeGrouping {
    functions: Vec<AggregateFunction>,
    current: Option<GroupRecord>,
}

impl MergeGrouping {
    pub(super) const fn new(functions: Vec<AggregateFunction>) -> Self {
        Self {
            functions,
            current: None,
        }
    }
}

impl GroupingStrategy for MergeGrouping {
    fn accept(
        &mut self,
        key: GroupKey,
        inputs: RowInputs,
        _context: &mut ExecutionContext,
    ) -> Result<Option<GroupRecord>, GroupError> {
        if let Some(current) = self.current.as_mut()
            && current.key == key
        {
            current.absorb(inputs);
            return Ok(None);
        }

        let mut record = GroupRecord::new(key, &self.functions);
        record.absorb(inputs);

        Ok(self.current.replace(record))
    }

    fn finish(&mut self) -> Vec<GroupRecord> {
        self.current.take().into_iter().collect()
    }
}
