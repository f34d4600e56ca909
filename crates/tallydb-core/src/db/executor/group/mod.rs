//! Module: executor::group
//! Responsibility: group keys, stable hashing, and grouped budget policy.
//! Does not own: aggregate fold algorithms or clause validation.
//! Boundary: grouped execution substrate shared by both grouping strategies.

mod hash;
mod key;


use std::mem::size_of;
use thiserror::Error as ThisError;

pub(in crate::db) use hash::StableHash;
pub(in crate::db) use key::GroupKey;

///
/// CONSTANTS
///

const GROUPED_DEFAULT_MAX_GROUPS: u64 = 10_000;
const GROUPED_DEFAULT_MAX_GROUP_BYTES: u64 = 16 * 1024 * 1024;

///
/// GroupError
///
/// Typed grouped-execution error surface.
/// Keeps grouped memory-limit failures explicit instead of degrading them into
/// generic internal errors.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum GroupError {
    #[error(
        "grouped execution memory limit exceeded ({resource}): attempted={attempted}, limit={limit}"
    )]
    MemoryLimitExceeded {
        resource: &'static str,
        attempted: u64,
        limit: u64,
    },
}

impl GroupError {
    /// Name of the exhausted resource.
    #[must_use]
    pub const fn resource(&self) -> &'static str {
        match self {
            Self::MemoryLimitExceeded { resource, .. } => resource,
        }
    }
}

///
/// GroupedExecutionConfig
///
/// Hard limits for hash grouping. Limits are owned by the caller at the
/// execution boundary instead of inside strategy state, so memory policy
/// stays in one place. The default is unbounded.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GroupedExecutionConfig {
    max_groups: u64,
    max_group_bytes: u64,
}

impl GroupedExecutionConfig {
    /// Build one grouped hard-limit configuration.
    #[must_use]
    pub const fn with_hard_limits(max_groups: u64, max_group_bytes: u64) -> Self {
        Self {
            max_groups,
            max_group_bytes,
        }
    }

    /// Build one configuration without limits.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self::with_hard_limits(u64::MAX, u64::MAX)
    }

    /// Conservative preset for callers that want a guardrail on hash grouping.
    #[must_use]
    pub const fn bounded() -> Self {
        Self::with_hard_limits(GROUPED_DEFAULT_MAX_GROUPS, GROUPED_DEFAULT_MAX_GROUP_BYTES)
    }

    #[must_use]
    pub const fn max_groups(&self) -> u64 {
        self.max_groups
    }

    #[must_use]
    pub const fn max_group_bytes(&self) -> u64 {
        self.max_group_bytes
    }
}

impl Default for GroupedExecutionConfig {
    /// Every distinct key gets its row unless the caller opts into limits.
    fn default() -> Self {
        Self::unbounded()
    }
}

///
/// ExecutionBudget
///
/// Grouped-execution resource usage counters.
/// `groups` and `aggregate_states` are structural counters; `estimated_bytes`
/// is a conservative allocation estimate used for memory guardrails.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(in crate::db) struct ExecutionBudget {
    groups: u64,
    aggregate_states: u64,
    estimated_bytes: u64,
}

impl ExecutionBudget {
    #[cfg(test)]
    #[must_use]
    pub(in crate::db) const fn groups(&self) -> u64 {
        self.groups
    }

    #[cfg(test)]
    #[must_use]
    pub(in crate::db) const fn aggregate_states(&self) -> u64 {
        self.aggregate_states
    }

    #[cfg(test)]
    #[must_use]
    pub(in crate::db) const fn estimated_bytes(&self) -> u64 {
        self.estimated_bytes
    }

    fn record_new_group(
        &mut self,
        config: &GroupedExecutionConfig,
        aggregate_states: usize,
        bytes_delta: u64,
    ) -> Result<(), GroupError> {
        let next_groups = self.groups.saturating_add(1);
        if next_groups > config.max_groups() {
            return Err(GroupError::MemoryLimitExceeded {
                resource: "groups",
                attempted: next_groups,
                limit: config.max_groups(),
            });
        }

        let next_bytes = self.estimated_bytes.saturating_add(bytes_delta);
        if next_bytes > config.max_group_bytes() {
            return Err(GroupError::MemoryLimitExceeded {
                resource: "estimated_bytes",
                attempted: next_bytes,
                limit: config.max_group_bytes(),
            });
        }

        self.groups = next_groups;
        self.aggregate_states = self
            .aggregate_states
            .saturating_add(saturating_u64_from_usize(aggregate_states));
        self.estimated_bytes = next_bytes;

        Ok(())
    }
}

///
/// ExecutionContext
///
/// Grouped execution policy plus mutable budget usage. Created once per
/// execution and passed down to the grouping strategy so every new group is
/// admitted through the same accounting.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(in crate::db) struct ExecutionContext {
    config: GroupedExecutionConfig,
    budget: ExecutionBudget,
}

impl ExecutionContext {
    #[must_use]
    pub(in crate::db) const fn new(config: GroupedExecutionConfig) -> Self {
        Self {
            config,
            budget: ExecutionBudget {
                groups: 0,
                aggregate_states: 0,
                estimated_bytes: 0,
            },
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(in crate::db) const fn config(&self) -> &GroupedExecutionConfig {
        &self.config
    }

    #[cfg(test)]
    #[must_use]
    pub(in crate::db) const fn budget(&self) -> &ExecutionBudget {
        &self.budget
    }

    /// Admit one new resident group or fail with the exhausted resource.
    pub(in crate::db) fn record_new_group(
        &mut self,
        aggregate_states: usize,
        bytes_delta: u64,
    ) -> Result<(), GroupError> {
        self.budget
            .record_new_group(&self.config, aggregate_states, bytes_delta)
    }
}

/// Estimate the allocation growth caused by pushing one slot of type `T`
/// holding `payload_bytes` of heap data into a hash bucket.
#[must_use]
pub(in crate::db) fn estimated_new_group_bytes<T>(
    created_bucket: bool,
    bucket_len: usize,
    bucket_capacity: usize,
    payload_bytes: u64,
) -> u64 {
    let slot_size = size_of::<T>();
    let map_entry_size = if created_bucket {
        size_of::<(StableHash, Vec<T>)>()
    } else {
        0
    };

    let slot_growth = if bucket_len < bucket_capacity {
        slot_size
    } else {
        let projected_capacity = projected_vec_capacity_after_push(bucket_capacity);
        projected_capacity
            .saturating_sub(bucket_capacity)
            .saturating_mul(slot_size)
    };

    saturating_u64_from_usize(map_entry_size.saturating_add(slot_growth))
        .saturating_add(payload_bytes)
}

const fn projected_vec_capacity_after_push(current_capacity: usize) -> usize {
    if current_capacity == 0 {
        1
    } else {
        current_capacity.saturating_mul(2)
    }
}

fn saturating_u64_from_usize(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
