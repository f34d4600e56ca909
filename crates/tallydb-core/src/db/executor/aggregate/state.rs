use crate::{db::executor::aggregate::AggregateFunction, value::Value};
use std::mem::size_of;

///
/// NumericFold
///
/// Tagged state shared by the numeric reducers.
///
/// Empty        → no valid (non-null) input seen yet
/// Accumulating → at least one numeric input, no poison
/// Poisoned     → a non-null, non-numeric input was seen; finalizes to null
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::db) enum NumericFold<T> {
    Empty,
    Accumulating(T),
    Poisoned,
}

impl<T: Copy> NumericFold<T> {
    // Null inputs are filtered before this point.
    fn update(&mut self, value: &Value, init: impl FnOnce(f64) -> T, step: impl FnOnce(&mut T, f64)) {
        let Some(n) = value.as_f64() else {
            *self = Self::Poisoned;
            return;
        };

        match self {
            Self::Empty => *self = Self::Accumulating(init(n)),
            Self::Accumulating(partial) => step(partial, n),
            Self::Poisoned => {}
        }
    }

    const fn partial(&self) -> Option<T> {
        match self {
            Self::Accumulating(partial) => Some(*partial),
            Self::Empty | Self::Poisoned => None,
        }
    }
}

///
/// MeanPartial
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::db) struct MeanPartial {
    count: u64,
    sum: f64,
}

///
/// WelfordPartial
///
/// Running count, mean and sum of squared deviations (Welford's online update).
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::db) struct WelfordPartial {
    count: u64,
    mean: f64,
    m2: f64,
}

impl WelfordPartial {
    const fn first(n: f64) -> Self {
        Self {
            count: 1,
            mean: n,
            m2: 0.0,
        }
    }

    #[expect(clippy::cast_precision_loss)]
    fn push(&mut self, n: f64) {
        self.count += 1;
        let delta = n - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (n - self.mean);
    }
}

///
/// AggregateState
///
/// Per-aggregate, per-group reducer state. One variant per registry member so
/// update and finalize stay exhaustive matches.
///

#[derive(Clone, Debug, PartialEq)]
pub(in crate::db) enum AggregateState {
    Length(u64),
    Min(Option<Value>),
    Max(Option<Value>),
    Sum(NumericFold<f64>),
    Average(NumericFold<MeanPartial>),
    Variance {
        sample: bool,
        fold: NumericFold<WelfordPartial>,
    },
}

impl AggregateState {
    /// Build the initial reducer state for one registry function.
    #[must_use]
    pub(in crate::db) const fn for_function(function: AggregateFunction) -> Self {
        match function {
            AggregateFunction::Length => Self::Length(0),
            AggregateFunction::Min => Self::Min(None),
            AggregateFunction::Max => Self::Max(None),
            AggregateFunction::Sum => Self::Sum(NumericFold::Empty),
            AggregateFunction::Average => Self::Average(NumericFold::Empty),
            AggregateFunction::Variance => Self::Variance {
                sample: false,
                fold: NumericFold::Empty,
            },
            AggregateFunction::VarianceSample => Self::Variance {
                sample: true,
                fold: NumericFold::Empty,
            },
        }
    }

    /// Apply one input value.
    pub(in crate::db) fn update(&mut self, value: Value) {
        // LENGTH counts every row, null included
        if let Self::Length(count) = self {
            *count = count.saturating_add(1);
            return;
        }
        if value.is_null() {
            return;
        }

        match self {
            Self::Length(_) => {}
            Self::Min(current) => {
                if current.as_ref().is_none_or(|current| value < *current) {
                    *current = Some(value);
                }
            }
            Self::Max(current) => {
                if current.as_ref().is_none_or(|current| value > *current) {
                    *current = Some(value);
                }
            }
            Self::Sum(fold) => fold.update(&value, |n| n, |sum, n| *sum += n),
            Self::Average(fold) => fold.update(
                &value,
                |n| MeanPartial { count: 1, sum: n },
                |partial, n| {
                    partial.count += 1;
                    partial.sum += n;
                },
            ),
            Self::Variance { fold, .. } => {
                fold.update(&value, WelfordPartial::first, WelfordPartial::push);
            }
        }
    }

    /// Consume the state into the aggregate output value.
    ///
    /// Non-finite numeric results finalize to null.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub(in crate::db) fn finalize(self) -> Value {
        match self {
            Self::Length(count) => Value::from_f64(count as f64),
            Self::Min(current) | Self::Max(current) => current.unwrap_or_default(),
            Self::Sum(fold) => fold.partial().map_or(Value::Null, Value::from_f64),
            Self::Average(fold) => fold.partial().map_or(Value::Null, |partial| {
                Value::from_f64(partial.sum / partial.count as f64)
            }),
            Self::Variance { sample, fold } => {
                let Some(partial) = fold.partial() else {
                    return Value::Null;
                };

                if sample {
                    if partial.count < 2 {
                        return Value::Null;
                    }
                    Value::from_f64(partial.m2 / (partial.count - 1) as f64)
                } else if partial.count == 1 {
                    Value::from(0)
                } else {
                    Value::from_f64(partial.m2 / partial.count as f64)
                }
            }
        }
    }

    /// Finalize with scalar-function semantics (SUM of nothing is `0`).
    #[must_use]
    pub(in crate::db) fn finalize_scalar(self) -> Value {
        match self {
            Self::Sum(NumericFold::Empty) => Value::from(0),
            other => other.finalize(),
        }
    }

    /// Conservative size estimate of this state, including a held extreme.
    #[must_use]
    pub(in crate::db) fn estimated_bytes(&self) -> u64 {
        let inline = u64::try_from(size_of::<Self>()).unwrap_or(u64::MAX);
        match self {
            Self::Min(Some(value)) | Self::Max(Some(value)) => {
                inline.saturating_add(value.estimated_bytes())
            }
            _ => inline,
        }
    }
}
