//! The worker reduction unit: sum of one partition of a shared slice.

use crate::partition::Partition;
use thiserror::Error;

/// Array element type.
pub type Element = i32;

/// Wide accumulator for partial sums and the total.
pub type Accumulator = i64;

/// Failures a single worker reports instead of a sum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReduceError {
    #[error("partition {partition} is out of bounds for an array of {len} elements")]
    OutOfBounds { partition: Partition, len: usize },

    #[error("accumulator overflow while summing partition {partition}")]
    Overflow { partition: Partition },
}

/// One worker's result, moved back to the coordinator on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialResult {
    pub worker: usize,
    pub partition: Partition,
    pub sum: Accumulator,
}

/// Sum `data[partition.start..partition.end]`.
/// Role: read-only scan of one partition; an empty partition sums to 0.
pub fn partial_sum(data: &[Element], partition: Partition) -> Result<PartialResult, ReduceError> {
    let slice = data
        .get(partition.range())
        .ok_or(ReduceError::OutOfBounds { partition, len: data.len() })?;

    let sum = slice
        .iter()
        .try_fold(0 as Accumulator, |acc, &x| acc.checked_add(Accumulator::from(x)))
        .ok_or(ReduceError::Overflow { partition })?;

    Ok(PartialResult {
        worker: partition.worker,
        partition,
        sum,
    })
}
