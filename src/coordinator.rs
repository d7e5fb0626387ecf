//! The coordinator: owns the run from validation to the final total.

use crate::config::{Backend, Config};
use crate::error::SumError;
use crate::executor::{Executor, OsThreads, RayonExecutor, ThreadExecutor};
use crate::partition::{is_exact_cover, partition, Partition};
use crate::reduce::{partial_sum, Accumulator, Element, PartialResult};
use itertools::{EitherOrBoth, Itertools};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of one summation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumReport {
    pub total: Accumulator,
    /// One entry per worker, ordered by worker id.
    pub partials: Vec<PartialResult>,
    pub elapsed: Duration,
}

/// Allocate the array `0, 1, ..., length - 1`.
/// Role: fallible allocation so exhaustion surfaces as an error, not an abort.
pub fn build_array(length: usize) -> Result<Vec<Element>, SumError> {
    if length > 0 && Element::try_from(length - 1).is_err() {
        return Err(SumError::allocation("array", length));
    }

    let mut data = Vec::new();
    data.try_reserve_exact(length)
        .map_err(|_| SumError::allocation("array", length))?;
    data.extend((0..length).map(|i| i as Element));
    Ok(data)
}

/// Sum `data` with `worker_count` scoped threads.
pub fn compute_total(data: &[Element], worker_count: usize) -> Result<Accumulator, SumError> {
    let coordinator = Coordinator::new(Config::new(data.len(), worker_count))?;
    Ok(coordinator.compute_total(data)?.total)
}

pub struct Coordinator {
    config: Config,
}

impl Coordinator {
    pub fn new(config: Config) -> Result<Self, SumError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run on the executor selected by the configured backend.
    pub fn compute_total(&self, data: &[Element]) -> Result<SumReport, SumError> {
        let stack_size = self.config.stack_size;
        match self.config.backend {
            Backend::Threads => {
                let executor = ThreadExecutor::with_factory(OsThreads::with_stack_size(stack_size));
                self.compute_with(&executor, data)
            }
            Backend::Rayon => self.compute_with(&RayonExecutor::with_stack_size(stack_size), data),
        }
    }

    /// Partition, dispatch, collect and aggregate on `executor`.
    pub fn compute_with<E: Executor>(&self, executor: &E, data: &[Element]) -> Result<SumReport, SumError> {
        let started = Instant::now();

        let partitions = partition(data.len(), self.config.workers);
        debug_assert!(is_exact_cover(&partitions, data.len()));
        debug!(length = data.len(), workers = partitions.len(), "dispatching reduction units");

        let mut partials = executor.execute(data, &partitions, &partial_sum)?;
        partials.sort_by_key(|p| p.worker);
        ensure_complete(&partitions, &partials)?;

        let total = aggregate(&partials)?;
        let elapsed = started.elapsed();
        info!(total, length = data.len(), workers = partitions.len(), ?elapsed, "summation complete");

        Ok(SumReport {
            total,
            partials,
            elapsed,
        })
    }
}

/// Every partition must have exactly one result; a missing one is a worker
/// failure, never a zero.
fn ensure_complete(partitions: &[Partition], partials: &[PartialResult]) -> Result<(), SumError> {
    for pair in partitions.iter().zip_longest(partials) {
        match pair {
            EitherOrBoth::Both(expected, got) if got.partition == *expected => {}
            EitherOrBoth::Both(expected, _) | EitherOrBoth::Left(expected) => {
                return Err(SumError::worker(expected.worker, "no result returned"));
            }
            EitherOrBoth::Right(extra) => {
                return Err(SumError::worker(extra.worker, "result for an unknown partition"));
            }
        }
    }
    Ok(())
}

fn aggregate(partials: &[PartialResult]) -> Result<Accumulator, SumError> {
    partials
        .iter()
        .try_fold(0 as Accumulator, |acc, p| acc.checked_add(p.sum))
        .ok_or(SumError::Overflow)
}
