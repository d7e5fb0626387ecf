//! Dispatch and collect: run one reduction unit per partition and bring the
//! partial results back to the coordinator.

use crate::error::SumError;
use crate::partition::Partition;
use crate::reduce::{Element, PartialResult, ReduceError};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, ScopedJoinHandle};
use tracing::{debug, error};

/// Runs `reduce` once per partition and returns every partial result, or
/// the first failure once all started units have finished.
pub trait Executor {
    fn execute<R>(
        &self,
        data: &[Element],
        partitions: &[Partition],
        reduce: &R,
    ) -> Result<Vec<PartialResult>, SumError>
    where
        R: Fn(&[Element], Partition) -> Result<PartialResult, ReduceError> + Sync;
}

// =============================================================================
// Scoped OS threads
// =============================================================================

/// Produces the thread builder for each worker. Returning an error makes
/// that launch fail, as if the OS refused to create the thread.
pub trait ThreadFactory: Sync {
    fn builder(&self, worker: usize) -> io::Result<thread::Builder>;
}

/// Named OS threads with an optional stack size.
#[derive(Debug, Clone, Default)]
pub struct OsThreads {
    stack_size: Option<usize>,
}

impl OsThreads {
    pub fn with_stack_size(stack_size: Option<usize>) -> Self {
        Self { stack_size }
    }
}

impl ThreadFactory for OsThreads {
    fn builder(&self, worker: usize) -> io::Result<thread::Builder> {
        let builder = thread::Builder::new().name(worker_name(worker));
        Ok(match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        })
    }
}

/// Fork-join over `std::thread::scope`: the shared array is borrowed, never
/// copied, and the scope guarantees every unit is joined before returning.
#[derive(Debug, Clone, Default)]
pub struct ThreadExecutor<F = OsThreads> {
    factory: F,
}

impl ThreadExecutor<OsThreads> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: ThreadFactory> ThreadExecutor<F> {
    pub fn with_factory(factory: F) -> Self {
        Self { factory }
    }
}

impl<F: ThreadFactory> Executor for ThreadExecutor<F> {
    fn execute<R>(
        &self,
        data: &[Element],
        partitions: &[Partition],
        reduce: &R,
    ) -> Result<Vec<PartialResult>, SumError>
    where
        R: Fn(&[Element], Partition) -> Result<PartialResult, ReduceError> + Sync,
    {
        thread::scope(|s| {
            let mut handles = Vec::new();
            handles
                .try_reserve_exact(partitions.len())
                .map_err(|_| SumError::allocation("worker handles", partitions.len()))?;

            let mut launch_failure = None;
            for &partition in partitions {
                let spawned = self.factory.builder(partition.worker).and_then(|builder| {
                    builder.spawn_scoped(s, move || {
                        debug!(worker = partition.worker, %partition, "reduction unit started");
                        reduce(data, partition)
                    })
                });

                match spawned {
                    Ok(handle) => handles.push((partition.worker, handle)),
                    Err(source) => {
                        error!(worker = partition.worker, %source, "failed to launch reduction unit");
                        launch_failure = Some(SumError::Launch {
                            worker: partition.worker,
                            source,
                        });
                        break;
                    }
                }
            }

            // Units already running cannot be cancelled; join them even when
            // the launch phase failed.
            let collected = join_all(handles);
            match launch_failure {
                Some(err) => Err(err),
                None => collected,
            }
        })
    }
}

fn join_all(
    handles: Vec<(usize, ScopedJoinHandle<'_, Result<PartialResult, ReduceError>>)>,
) -> Result<Vec<PartialResult>, SumError> {
    let mut results = Vec::new();
    results
        .try_reserve_exact(handles.len())
        .map_err(|_| SumError::allocation("partial results", handles.len()))?;

    let mut failure = None;
    for (worker, handle) in handles {
        let outcome = match handle.join() {
            Ok(Ok(result)) => {
                debug!(worker, sum = result.sum, "reduction unit finished");
                results.push(result);
                continue;
            }
            Ok(Err(err)) => SumError::worker(worker, err.to_string()),
            Err(payload) => SumError::worker(worker, panic_message(payload.as_ref())),
        };
        error!(worker, %outcome, "reduction unit failed");
        if failure.is_none() {
            failure = Some(outcome);
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(results),
    }
}

// =============================================================================
// Dedicated rayon pool
// =============================================================================

/// One rayon task per partition on a pool sized to the partition count.
#[derive(Debug, Clone, Default)]
pub struct RayonExecutor {
    stack_size: Option<usize>,
}

impl RayonExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_size(stack_size: Option<usize>) -> Self {
        Self { stack_size }
    }
}

impl Executor for RayonExecutor {
    fn execute<R>(
        &self,
        data: &[Element],
        partitions: &[Partition],
        reduce: &R,
    ) -> Result<Vec<PartialResult>, SumError>
    where
        R: Fn(&[Element], Partition) -> Result<PartialResult, ReduceError> + Sync,
    {
        if partitions.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = ThreadPoolBuilder::new()
            .num_threads(partitions.len())
            .thread_name(worker_name);
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        let pool = builder.build().map_err(|err| {
            error!(%err, "failed to build rayon pool");
            SumError::Launch {
                worker: 0,
                source: io::Error::other(err.to_string()),
            }
        })?;

        pool.install(|| {
            partitions
                .par_iter()
                .with_max_len(1)
                .map(|&partition| {
                    debug!(worker = partition.worker, %partition, "reduction unit started");
                    let failure = match panic::catch_unwind(AssertUnwindSafe(|| reduce(data, partition))) {
                        Ok(Ok(result)) => {
                            debug!(worker = partition.worker, sum = result.sum, "reduction unit finished");
                            return Ok(result);
                        }
                        Ok(Err(err)) => SumError::worker(partition.worker, err.to_string()),
                        Err(payload) => SumError::worker(partition.worker, panic_message(payload.as_ref())),
                    };
                    error!(worker = partition.worker, %failure, "reduction unit failed");
                    Err(failure)
                })
                .collect::<Result<Vec<_>, _>>()
        })
    }
}

fn worker_name(worker: usize) -> String {
    format!("partial-sum-{worker}")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use crate::reduce::partial_sum;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Refuses to build a thread for one worker id.
    struct RefuseWorker {
        refused: usize,
        built: AtomicUsize,
    }

    impl RefuseWorker {
        fn new(refused: usize) -> Self {
            Self {
                refused,
                built: AtomicUsize::new(0),
            }
        }
    }

    impl ThreadFactory for RefuseWorker {
        fn builder(&self, worker: usize) -> io::Result<thread::Builder> {
            if worker == self.refused {
                return Err(io::Error::new(io::ErrorKind::OutOfMemory, "simulated exhaustion"));
            }
            self.built.fetch_add(1, Ordering::SeqCst);
            OsThreads::default().builder(worker)
        }
    }

    fn data(len: usize) -> Vec<Element> {
        (0..len as Element).collect()
    }

    fn total(results: &[PartialResult]) -> i64 {
        results.iter().map(|r| r.sum).sum()
    }

    #[test]
    fn test_threads_one_result_per_partition() {
        let data = data(1000);
        let parts = partition(data.len(), 4);
        let results = ThreadExecutor::new().execute(&data, &parts, &partial_sum).unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results.iter().map(|r| r.worker).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(total(&results), 499_500);
    }

    #[test]
    fn test_threads_are_named_per_worker() {
        let data = data(8);
        let parts = partition(data.len(), 2);
        let names = std::sync::Mutex::new(Vec::new());

        ThreadExecutor::new()
            .execute(&data, &parts, &|d: &[Element], p: Partition| {
                names
                    .lock()
                    .unwrap()
                    .push(thread::current().name().map(str::to_string));
                partial_sum(d, p)
            })
            .unwrap();

        let mut names = names.into_inner().unwrap();
        names.sort();
        assert_eq!(
            names,
            vec![Some("partial-sum-0".to_string()), Some("partial-sum-1".to_string())]
        );
    }

    #[test]
    fn test_launch_failure_joins_started_units() {
        let data = data(100);
        let parts = partition(data.len(), 4);
        let finished = AtomicUsize::new(0);
        let factory = RefuseWorker::new(2);

        let err = ThreadExecutor::with_factory(factory)
            .execute(&data, &parts, &|d: &[Element], p: Partition| {
                let result = partial_sum(d, p);
                finished.fetch_add(1, Ordering::SeqCst);
                result
            })
            .unwrap_err();

        assert!(matches!(err, SumError::Launch { worker: 2, .. }));
        // Workers 0 and 1 were started and have been joined by now.
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_launch_failure_on_first_worker() {
        let data = data(10);
        let parts = partition(data.len(), 3);
        let factory = RefuseWorker::new(0);

        let executor = ThreadExecutor::with_factory(factory);
        let err = executor.execute(&data, &parts, &partial_sum).unwrap_err();

        assert!(err.is_launch_failure());
        assert_eq!(executor.factory.built.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_threads_panicking_unit_is_worker_failure() {
        let data = data(100);
        let parts = partition(data.len(), 4);

        let err = ThreadExecutor::new()
            .execute(&data, &parts, &|d: &[Element], p: Partition| {
                if p.worker == 1 {
                    panic!("boom");
                }
                partial_sum(d, p)
            })
            .unwrap_err();

        match err {
            SumError::Worker { worker, reason } => {
                assert_eq!(worker, 1);
                assert!(reason.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_threads_reduce_error_is_worker_failure() {
        let data = data(10);
        let parts = vec![Partition::new(0, 0, 5), Partition::new(1, 5, 20)];

        let err = ThreadExecutor::new().execute(&data, &parts, &partial_sum).unwrap_err();
        assert!(matches!(err, SumError::Worker { worker: 1, .. }));
    }

    #[test]
    fn test_rayon_matches_threads() {
        let data = data(12_345);
        let parts = partition(data.len(), 7);

        let threads = ThreadExecutor::new().execute(&data, &parts, &partial_sum).unwrap();
        let rayon = RayonExecutor::new().execute(&data, &parts, &partial_sum).unwrap();

        assert_eq!(threads, rayon);
    }

    #[test]
    fn test_rayon_panicking_unit_is_worker_failure() {
        let data = data(100);
        let parts = partition(data.len(), 4);

        let err = RayonExecutor::new()
            .execute(&data, &parts, &|d: &[Element], p: Partition| {
                if p.worker == 3 {
                    panic!("rayon boom");
                }
                partial_sum(d, p)
            })
            .unwrap_err();

        assert!(err.is_worker_failure());
        assert!(err.to_string().contains("rayon boom"));
    }

    #[test]
    fn test_rayon_empty_plan() {
        let results = RayonExecutor::new().execute(&[], &[], &partial_sum).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(&"static"), "panicked: static");
        assert_eq!(panic_message(&"owned".to_string()), "panicked: owned");
        assert_eq!(panic_message(&42u8), "panicked");
    }
}
