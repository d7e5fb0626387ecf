//! # Partial Sum
//!
//! Fork-join summation of an integer array: the array is split into
//! contiguous partitions, every partition is summed on its own worker and
//! the coordinator folds the partial sums into one total.
//!
//! ## Modules
//!
//! 1. **partition** - contiguous `[start, end)` ranges, remainder on the last worker
//! 2. **reduce** - the per-partition sum with a wide accumulator
//! 3. **executor** - scoped OS threads or a dedicated rayon pool
//! 4. **coordinator** - validate, partition, dispatch, collect, aggregate
//! 5. **config** / **error** / **app** - settings, failure taxonomy, output line
//!
//! ## Running
//!
//! ```bash
//! cargo run --bin partial_sum
//! # The total sum of the array is 499500
//! ```

pub mod app;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod partition;
pub mod reduce;

pub use config::{Backend, Config};
pub use coordinator::{build_array, compute_total, Coordinator, SumReport};
pub use error::SumError;
pub use executor::{Executor, OsThreads, RayonExecutor, ThreadExecutor, ThreadFactory};
pub use partition::{is_exact_cover, partition, Partition};
pub use reduce::{partial_sum, Accumulator, Element, PartialResult, ReduceError};
