//! Work partitioning: one contiguous half-open range per worker.

use itertools::Itertools;
use std::fmt;
use std::ops::Range;

/// Half-open index range `[start, end)` assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    pub worker: usize,
    pub start: usize,
    pub end: usize,
}

impl Partition {
    pub fn new(worker: usize, start: usize, end: usize) -> Self {
        Self { worker, start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Split `length` elements into exactly `worker_count` contiguous partitions.
/// Role: every worker gets `length / worker_count` elements, the last one
/// also takes the remainder. When `length < worker_count` the leading
/// partitions are empty.
pub fn partition(length: usize, worker_count: usize) -> Vec<Partition> {
    if worker_count == 0 {
        return Vec::new();
    }

    let chunk = length / worker_count;
    let last = worker_count - 1;

    (0..worker_count)
        .map(|worker| {
            let start = worker * chunk;
            let end = if worker == last { length } else { start + chunk };
            Partition::new(worker, start, end)
        })
        .collect()
}

/// True when `partitions` are ordered, gap-free, non-overlapping and cover
/// exactly `[0, length)`.
pub fn is_exact_cover(partitions: &[Partition], length: usize) -> bool {
    let (Some(first), Some(last)) = (partitions.first(), partitions.last()) else {
        return length == 0;
    };

    first.start == 0
        && last.end == length
        && partitions.iter().all(|p| p.start <= p.end)
        && partitions
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.end == b.start && a.worker + 1 == b.worker)
}
