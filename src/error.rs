use std::io;
use thiserror::Error;

/// Everything that can stop a summation. None of these are retried.
#[derive(Error, Debug)]
pub enum SumError {
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("failed to allocate {what} ({requested} elements)")]
    Allocation { what: &'static str, requested: usize },

    #[error("failed to launch worker {worker}: {source}")]
    Launch {
        worker: usize,
        #[source]
        source: io::Error,
    },

    #[error("worker {worker} failed: {reason}")]
    Worker { worker: usize, reason: String },

    #[error("total overflowed the accumulator")]
    Overflow,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to write result: {0}")]
    Output(#[source] io::Error),
}

impl SumError {
    pub fn allocation(what: &'static str, requested: usize) -> Self {
        Self::Allocation { what, requested }
    }

    pub fn worker(worker: usize, reason: impl Into<String>) -> Self {
        Self::Worker {
            worker,
            reason: reason.into(),
        }
    }

    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::Allocation { .. })
    }

    pub fn is_launch_failure(&self) -> bool {
        matches!(self, Self::Launch { .. })
    }

    pub fn is_worker_failure(&self) -> bool {
        matches!(self, Self::Worker { .. })
    }
}

impl From<toml::de::Error> for SumError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
