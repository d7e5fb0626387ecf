//! The command-line surface: one result line on success, nothing on failure.

use crate::config::Config;
use crate::coordinator::{build_array, Coordinator};
use crate::error::SumError;
use crate::executor::Executor;
use crate::reduce::Accumulator;
use std::io::Write;

/// Build the array described by `config`, sum it on the configured backend
/// and write the result line to `out`.
pub fn run<W: Write>(config: &Config, out: &mut W) -> Result<Accumulator, SumError> {
    let coordinator = Coordinator::new(config.clone())?;
    let data = build_array(config.length)?;
    let report = coordinator.compute_total(&data)?;
    report_total(out, report.total)
}

/// Same as [`run`] on an explicit executor.
pub fn run_with<E: Executor, W: Write>(
    config: &Config,
    executor: &E,
    out: &mut W,
) -> Result<Accumulator, SumError> {
    let coordinator = Coordinator::new(config.clone())?;
    let data = build_array(config.length)?;
    let report = coordinator.compute_with(executor, &data)?;
    report_total(out, report.total)
}

fn report_total<W: Write>(out: &mut W, total: Accumulator) -> Result<Accumulator, SumError> {
    writeln!(out, "The total sum of the array is {total}")
        .map_err(SumError::Output)?;
    Ok(total)
}
