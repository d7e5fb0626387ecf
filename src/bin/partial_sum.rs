//! Sum the array 0..1000 on four workers.
//!
//! Run with: cargo run --bin partial_sum

use partial_sum::{app, Config};
use std::io;
use std::process::ExitCode;
use tracing::Level;

fn main() -> ExitCode {
    // Diagnostics go to stderr so stdout only carries the result line.
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout().lock();
    match app::run(&Config::default(), &mut stdout) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
