//! # Perf Harness - Main Entry Point
//!
//! Command-line front end for the benchmark harness. The flow is:
//!
//! 1. Initialize logging (console, plus a file log when an output directory
//!    is configured)
//! 2. Parse arguments and build the benchmark configuration
//! 3. Run the benchmark; the windowed progress reporter prints one line per
//!    report interval while the workload executes
//! 4. Log the final summary and, when configured, where artifacts went

use anyhow::Result;
use clap::Parser;
use perf_harness::{
    benchmark::{BenchmarkConfig, BenchmarkRunner},
    cli::Args,
    logging,
};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The guard must outlive the run or buffered file-log lines are lost.
    let _log_guard = logging::init(args.verbose, args.output_dir.as_deref())?;

    debug!("Configuration: {:?}", args);

    let config = BenchmarkConfig::from_args(&args)?;
    let runner = BenchmarkRunner::new(config);
    let summary = runner.run().await?;

    info!(
        "Mean latency: {:.3} ms, 99% latency: {:.3} ms over {} operations",
        summary.mean_latency_ns / 1_000_000.0,
        summary.p99_latency_ns as f64 / 1_000_000.0,
        summary.total_operations
    );
    if let Some(ref output_dir) = args.output_dir {
        info!("Artifacts written to: {:?}", output_dir);
    }

    Ok(())
}
