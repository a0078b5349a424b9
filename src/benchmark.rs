//! # Benchmark Engine Module
//!
//! Orchestrates a complete run: driver setup, warmup plus measured execution
//! on worker threads, concurrent windowed progress reporting, and result
//! output.
//!
//! ## Execution lifecycle
//!
//! 1. **Setup**: the driver's one-time initialization runs on the runner
//! 2. **Execution**: N worker threads call the driver in a loop until the
//!    warmup + duration deadline, timing every operation into the shared
//!    latency recorder
//! 3. **Reporting**: a dedicated blocking task polls the completion signal
//!    and emits one windowed progress line per report interval, then the
//!    final TOTAL line (see [`crate::progress`])
//! 4. **Teardown**: workers join, the completion signal fires, the reporter
//!    drains, artifacts are written
//!
//! Worker threads are plain OS threads: the measured loop must never yield
//! to an async scheduler. Only orchestration is async.

use crate::{
    cli::{Args, DriverKind},
    driver::{NoopDriver, SleepDriver, SpinDriver, WorkloadDriver},
    progress::{ProgressReporter, TracingSink},
    recorder::{CompletionSignal, LatencyRecorder},
    results::{ResultsWriter, RunSummary},
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for benchmark execution
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Which workload driver to run
    pub driver: DriverKind,

    /// Warmup interval; samples recorded during it are reported but labeled
    /// WARMUP
    pub warmup: Duration,

    /// Measured run duration after warmup
    pub duration: Duration,

    /// Number of concurrent worker threads
    pub threads: usize,

    /// Interval between progress reports
    pub report_interval: Duration,

    /// Nominal per-operation cost for the built-in drivers
    pub op_cost: Duration,

    /// Where to write the summary and histogram (None: log only)
    pub output_dir: Option<PathBuf>,
}

impl BenchmarkConfig {
    /// Create benchmark configuration from CLI arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.duration.is_zero() {
            anyhow::bail!("Run duration must be greater than zero");
        }
        if args.threads == 0 {
            anyhow::bail!("Thread count must be greater than zero");
        }
        if args.report_interval.is_zero() {
            anyhow::bail!("Report interval must be greater than zero");
        }

        Ok(Self {
            driver: args.driver,
            warmup: args.warmup,
            duration: args.duration,
            threads: args.threads,
            report_interval: args.report_interval,
            op_cost: args.op_cost,
            output_dir: args.output_dir.clone(),
        })
    }

    fn build_driver(&self) -> Arc<dyn WorkloadDriver> {
        match self.driver {
            DriverKind::Spin => Arc::new(SpinDriver::new(self.op_cost)),
            DriverKind::Sleep => Arc::new(SleepDriver::new(self.op_cost)),
            DriverKind::Noop => Arc::new(NoopDriver),
        }
    }
}

/// Per-worker execution counters
#[derive(Debug, Default)]
struct WorkerStats {
    operations: u64,
    errors: u64,
}

/// Main benchmark execution engine
pub struct BenchmarkRunner {
    config: BenchmarkConfig,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkConfig) -> Self {
        Self { config }
    }

    /// Execute the benchmark to completion and return the run summary
    pub async fn run(&self) -> Result<RunSummary> {
        let config = &self.config;
        let driver = config.build_driver();

        info!(
            "Starting '{}' driver: {} threads, warmup {:?}, duration {:?}",
            driver.name(),
            config.threads,
            config.warmup,
            config.duration
        );

        driver.setup().context("Driver setup failed")?;

        let recorder = Arc::new(LatencyRecorder::new(config.warmup)?);
        let signal = Arc::new(CompletionSignal::new());
        let deadline = Instant::now() + config.warmup + config.duration;

        // Progress reporting runs for the whole lifetime of the workload on
        // its own blocking thread.
        let reporter = ProgressReporter::new(
            Arc::clone(&recorder),
            TracingSink,
            Arc::clone(&signal),
            config.report_interval,
        );
        let reporter_handle = tokio::task::spawn_blocking(move || reporter.run());

        // Spawn the measured workload on plain OS threads.
        let mut workers = Vec::with_capacity(config.threads);
        for worker_id in 0..config.threads {
            let driver = Arc::clone(&driver);
            let recorder = Arc::clone(&recorder);
            workers.push(
                thread::Builder::new()
                    .name(format!("bench-worker-{}", worker_id))
                    .spawn(move || run_worker(worker_id, driver, recorder, deadline))
                    .context("Failed to spawn worker thread")?,
            );
        }

        // Join workers off the async runtime, then release the reporter.
        let worker_results = tokio::task::spawn_blocking(move || {
            workers
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!("Worker thread panicked")),
                })
                .collect::<Vec<_>>()
        })
        .await?;
        signal.complete();

        let reports_emitted = reporter_handle.await?;
        debug!("Reporter emitted {} lines", reports_emitted);

        let mut total_errors = 0;
        for result in worker_results {
            let stats = result?;
            total_errors += stats.errors;
        }

        driver.teardown().context("Driver teardown failed")?;

        let final_snapshot = recorder.snapshot();
        let summary = RunSummary::from_snapshot(
            &final_snapshot,
            config.driver,
            config.threads,
            config.warmup,
            config.duration,
            total_errors,
        );

        if let Some(ref output_dir) = config.output_dir {
            let writer = ResultsWriter::new(output_dir)?;
            writer.write_summary(&summary)?;
            writer.write_histogram(&final_snapshot)?;
        }

        info!(
            "Run complete: {} operations, {} errors, {:.2} ops/sec",
            summary.total_operations, summary.error_count, summary.throughput_ops_per_sec
        );

        Ok(summary)
    }
}

/// Worker loop: execute and time driver operations until the deadline
///
/// Driver errors are counted and logged but do not stop the run; recorder
/// errors are fatal since they invalidate the measurement.
fn run_worker(
    worker_id: usize,
    driver: Arc<dyn WorkloadDriver>,
    recorder: Arc<LatencyRecorder>,
    deadline: Instant,
) -> Result<WorkerStats> {
    let mut stats = WorkerStats::default();

    while Instant::now() < deadline {
        let op_start = Instant::now();
        match driver.execute() {
            Ok(()) => {
                recorder.record(op_start.elapsed())?;
                stats.operations += 1;
            }
            Err(e) => {
                stats.errors += 1;
                warn!("Worker {}: operation failed: {}", worker_id, e);
            }
        }
    }

    debug!(
        "Worker {} finished: {} operations, {} errors",
        worker_id, stats.operations, stats.errors
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BenchmarkConfig {
        BenchmarkConfig {
            driver: DriverKind::Noop,
            warmup: Duration::from_millis(20),
            duration: Duration::from_millis(80),
            threads: 2,
            report_interval: Duration::from_millis(25),
            op_cost: Duration::from_micros(50),
            output_dir: None,
        }
    }

    #[tokio::test]
    async fn test_run_records_operations() {
        let runner = BenchmarkRunner::new(test_config());
        let summary = runner.run().await.unwrap();

        assert!(summary.total_operations > 0);
        assert_eq!(summary.error_count, 0);
        assert!(summary.throughput_ops_per_sec > 0.0);
    }

    #[tokio::test]
    async fn test_failing_driver_is_counted_not_fatal() {
        struct FailingDriver;

        impl WorkloadDriver for FailingDriver {
            fn name(&self) -> &str {
                "failing"
            }

            fn execute(&self) -> Result<()> {
                // Fail every operation; slow the loop down so the log does
                // not flood.
                thread::sleep(Duration::from_millis(1));
                Err(anyhow::anyhow!("injected failure"))
            }
        }

        let recorder = Arc::new(LatencyRecorder::new(Duration::ZERO).unwrap());
        let deadline = Instant::now() + Duration::from_millis(20);
        let stats = run_worker(0, Arc::new(FailingDriver), recorder.clone(), deadline).unwrap();

        assert_eq!(stats.operations, 0);
        assert!(stats.errors > 0);
        assert_eq!(recorder.snapshot().total_count(), 0);
    }

    #[test]
    fn test_config_validation() {
        use clap::Parser;

        let args = Args::parse_from(["perf-harness", "--duration", "0s"]);
        assert!(BenchmarkConfig::from_args(&args).is_err());

        let args = Args::parse_from(["perf-harness", "--threads", "0"]);
        assert!(BenchmarkConfig::from_args(&args).is_err());

        let args = Args::parse_from(["perf-harness", "-d", "5s", "-t", "2"]);
        let config = BenchmarkConfig::from_args(&args).unwrap();
        assert_eq!(config.threads, 2);
        assert_eq!(config.duration, Duration::from_secs(5));
    }
}
