//! # Perf Harness Library
//!
//! A performance-test execution harness implemented in Rust. It runs a
//! pluggable workload driver on concurrent worker threads for a configured
//! duration, records per-operation latency into a shared HDR histogram, and
//! reports progress while the run executes in the background.
//!
//! ## Progress reporting
//!
//! The distinguishing feature is *windowed* progress: instead of printing
//! cumulative numbers, the reporter diffs consecutive cumulative histogram
//! snapshots and prints throughput, mean latency and 99th-percentile latency
//! for just the most recent report interval, labeled `WARMUP` or `WORK`
//! depending on the run phase. One cumulative `TOTAL` line closes the run:
//!
//! ```text
//! WARMUP ops/sec:    9873.10, latency: 0.101 ms, 99% latency: 0.110 ms
//!   WORK ops/sec:    9990.45, latency: 0.100 ms, 99% latency: 0.108 ms
//!  TOTAL ops/sec:    9952.71, latency: 0.100 ms, 99% latency: 0.109 ms
//! ```
//!
//! ## Architecture Overview
//!
//! - `benchmark`: run orchestration (workers, reporter, artifact output)
//! - `cli`: command-line parsing and configuration
//! - `driver`: the `WorkloadDriver` trait and built-in synthetic drivers
//! - `recorder`: shared latency recorder, snapshots, completion signal
//! - `progress`: windowed snapshot diffing and the polling progress reporter
//! - `results`: summary JSON and histogram file output
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use perf_harness::{BenchmarkConfig, BenchmarkRunner, DriverKind};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BenchmarkConfig {
//!         driver: DriverKind::Spin,
//!         warmup: Duration::from_secs(5),
//!         duration: Duration::from_secs(30),
//!         threads: 4,
//!         report_interval: Duration::from_secs(10),
//!         op_cost: Duration::from_micros(100),
//!         output_dir: None,
//!     };
//!
//!     let summary = BenchmarkRunner::new(config).run().await?;
//!     println!("throughput: {:.2} ops/sec", summary.throughput_ops_per_sec);
//!     Ok(())
//! }
//! ```

pub mod benchmark;
pub mod cli;
pub mod driver;
pub mod logging;
pub mod progress;
pub mod recorder;
pub mod results;

pub use benchmark::{BenchmarkConfig, BenchmarkRunner};
pub use cli::{Args, DriverKind};
pub use driver::WorkloadDriver;
pub use progress::{window_between, Phase, ProgressReporter, ProgressSink, SnapshotSource};
pub use recorder::{CompletionSignal, LatencyRecorder, Snapshot};
pub use results::{ResultsWriter, RunSummary};

/// The current version of the harness
///
/// Populated from Cargo.toml and recorded in result output for
/// reproducibility.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
