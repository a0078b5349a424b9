//! # Result Output Module
//!
//! Turns the final cumulative snapshot into persistent artifacts:
//!
//! - `summary.json`: headline statistics plus the configuration and system
//!   information needed to reproduce the run
//! - `latency.hgrm`: the full latency histogram in HdrHistogram V2 format,
//!   readable by standard histogram plotting tools

use crate::cli::DriverKind;
use crate::recorder::Snapshot;
use anyhow::{Context, Result};
use hdrhistogram::serialization::{Serializer, V2Serializer};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Name of the JSON summary written into the output directory
pub const SUMMARY_FILE: &str = "summary.json";

/// Name of the serialized histogram written into the output directory
pub const HISTOGRAM_FILE: &str = "latency.hgrm";

/// Headline result of one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub driver: DriverKind,
    pub threads: usize,
    pub warmup: Duration,
    pub duration: Duration,
    pub total_operations: u64,
    pub error_count: u64,
    pub throughput_ops_per_sec: f64,
    pub mean_latency_ns: f64,
    pub min_latency_ns: u64,
    pub max_latency_ns: u64,
    pub p50_latency_ns: u64,
    pub p95_latency_ns: u64,
    pub p99_latency_ns: u64,
    pub p999_latency_ns: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub system_info: SystemInfo,
}

impl RunSummary {
    /// Build a summary from the final cumulative snapshot
    pub fn from_snapshot(
        snapshot: &Snapshot,
        driver: DriverKind,
        threads: usize,
        warmup: Duration,
        duration: Duration,
        error_count: u64,
    ) -> Self {
        let elapsed_ms = snapshot.end_ms().saturating_sub(snapshot.start_ms());
        let throughput = if elapsed_ms == 0 {
            0.0
        } else {
            snapshot.total_count() as f64 / elapsed_ms as f64 * 1000.0
        };

        Self {
            driver,
            threads,
            warmup,
            duration,
            total_operations: snapshot.total_count(),
            error_count,
            throughput_ops_per_sec: throughput,
            mean_latency_ns: snapshot.mean_ns(),
            min_latency_ns: snapshot.min_ns(),
            max_latency_ns: snapshot.max_ns(),
            p50_latency_ns: snapshot.value_at_percentile(50.0),
            p95_latency_ns: snapshot.value_at_percentile(95.0),
            p99_latency_ns: snapshot.value_at_percentile(99.0),
            p999_latency_ns: snapshot.value_at_percentile(99.9),
            timestamp: chrono::Utc::now(),
            system_info: SystemInfo::collect(),
        }
    }
}

/// System information for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub architecture: String,
    pub cpu_cores: usize,
    pub harness_version: String,
}

impl SystemInfo {
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu_cores: num_cpus::get(),
            harness_version: crate::VERSION.to_string(),
        }
    }
}

/// Writes run artifacts into the configured output directory
pub struct ResultsWriter {
    output_dir: PathBuf,
}

impl ResultsWriter {
    /// Create a writer, creating the output directory if needed
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Write the JSON summary, returning its path
    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf> {
        let path = self.output_dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write summary to {:?}", path))?;

        info!("Summary written to: {:?}", path);
        Ok(path)
    }

    /// Write the full-run histogram in V2 format, returning its path
    pub fn write_histogram(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let path = self.output_dir.join(HISTOGRAM_FILE);
        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create histogram file {:?}", path))?;

        V2Serializer::new()
            .serialize(snapshot.histogram(), &mut file)
            .context("Failed to serialize latency histogram")?;

        info!("Histogram written to: {:?}", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrhistogram::Histogram;

    fn sample_snapshot() -> Snapshot {
        let mut histogram = Histogram::<u64>::new(3).unwrap();
        for _ in 0..100 {
            histogram.record(1_000_000).unwrap();
        }
        Snapshot::from_parts(0, 10_000, histogram)
    }

    #[test]
    fn test_summary_from_snapshot() {
        let summary = RunSummary::from_snapshot(
            &sample_snapshot(),
            DriverKind::Noop,
            4,
            Duration::from_secs(1),
            Duration::from_secs(9),
            0,
        );

        assert_eq!(summary.total_operations, 100);
        assert!((summary.throughput_ops_per_sec - 10.0).abs() < 0.01);
        assert!(summary.p99_latency_ns >= 990_000);
        assert_eq!(summary.system_info.cpu_cores, num_cpus::get());
    }

    #[test]
    fn test_summary_zero_elapsed_guards_throughput() {
        let snapshot = Snapshot::from_parts(5_000, 5_000, Histogram::<u64>::new(3).unwrap());
        let summary = RunSummary::from_snapshot(
            &snapshot,
            DriverKind::Noop,
            1,
            Duration::ZERO,
            Duration::ZERO,
            0,
        );
        assert_eq!(summary.throughput_ops_per_sec, 0.0);
    }

    #[test]
    fn test_writer_produces_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultsWriter::new(dir.path()).unwrap();
        let snapshot = sample_snapshot();

        let summary = RunSummary::from_snapshot(
            &snapshot,
            DriverKind::Spin,
            2,
            Duration::from_secs(1),
            Duration::from_secs(2),
            0,
        );
        let summary_path = writer.write_summary(&summary).unwrap();
        let histogram_path = writer.write_histogram(&snapshot).unwrap();

        let parsed: RunSummary =
            serde_json::from_str(&std::fs::read_to_string(summary_path).unwrap()).unwrap();
        assert_eq!(parsed.total_operations, 100);
        assert!(histogram_path.metadata().unwrap().len() > 0);
    }
}
