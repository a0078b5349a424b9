//! # Windowed Progress Reporting Module
//!
//! This module contains the reporting engine that observes a benchmark run
//! while it executes in the background. Every report interval it captures the
//! cumulative latency snapshot, derives the *incremental* window since the
//! previous report, classifies it as warmup or measured work, and emits one
//! formatted summary line. When the completion signal fires it emits a single
//! cumulative TOTAL line and stops.
//!
//! ## Windowing
//!
//! The recorder only ever grows, so each report window is computed as the
//! difference between two cumulative snapshots ([`window_between`]). The
//! resulting windows partition the run timeline: every window starts exactly
//! where the previous one ended, and the windowed sample counts sum to the
//! final TOTAL count.
//!
//! ## Known quirk: origin mismatch
//!
//! If the two compared snapshots do not share a start timestamp (the recorder
//! was reset between polls), no delta is computed and the raw cumulative
//! snapshot is reported as if it were a window. The report stream stays
//! comparable with histogram tooling that treats a reset as a new run origin,
//! at the cost of one report that may double-count samples. Kept deliberately.

use crate::recorder::{CompletionSignal, Snapshot};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Phase label attached to each progress line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Run is still inside the warmup interval
    Warmup,
    /// Warmup has elapsed; samples count toward the measured result
    Work,
    /// Final cumulative report, emitted exactly once
    Total,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Warmup => write!(f, "WARMUP"),
            Phase::Work => write!(f, "WORK"),
            Phase::Total => write!(f, "TOTAL"),
        }
    }
}

/// Source of cumulative snapshots and the warmup flag
///
/// Implemented by [`crate::recorder::LatencyRecorder`]; test code supplies
/// scripted sources.
pub trait SnapshotSource: Send + Sync {
    /// Capture the current cumulative snapshot
    fn capture(&self) -> Snapshot;

    /// Has the warmup interval elapsed?
    fn warmup_finished(&self) -> bool;
}

impl SnapshotSource for crate::recorder::LatencyRecorder {
    fn capture(&self) -> Snapshot {
        self.snapshot()
    }

    fn warmup_finished(&self) -> bool {
        // Inherent method of the same name.
        crate::recorder::LatencyRecorder::warmup_finished(self)
    }
}

/// Destination for formatted progress lines
pub trait ProgressSink: Send + Sync {
    fn log_progress(&self, line: &str);
}

/// Default sink: routes progress lines through `tracing` at INFO level
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn log_progress(&self, line: &str) {
        info!("{}", line);
    }
}

/// Compute the incremental window between two cumulative snapshots
///
/// Clones `current`, subtracts `previous`'s counts and advances the start
/// timestamp to `previous`'s end, yielding a snapshot that covers only the
/// samples recorded between the two captures. Neither input is mutated.
///
/// When the snapshots do not share a start timestamp, or the subtraction
/// fails because `previous` holds counts `current` lacks (a reset raced the
/// poll), the cumulative clone is returned unmodified (see module docs).
pub fn window_between(previous: &Snapshot, current: &Snapshot) -> Snapshot {
    let mut windowed = current.clone();

    if current.start_ms() == previous.start_ms() {
        match windowed.histogram_mut().subtract(previous.histogram()) {
            Ok(()) => windowed.set_start_ms(previous.end_ms()),
            Err(e) => {
                debug!("Skipping window subtraction: {}", e);
                return current.clone();
            }
        }
    }

    windowed
}

/// Format one progress line for a (windowed or cumulative) snapshot
///
/// Output: `<PHASE> ops/sec: <throughput>, latency: <mean> ms, 99% latency:
/// <p99> ms` with the phase right-aligned to 6 characters. Latencies are
/// converted from the recorder's nanoseconds to milliseconds. A zero-width
/// (or clock-skewed, negative-width) window reports throughput 0.00 rather
/// than dividing by zero.
pub fn report_line(phase: Phase, snapshot: &Snapshot) -> String {
    let window_ms = snapshot.end_ms().saturating_sub(snapshot.start_ms());
    let throughput = if window_ms == 0 {
        0.0
    } else {
        snapshot.total_count() as f64 / window_ms as f64 * 1000.0
    };
    let mean_ms = snapshot.mean_ns() / 1_000_000.0;
    let p99_ms = snapshot.value_at_percentile(99.0) as f64 / 1_000_000.0;

    format!(
        "{:>6} ops/sec: {:10.2}, latency: {:4.3} ms, 99% latency: {:4.3} ms",
        phase.to_string(),
        throughput,
        mean_ms,
        p99_ms
    )
}

/// Polling progress reporter
///
/// Runs on its own (blocking) thread or task, never on a thread performing
/// measured work. Each iteration blocks on the completion signal for one
/// report interval:
///
/// - timeout: capture the cumulative snapshot, emit the windowed report for
///   the interval just elapsed, retain the cumulative snapshot for the next
///   diff
/// - completion: capture a fresh full-run snapshot, emit one TOTAL report,
///   return
///
/// The reporter is best-effort observability: it never fails, and degenerate
/// input (no samples yet, zero-width window) produces a zero-valued line.
pub struct ProgressReporter<S: SnapshotSource, K: ProgressSink> {
    source: Arc<S>,
    sink: K,
    signal: Arc<CompletionSignal>,
    interval: Duration,
}

impl<S: SnapshotSource, K: ProgressSink> ProgressReporter<S, K> {
    pub fn new(source: Arc<S>, sink: K, signal: Arc<CompletionSignal>, interval: Duration) -> Self {
        Self {
            source,
            sink,
            signal,
            interval,
        }
    }

    /// Run the reporting loop until the completion signal fires
    ///
    /// Blocks the calling thread. Returns the number of lines emitted,
    /// which is always at least 1 (the TOTAL line).
    pub fn run(&self) -> usize {
        let mut emitted = 0;
        let mut last = self.source.capture();

        while !self.signal.await_completion(self.interval) {
            let phase = if self.source.warmup_finished() {
                Phase::Work
            } else {
                Phase::Warmup
            };

            let current = self.source.capture();
            let windowed = window_between(&last, &current);
            self.sink.log_progress(&report_line(phase, &windowed));
            emitted += 1;

            // Retain the cumulative snapshot, not the delta.
            last = current;
        }

        let total = self.source.capture();
        self.sink.log_progress(&report_line(Phase::Total, &total));
        emitted + 1
    }
}
