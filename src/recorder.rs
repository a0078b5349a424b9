//! # Latency Recording Module
//!
//! Shared-state primitives that the benchmark workers and the progress
//! reporter communicate through:
//!
//! - **Snapshot**: an immutable, cumulative view of everything recorded
//!   between the run origin and the moment of capture
//! - **LatencyRecorder**: the thread-safe HDR histogram that driver threads
//!   record into while the reporter snapshots it concurrently
//! - **CompletionSignal**: a boolean, timeout-bounded wait primitive the
//!   reporter polls to detect the end of the run
//!
//! Snapshot capture clones the histogram under a single lock, so a snapshot
//! is always internally consistent even while workers keep recording.

use anyhow::Result;
use hdrhistogram::Histogram;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Significant figures for latency histograms, matching the precision used
/// for all latency measurement in this crate.
const HISTOGRAM_SIGFIG: u8 = 3;

/// Current wall-clock time in milliseconds since the Unix epoch
fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Immutable cumulative view of the recorded latency distribution
///
/// A snapshot carries the run-origin timestamp (`start_ms`), the capture
/// timestamp (`end_ms`), and a private copy of the histogram. It is never
/// mutated after creation; windowing produces a *new* snapshot instead
/// (see [`crate::progress::window_between`]).
#[derive(Clone)]
pub struct Snapshot {
    start_ms: u64,
    end_ms: u64,
    histogram: Histogram<u64>,
}

impl Snapshot {
    /// Assemble a snapshot from raw parts
    ///
    /// Exposed so callers composing their own [`crate::progress::SnapshotSource`]
    /// (and tests) can build snapshots without a live recorder.
    pub fn from_parts(start_ms: u64, end_ms: u64, histogram: Histogram<u64>) -> Self {
        Self {
            start_ms,
            end_ms,
            histogram,
        }
    }

    /// Timestamp of the run origin (epoch milliseconds)
    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    /// Timestamp of capture (epoch milliseconds)
    pub fn end_ms(&self) -> u64 {
        self.end_ms
    }

    /// Number of samples covered by this snapshot
    pub fn total_count(&self) -> u64 {
        self.histogram.len()
    }

    /// Mean recorded latency in nanoseconds (0.0 when empty)
    pub fn mean_ns(&self) -> f64 {
        self.histogram.mean()
    }

    /// Latency value in nanoseconds at the given percentile (0 when empty)
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        self.histogram.value_at_percentile(percentile)
    }

    /// Minimum recorded latency in nanoseconds
    pub fn min_ns(&self) -> u64 {
        self.histogram.min()
    }

    /// Maximum recorded latency in nanoseconds
    pub fn max_ns(&self) -> u64 {
        self.histogram.max()
    }

    /// Access the underlying histogram (serialization, windowing)
    pub fn histogram(&self) -> &Histogram<u64> {
        &self.histogram
    }

    pub(crate) fn histogram_mut(&mut self) -> &mut Histogram<u64> {
        &mut self.histogram
    }

    pub(crate) fn set_start_ms(&mut self, start_ms: u64) {
        self.start_ms = start_ms;
    }
}

/// State guarded by a single lock so snapshots see histogram and origin
/// timestamp consistently.
struct RecorderInner {
    histogram: Histogram<u64>,
    origin_ms: u64,
}

/// Thread-safe cumulative latency recorder backed by an HDR histogram
///
/// Driver threads call [`record`](Self::record) concurrently; the progress
/// reporter calls [`snapshot`](Self::snapshot) at its own cadence. Both go
/// through one short-lived `parking_lot` mutex. The recorder also owns the
/// warmup clock: [`warmup_finished`](Self::warmup_finished) compares elapsed
/// wall time against the configured warmup duration.
pub struct LatencyRecorder {
    inner: Mutex<RecorderInner>,
    started: Instant,
    warmup: Duration,
}

impl LatencyRecorder {
    /// Create a recorder with an auto-resizing 3-significant-figure histogram
    pub fn new(warmup: Duration) -> Result<Self> {
        let histogram = Histogram::<u64>::new(HISTOGRAM_SIGFIG)?;

        Ok(Self {
            inner: Mutex::new(RecorderInner {
                histogram,
                origin_ms: now_ms(),
            }),
            started: Instant::now(),
            warmup,
        })
    }

    /// Record one operation latency
    pub fn record(&self, latency: Duration) -> Result<()> {
        // The histogram cannot represent 0; clamp to the lowest trackable value.
        let latency_ns = (latency.as_nanos() as u64).max(1);
        self.inner.lock().histogram.record(latency_ns)?;
        Ok(())
    }

    /// Capture an atomic cumulative snapshot
    ///
    /// Safe to call at any time, including before the first sample; an empty
    /// snapshot reports count 0, mean 0.0 and percentile 0.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock();
        Snapshot {
            start_ms: inner.origin_ms,
            end_ms: now_ms(),
            histogram: inner.histogram.clone(),
        }
    }

    /// Clear all recorded samples and move the run origin to now
    ///
    /// Snapshots taken before and after a reset no longer share a start
    /// timestamp, which is what drives the cumulative-report fallback in
    /// [`crate::progress::window_between`].
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.histogram.reset();
        inner.origin_ms = now_ms();
    }

    /// Has the configured warmup interval elapsed?
    pub fn warmup_finished(&self) -> bool {
        self.started.elapsed() >= self.warmup
    }
}

/// Boolean completion flag with a timeout-bounded wait
///
/// The runner calls [`complete`](Self::complete) once, after all worker
/// threads have joined. The reporter blocks on
/// [`await_completion`](Self::await_completion) with its report interval as
/// the timeout; a `false` return means "interval elapsed, emit a windowed
/// report", a `true` return means "run is over, emit the TOTAL report".
pub struct CompletionSignal {
    done: Mutex<bool>,
    cvar: Condvar,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self {
            done: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    /// Mark the run as finished and wake all waiters
    pub fn complete(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.cvar.notify_all();
    }

    /// Block until the signal fires or `timeout` elapses
    ///
    /// Returns `true` iff the run completed within the timeout. Spurious
    /// wakeups are absorbed by waiting against an absolute deadline.
    pub fn await_completion(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut done = self.done.lock();
        while !*done {
            if self.cvar.wait_until(&mut done, deadline).timed_out() {
                break;
            }
        }
        *done
    }

    /// Non-blocking query of the completion flag
    pub fn is_complete(&self) -> bool {
        *self.done.lock()
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_record_and_snapshot() {
        let recorder = LatencyRecorder::new(Duration::ZERO).unwrap();

        recorder.record(Duration::from_millis(1)).unwrap();
        recorder.record(Duration::from_millis(2)).unwrap();
        recorder.record(Duration::from_millis(3)).unwrap();

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.total_count(), 3);
        assert!(snapshot.mean_ns() > 0.0);
        assert!(snapshot.end_ms() >= snapshot.start_ms());
    }

    #[test]
    fn test_empty_snapshot_is_safe() {
        let recorder = LatencyRecorder::new(Duration::ZERO).unwrap();
        let snapshot = recorder.snapshot();

        assert_eq!(snapshot.total_count(), 0);
        assert_eq!(snapshot.mean_ns(), 0.0);
        assert_eq!(snapshot.value_at_percentile(99.0), 0);
    }

    #[test]
    fn test_zero_latency_is_clamped() {
        let recorder = LatencyRecorder::new(Duration::ZERO).unwrap();
        recorder.record(Duration::ZERO).unwrap();
        assert_eq!(recorder.snapshot().total_count(), 1);
    }

    #[test]
    fn test_snapshots_share_origin_until_reset() {
        let recorder = LatencyRecorder::new(Duration::ZERO).unwrap();

        let first = recorder.snapshot();
        let second = recorder.snapshot();
        assert_eq!(first.start_ms(), second.start_ms());

        thread::sleep(Duration::from_millis(5));
        recorder.reset();
        let third = recorder.snapshot();
        assert!(third.start_ms() > first.start_ms());
        assert_eq!(third.total_count(), 0);
    }

    #[test]
    fn test_warmup_clock() {
        let warm = LatencyRecorder::new(Duration::ZERO).unwrap();
        assert!(warm.warmup_finished());

        let cold = LatencyRecorder::new(Duration::from_secs(3600)).unwrap();
        assert!(!cold.warmup_finished());
    }

    #[test]
    fn test_concurrent_recording() {
        let recorder = Arc::new(LatencyRecorder::new(Duration::ZERO).unwrap());
        let mut handles = Vec::new();

        for _ in 0..4 {
            let recorder = Arc::clone(&recorder);
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    recorder.record(Duration::from_micros(100)).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(recorder.snapshot().total_count(), 1000);
    }

    #[test]
    fn test_completion_signal_times_out() {
        let signal = CompletionSignal::new();
        assert!(!signal.await_completion(Duration::from_millis(10)));
        assert!(!signal.is_complete());
    }

    #[test]
    fn test_completion_signal_fires() {
        let signal = Arc::new(CompletionSignal::new());

        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.await_completion(Duration::from_secs(30)))
        };
        thread::sleep(Duration::from_millis(20));
        signal.complete();

        assert!(waiter.join().unwrap());
        assert!(signal.is_complete());
        // A completed signal returns immediately on subsequent waits.
        assert!(signal.await_completion(Duration::ZERO));
    }
}
