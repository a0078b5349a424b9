//! # Workload Driver Module
//!
//! The unit of work the harness measures. A driver exposes one operation;
//! worker threads call [`WorkloadDriver::execute`] in a tight loop and the
//! harness times each call. Drivers must be callable concurrently from
//! multiple threads.
//!
//! The built-in drivers produce synthetic load with a configurable
//! per-operation cost, which is enough to exercise and validate the harness
//! itself. Real workloads implement the same trait.

use anyhow::Result;
use rand::Rng;
use std::time::{Duration, Instant};

/// A benchmarkable workload
///
/// `setup` and `teardown` run once per benchmark, on the runner, outside the
/// measured interval. `execute` performs exactly one operation and is called
/// concurrently from every worker thread.
pub trait WorkloadDriver: Send + Sync {
    /// Human-readable driver name for logs and the result summary
    fn name(&self) -> &str;

    /// One-time initialization before any worker starts
    fn setup(&self) -> Result<()> {
        Ok(())
    }

    /// Perform a single operation
    fn execute(&self) -> Result<()>;

    /// One-time cleanup after all workers have stopped
    fn teardown(&self) -> Result<()> {
        Ok(())
    }
}

/// Fraction of the nominal op cost used as random jitter by [`SpinDriver`]
const SPIN_JITTER_FRACTION: f64 = 0.1;

/// CPU-bound driver: busy-waits for the configured op cost
///
/// A small random jitter (±10%) keeps the latency distribution from
/// collapsing into a single histogram bucket.
pub struct SpinDriver {
    op_cost: Duration,
}

impl SpinDriver {
    pub fn new(op_cost: Duration) -> Self {
        Self { op_cost }
    }
}

impl WorkloadDriver for SpinDriver {
    fn name(&self) -> &str {
        "spin"
    }

    fn execute(&self) -> Result<()> {
        let jitter_ns = (self.op_cost.as_nanos() as f64 * SPIN_JITTER_FRACTION) as i64;
        let offset = if jitter_ns > 0 {
            rand::thread_rng().gen_range(-jitter_ns..=jitter_ns)
        } else {
            0
        };
        let target = if offset >= 0 {
            self.op_cost + Duration::from_nanos(offset as u64)
        } else {
            self.op_cost
                .saturating_sub(Duration::from_nanos(offset.unsigned_abs()))
        };

        let start = Instant::now();
        while start.elapsed() < target {
            std::hint::spin_loop();
        }
        Ok(())
    }
}

/// Scheduler-bound driver: sleeps for the configured op cost
pub struct SleepDriver {
    op_cost: Duration,
}

impl SleepDriver {
    pub fn new(op_cost: Duration) -> Self {
        Self { op_cost }
    }
}

impl WorkloadDriver for SleepDriver {
    fn name(&self) -> &str {
        "sleep"
    }

    fn execute(&self) -> Result<()> {
        std::thread::sleep(self.op_cost);
        Ok(())
    }
}

/// Driver that does nothing, for measuring harness overhead
pub struct NoopDriver;

impl WorkloadDriver for NoopDriver {
    fn name(&self) -> &str {
        "noop"
    }

    fn execute(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spin_driver_takes_at_least_op_cost() {
        let driver = SpinDriver::new(Duration::from_micros(200));
        let start = Instant::now();
        driver.execute().unwrap();
        // Jitter is at most 10%, so 150us is a safe lower bound.
        assert!(start.elapsed() >= Duration::from_micros(150));
    }

    #[test]
    fn test_noop_driver_lifecycle() {
        let driver = NoopDriver;
        driver.setup().unwrap();
        driver.execute().unwrap();
        driver.teardown().unwrap();
        assert_eq!(driver.name(), "noop");
    }
}
