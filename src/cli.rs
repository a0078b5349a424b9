use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Perf Harness - runs a workload driver and reports windowed latency progress
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Workload driver to run
    #[clap(long, value_enum, default_value_t = DriverKind::Spin)]
    pub driver: DriverKind,

    /// Warmup interval before measurement begins
    #[clap(short = 'w', long, value_parser = parse_duration, default_value = "30s")]
    pub warmup: Duration,

    /// Measured run duration (after warmup)
    #[clap(short = 'd', long, value_parser = parse_duration, default_value = "60s")]
    pub duration: Duration,

    /// Interval between progress reports
    #[clap(long, value_parser = parse_duration, default_value = "10s")]
    pub report_interval: Duration,

    /// Nominal cost of one operation for the built-in drivers
    #[clap(long, value_parser = parse_duration, default_value = "100us")]
    pub op_cost: Duration,

    /// Number of concurrent worker threads
    #[clap(short = 't', long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Directory for the result summary, histogram file and harness log
    #[clap(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

/// Built-in workload drivers selectable from the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum DriverKind {
    /// Busy-wait for the configured op cost (CPU bound)
    #[clap(name = "spin")]
    Spin,

    /// Sleep for the configured op cost (scheduler bound)
    #[clap(name = "sleep")]
    Sleep,

    /// Empty operation, measures harness overhead
    #[clap(name = "noop")]
    Noop,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::Spin => write!(f, "spin"),
            DriverKind::Sleep => write!(f, "sleep"),
            DriverKind::Noop => write!(f, "noop"),
        }
    }
}

/// Parse duration from string (e.g., "100us", "500ms", "10s", "5m", "1h")
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("us") {
        (stripped, "us")
    } else if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else {
        (s, "s") // Default to seconds
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

    let duration = match unit {
        "us" => Duration::from_micros(num as u64),
        "ms" => Duration::from_millis(num as u64),
        "s" => Duration::from_secs(num as u64),
        "m" => Duration::from_secs((num * 60.0) as u64),
        "h" => Duration::from_secs((num * 3600.0) as u64),
        _ => return Err(format!("Invalid duration unit: {}", unit)),
    };

    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("100us").unwrap(), Duration::from_micros(100));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));

        assert!(parse_duration("").is_err());
        assert!(parse_duration("invalid").is_err());
    }

    #[test]
    fn test_driver_kind_display() {
        assert_eq!(DriverKind::Spin.to_string(), "spin");
        assert_eq!(DriverKind::Sleep.to_string(), "sleep");
        assert_eq!(DriverKind::Noop.to_string(), "noop");
    }
}
