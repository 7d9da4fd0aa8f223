//! Telemetry samples and usage derivation
//!
//! A [`RawSample`] holds the cumulative kernel counters captured by one
//! batched remote invocation; a [`UsageSample`] is the instantaneous usage
//! derived from two consecutive raw samples.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Column index of the idle counter in a `/proc/stat` row
const IDLE_INDEX: usize = 3;

/// Column index of the iowait counter
const IOWAIT_INDEX: usize = 4;

/// Minimum counter columns a cpu row must carry (user through steal)
pub const MIN_CPU_FIELDS: usize = 8;

/// Label of the aggregate cpu row in `/proc/stat`
pub const AGGREGATE_CPU_LABEL: &str = "cpu";

const KIB_PER_GIB: f64 = 1024.0 * 1024.0;

/// Converts a `/proc/meminfo` kilobyte value to gigabytes
pub fn kib_to_gib(kib: u64) -> f64 {
    kib as f64 / KIB_PER_GIB
}

/// Cumulative jiffy counters for one `/proc/stat` label, in file order
/// (user, nice, system, idle, iowait, irq, softirq, steal, ...).
///
/// The parser guarantees at least [`MIN_CPU_FIELDS`] fields; extra trailing
/// columns from newer kernels are preserved positionally and participate in
/// the total-delta sum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuCounters(Vec<u64>);

impl CpuCounters {
    /// Wraps a field vector. The parser enforces the [`MIN_CPU_FIELDS`]
    /// minimum for real rows; shorter vectors are tolerated and contribute
    /// zero idle time for the missing columns.
    pub fn new(fields: Vec<u64>) -> Self {
        Self(fields)
    }

    /// The raw counter fields in file order
    pub fn fields(&self) -> &[u64] {
        &self.0
    }

    /// Idle jiffies (idle + iowait); absent columns count as zero
    fn idle_total(&self) -> u64 {
        let column = |i: usize| self.0.get(i).copied().unwrap_or(0);
        column(IDLE_INDEX) + column(IOWAIT_INDEX)
    }

    /// CPU usage percentage accumulated since `prev`.
    ///
    /// `100 * (1 - idle_delta / total_delta)` where the total delta sums the
    /// signed per-category deltas across all shared columns. A non-positive
    /// total delta (identical samples, counter reset) yields `0.0`.
    pub fn usage_since(&self, prev: &Self) -> f64 {
        let total_delta: i64 = self
            .0
            .iter()
            .zip(&prev.0)
            .map(|(curr, prev)| *curr as i64 - *prev as i64)
            .sum();
        if total_delta <= 0 {
            return 0.0;
        }
        let idle_delta = self.idle_total() as i64 - prev.idle_total() as i64;
        100.0 * (1.0 - idle_delta as f64 / total_delta as f64)
    }
}

/// Parsed snapshot of the board's counters at one poll tick.
///
/// All constituent reads come from a single batched remote invocation, so
/// the sample is internally consistent; the timestamp is captured
/// client-side immediately after the transport call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Per-label cumulative jiffy counters (aggregate plus one per core)
    pub cpu: BTreeMap<String, CpuCounters>,
    /// Available memory in GB (from `MemAvailable`)
    pub mem_available_gb: f64,
    /// Cumulative microseconds spent in accelerator inference since boot
    pub inference_time_us: u64,
    /// When the sample was captured, client-side
    pub timestamp: DateTime<Utc>,
}

/// Instantaneous usage derived from two consecutive raw samples
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSample {
    /// Usage percentage per cpu label
    pub cpu_percent: BTreeMap<String, f64>,
    /// Accelerator usage percentage, clamped to [0, 100]
    pub npu_percent: f64,
    /// Used memory in GB (`total - available`)
    pub mem_used_gb: f64,
    /// Used memory as a percentage of total
    pub mem_used_percent: f64,
}

impl UsageSample {
    /// Derives per-tick usage from the previous and current raw samples.
    ///
    /// Labels present in both samples get a usage value; a core first seen
    /// in `curr` has no delta yet and is skipped until the next tick.
    pub fn between(prev: &RawSample, curr: &RawSample, total_mem_gb: f64) -> Self {
        let mut cpu_percent = BTreeMap::new();
        for (label, prev_counters) in &prev.cpu {
            if let Some(curr_counters) = curr.cpu.get(label) {
                cpu_percent.insert(label.clone(), curr_counters.usage_since(prev_counters));
            }
        }

        let mem_used_gb = total_mem_gb - curr.mem_available_gb;
        let mem_used_percent = if total_mem_gb > 0.0 {
            100.0 * mem_used_gb / total_mem_gb
        } else {
            0.0
        };

        Self {
            cpu_percent,
            npu_percent: npu_usage(prev, curr),
            mem_used_gb,
            mem_used_percent,
        }
    }
}

/// Accelerator usage from the inference-time delta over wall-clock elapsed
/// time, clamped to [0, 100] to absorb counter wraparound and timing jitter.
fn npu_usage(prev: &RawSample, curr: &RawSample) -> f64 {
    let elapsed_s = (curr.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
    if elapsed_s <= 0.0 {
        return 0.0;
    }
    let delta_us = curr.inference_time_us as i64 - prev.inference_time_us as i64;
    let raw = 100.0 * delta_us as f64 / (elapsed_s * 1_000_000.0);
    raw.clamp(0.0, 100.0)
}
