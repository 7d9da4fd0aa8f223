//! Strict parser for the batched telemetry output
//!
//! One remote round trip per tick reads the CPU counters, available memory,
//! and cumulative accelerator inference time. Parsing rejects malformed or
//! truncated output outright rather than producing partial data: a tick is
//! either a complete [`RawSample`] or a parse error.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::sample::{AGGREGATE_CPU_LABEL, CpuCounters, MIN_CPU_FIELDS, RawSample, kib_to_gib};
use super::{ProfilerError, ProfilerResult};

/// Batched per-tick command: one round trip for all counters.
///
/// Joined with `&&` only, so the debug-bridge transport can split it into
/// per-segment invocations; the network shell runs it as-is.
pub const TELEMETRY_COMMAND: &str = "cat /proc/stat && \
     grep MemAvailable: /proc/meminfo && \
     cat /sys/class/misc/synap/statistics/inference_time";

/// Startup command for the board's total memory (queried once)
pub const TOTAL_MEM_COMMAND: &str = "grep MemTotal: /proc/meminfo";

/// Minimum non-blank lines a telemetry response must contain
/// (aggregate cpu row, at least one core row, `MemAvailable`, inference time)
pub const MIN_TELEMETRY_LINES: usize = 4;

/// Parses the output of [`TELEMETRY_COMMAND`] into a [`RawSample`].
///
/// The timestamp is supplied by the caller, captured right after the
/// transport call returned.
///
/// # Errors
///
/// Returns [`ProfilerError::Parse`] when the output is truncated, a cpu row
/// has fewer than eight counter fields or an unparseable field, the
/// aggregate cpu row or `MemAvailable` line is missing, or the trailing
/// inference-time line is not an integer.
pub fn parse_telemetry(raw: &str, timestamp: DateTime<Utc>) -> ProfilerResult<RawSample> {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() < MIN_TELEMETRY_LINES {
        return Err(ProfilerError::Parse(format!(
            "telemetry output truncated: expected at least {MIN_TELEMETRY_LINES} non-blank lines, got {}",
            lines.len()
        )));
    }

    let mut cpu = BTreeMap::new();
    let mut mem_available_gb = None;

    for line in &lines[..lines.len() - 1] {
        if line.starts_with("cpu") {
            let (label, counters) = parse_cpu_line(line)?;
            cpu.insert(label, counters);
        } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
            mem_available_gb = Some(kib_to_gib(parse_kib_value(rest)?));
        }
        // Remaining /proc/stat rows (intr, ctxt, btime, ...) are ignored
    }

    if !cpu.contains_key(AGGREGATE_CPU_LABEL) {
        return Err(ProfilerError::Parse(
            "no aggregate cpu line in telemetry output".into(),
        ));
    }

    let mem_available_gb = mem_available_gb.ok_or_else(|| {
        ProfilerError::Parse("MemAvailable not found in telemetry output".into())
    })?;

    let last = lines[lines.len() - 1];
    let inference_time_us = last.parse::<u64>().map_err(|_| {
        ProfilerError::Parse(format!("invalid inference time line '{last}'"))
    })?;

    Ok(RawSample {
        cpu,
        mem_available_gb,
        inference_time_us,
        timestamp,
    })
}

/// Parses the output of [`TOTAL_MEM_COMMAND`] into gigabytes.
///
/// # Errors
///
/// Returns [`ProfilerError::Parse`] when no valid `MemTotal` line is present.
pub fn parse_total_mem(raw: &str) -> ProfilerResult<f64> {
    let rest = raw
        .lines()
        .map(str::trim)
        .find_map(|l| l.strip_prefix("MemTotal:"))
        .ok_or_else(|| ProfilerError::Parse("MemTotal not found in output".into()))?;
    Ok(kib_to_gib(parse_kib_value(rest)?))
}

/// Parses one `/proc/stat` cpu row into its label and counters
fn parse_cpu_line(line: &str) -> ProfilerResult<(String, CpuCounters)> {
    let mut parts = line.split_whitespace();
    let label = parts.next().unwrap_or_default();
    let fields = parts
        .map(|f| {
            f.parse::<u64>().map_err(|_| {
                ProfilerError::Parse(format!("invalid counter field '{f}' in cpu line '{line}'"))
            })
        })
        .collect::<ProfilerResult<Vec<u64>>>()?;

    if fields.len() < MIN_CPU_FIELDS {
        return Err(ProfilerError::Parse(format!(
            "cpu line '{label}' has {} counter fields, expected at least {MIN_CPU_FIELDS}",
            fields.len()
        )));
    }

    Ok((label.to_string(), CpuCounters::new(fields)))
}

/// Parses a value like `  16384000 kB` into kilobytes
fn parse_kib_value(s: &str) -> ProfilerResult<u64> {
    s.split_whitespace()
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ProfilerError::Parse(format!("invalid kilobyte value '{}'", s.trim())))
}
