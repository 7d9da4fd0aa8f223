//! Bounded usage history shared between the sampler and readers
//!
//! All metric buffers advance in lock-step, one entry per completed poll
//! tick, behind a single mutex acquisition: readers can never observe a
//! metric buffer whose length differs from the shared timestamp axis.
//! Capacity is fixed at construction; the oldest entry is evicted first.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};

use super::sample::UsageSample;

/// Fixed-capacity ring buffers for every metric family
#[derive(Debug)]
pub struct HistoryState {
    capacity: usize,
    timestamps: VecDeque<DateTime<Utc>>,
    cpu: BTreeMap<String, VecDeque<f64>>,
    npu: VecDeque<f64>,
    mem_used_gb: VecDeque<f64>,
    mem_used_percent: VecDeque<f64>,
    fault: Option<String>,
}

impl HistoryState {
    /// Creates empty buffers holding at most `capacity` ticks.
    ///
    /// A capacity of zero is raised to one: `push_tick` always stores the
    /// tick it is given, so zero could not be honored.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            timestamps: VecDeque::with_capacity(capacity),
            cpu: BTreeMap::new(),
            npu: VecDeque::with_capacity(capacity),
            mem_used_gb: VecDeque::with_capacity(capacity),
            mem_used_percent: VecDeque::with_capacity(capacity),
            fault: None,
        }
    }

    /// The configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of completed ticks currently held
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether no tick has completed yet
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Appends one completed tick to every buffer.
    ///
    /// A label seen for the first time gets its own buffer, backfilled with
    /// zeros to the current axis length; a label that produced no value this
    /// tick (core went offline) is padded with zero. Either way every buffer
    /// ends the call at the same length as the timestamp axis.
    pub fn push_tick(&mut self, timestamp: DateTime<Utc>, usage: &UsageSample) {
        push_bounded(&mut self.timestamps, timestamp, self.capacity);

        for (label, buffer) in &mut self.cpu {
            let value = usage.cpu_percent.get(label).copied().unwrap_or(0.0);
            push_bounded(buffer, value, self.capacity);
        }
        let backfill_len = self.timestamps.len() - 1;
        for (label, value) in &usage.cpu_percent {
            if !self.cpu.contains_key(label) {
                let mut buffer = backfilled(backfill_len, self.capacity);
                push_bounded(&mut buffer, *value, self.capacity);
                self.cpu.insert(label.clone(), buffer);
            }
        }

        push_bounded(&mut self.npu, usage.npu_percent, self.capacity);
        push_bounded(&mut self.mem_used_gb, usage.mem_used_gb, self.capacity);
        push_bounded(
            &mut self.mem_used_percent,
            usage.mem_used_percent,
            self.capacity,
        );
    }

    /// Records the error that stopped the sampling loop
    pub fn record_fault(&mut self, message: impl Into<String>) {
        self.fault = Some(message.into());
    }

    /// The error that stopped the sampling loop, if it has failed
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// Copies the CPU history (shared time axis plus per-label values)
    pub fn cpu_history(&self) -> CpuHistory {
        CpuHistory {
            timestamps: self.timestamps.iter().copied().collect(),
            per_label: self
                .cpu
                .iter()
                .map(|(label, values)| (label.clone(), values.iter().copied().collect()))
                .collect(),
        }
    }

    /// Copies the NPU history
    pub fn npu_history(&self) -> NpuHistory {
        NpuHistory {
            timestamps: self.timestamps.iter().copied().collect(),
            values: self.npu.iter().copied().collect(),
        }
    }

    /// Copies the memory history
    pub fn mem_history(&self) -> MemHistory {
        MemHistory {
            timestamps: self.timestamps.iter().copied().collect(),
            used_gb: self.mem_used_gb.iter().copied().collect(),
            used_percent: self.mem_used_percent.iter().copied().collect(),
        }
    }
}

/// Snapshot of the CPU usage history
#[derive(Debug, Clone, PartialEq)]
pub struct CpuHistory {
    /// Shared time axis, one entry per tick
    pub timestamps: Vec<DateTime<Utc>>,
    /// Usage values per cpu label, positionally aligned with the axis
    pub per_label: BTreeMap<String, Vec<f64>>,
}

/// Snapshot of the accelerator usage history
#[derive(Debug, Clone, PartialEq)]
pub struct NpuHistory {
    /// Shared time axis, one entry per tick
    pub timestamps: Vec<DateTime<Utc>>,
    /// Usage values, positionally aligned with the axis
    pub values: Vec<f64>,
}

/// Snapshot of the memory usage history
#[derive(Debug, Clone, PartialEq)]
pub struct MemHistory {
    /// Shared time axis, one entry per tick
    pub timestamps: Vec<DateTime<Utc>>,
    /// Used memory in GB per tick
    pub used_gb: Vec<f64>,
    /// Used memory percentage per tick
    pub used_percent: Vec<f64>,
}

/// Appends to a ring, evicting the oldest entry at capacity
fn push_bounded<T>(buffer: &mut VecDeque<T>, value: T, capacity: usize) {
    if buffer.len() >= capacity {
        buffer.pop_front();
    }
    buffer.push_back(value);
}

/// A zero-filled buffer aligning a late-appearing label with the axis
fn backfilled(len: usize, capacity: usize) -> VecDeque<f64> {
    let mut buffer = VecDeque::with_capacity(capacity);
    buffer.extend(std::iter::repeat_n(0.0, len.min(capacity)));
    buffer
}
