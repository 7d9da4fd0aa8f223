//! Background telemetry profiling for a remote board
//!
//! The profiler polls a board over a [`crate::transport::Transport`] at a
//! fixed cadence, derives CPU, accelerator, and memory usage from consecutive
//! counter snapshots, and keeps the results in fixed-capacity history buffers
//! that callers read through cheap copying accessors.

use thiserror::Error;

use crate::transport::TransportError;

pub mod history;
pub mod parser;
pub mod poller;
pub mod sample;
pub mod settings;

pub use history::{CpuHistory, HistoryState, MemHistory, NpuHistory};
pub use parser::{TELEMETRY_COMMAND, TOTAL_MEM_COMMAND, parse_telemetry, parse_total_mem};
pub use poller::SystemProfiler;
pub use sample::{CpuCounters, RawSample, UsageSample};
pub use settings::{MIN_HISTORY_LENGTH, MIN_INTERVAL_MS, ProfilerSettings};

/// Profiler errors
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// The underlying transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Telemetry output could not be parsed
    #[error("Failed to parse telemetry output: {0}")]
    Parse(String),

    /// The sampling task ended abnormally
    #[error("Sampling task failed: {0}")]
    Task(String),
}

/// Result alias for profiler operations
pub type ProfilerResult<T> = Result<T, ProfilerError>;
