//! Core library for remote board telemetry profiling.
//!
//! `boardmon-core` talks to an embedded board over either a USB debug bridge
//! or a multiplexed ssh connection, polls its kernel counters in the
//! background, and exposes bounded CPU, NPU, and memory usage history.
//!
//! The two entry points are [`Transport::for_address`], which picks the
//! transport from the address shape, and [`SystemProfiler::start`], which
//! owns the polling loop:
//!
//! ```no_run
//! use boardmon_core::{ProfilerSettings, SystemProfiler};
//!
//! # async fn demo() -> boardmon_core::ProfilerResult<()> {
//! let settings = ProfilerSettings::default().with_board_address("192.168.1.10");
//! let profiler = SystemProfiler::start(settings).await?;
//! // ... poll profiler.cpu_history() from the UI ...
//! profiler.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod profiler;
pub mod transport;

pub use profiler::{
    CpuHistory, MemHistory, NpuHistory, ProfilerError, ProfilerResult, ProfilerSettings,
    RawSample, SystemProfiler, UsageSample,
};
pub use transport::{AdbTransport, SshTransport, Transport, TransportError, TransportResult};
