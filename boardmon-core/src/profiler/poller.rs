//! Background sampling loop and the profiler facade
//!
//! One task polls the board at a fixed cadence; it is the sole writer to the
//! previous-sample cache and the history buffers. Readers only ever take
//! O(len) copies under the shared lock, so a slow remote round trip never
//! blocks them. A transport or parse failure is fatal to the loop: it is
//! recorded, logged, and surfaced through the task result, never retried.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::transport::{Transport, TransportResult};

use super::history::{CpuHistory, HistoryState, MemHistory, NpuHistory};
use super::parser::{self, TELEMETRY_COMMAND, TOTAL_MEM_COMMAND};
use super::sample::{RawSample, UsageSample};
use super::settings::ProfilerSettings;
use super::{ProfilerError, ProfilerResult};

/// Polls a remote board and maintains bounded usage history.
///
/// Constructed with [`SystemProfiler::start`], which selects the transport,
/// queries the board's total memory once, and spawns the sampling task. The
/// accessors return copies of the current buffers and share one timestamp
/// axis, so any metric can be zipped against it positionally.
pub struct SystemProfiler {
    transport: Arc<Transport>,
    total_mem_gb: f64,
    shared: Arc<Mutex<HistoryState>>,
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<ProfilerResult<()>>,
}

impl SystemProfiler {
    /// Starts profiling the board described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfilerError::Transport`] when the address is malformed or
    /// the startup total-memory query fails, and [`ProfilerError::Parse`]
    /// when that query returns unusable output.
    pub async fn start(settings: ProfilerSettings) -> ProfilerResult<Self> {
        let transport = Arc::new(Transport::for_address(
            settings.board_address.as_deref(),
            settings.command_timeout_secs,
            settings.keep_alive_secs,
        )?);

        let raw = transport.run(TOTAL_MEM_COMMAND).await?;
        let total_mem_gb = parser::parse_total_mem(&raw)?;
        tracing::debug!(total_mem_gb, "board total memory");

        let shared = Arc::new(Mutex::new(HistoryState::new(
            settings.effective_history_length(),
        )));
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let interval = Duration::from_millis(settings.effective_interval_ms());

        let exec_transport = Arc::clone(&transport);
        let exec = move || {
            let transport = Arc::clone(&exec_transport);
            async move { transport.run(TELEMETRY_COMMAND).await }
        };
        let task = tokio::spawn(run_sampler(
            Arc::clone(&shared),
            total_mem_gb,
            interval,
            stop_rx,
            exec,
        ));

        Ok(Self {
            transport,
            total_mem_gb,
            shared,
            stop_tx,
            task,
        })
    }

    /// The board's total memory in GB, queried once at startup
    pub fn total_memory_gb(&self) -> f64 {
        self.total_mem_gb
    }

    /// The transport the profiler polls through, e.g. for file copies
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Copies the CPU usage history (shared time axis, per-label values)
    pub fn cpu_history(&self) -> CpuHistory {
        self.shared.lock().unwrap().cpu_history()
    }

    /// Copies the accelerator usage history
    pub fn npu_history(&self) -> NpuHistory {
        self.shared.lock().unwrap().npu_history()
    }

    /// Copies the memory usage history
    pub fn mem_history(&self) -> MemHistory {
        self.shared.lock().unwrap().mem_history()
    }

    /// The error that stopped the sampling loop, if it has failed
    pub fn fault(&self) -> Option<String> {
        self.shared.lock().unwrap().fault().map(str::to_string)
    }

    /// Signals the sampling loop to stop and waits for it to finish,
    /// returning its terminal result.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the loop if it had already failed, or
    /// [`ProfilerError::Task`] if the sampling task panicked.
    pub async fn shutdown(self) -> ProfilerResult<()> {
        // Send fails only when the loop already exited; the join result
        // carries the reason either way.
        let _ = self.stop_tx.send(()).await;
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ProfilerError::Task(e.to_string())),
        }
    }
}

/// The sampling loop: ticks at `interval`, stops on the stop channel, and
/// exits with `Err` on the first transport or parse failure.
pub(crate) async fn run_sampler<F, Fut>(
    shared: Arc<Mutex<HistoryState>>,
    total_mem_gb: f64,
    interval: Duration,
    mut stop_rx: mpsc::Receiver<()>,
    exec: F,
) -> ProfilerResult<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = TransportResult<String>> + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    // A slow remote round trip must not cause catch-up bursts
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut previous: Option<RawSample> = None;

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                tracing::debug!("sampling loop stopped");
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(err) = sample_tick(&shared, total_mem_gb, &mut previous, &exec).await {
                    shared.lock().unwrap().record_fault(err.to_string());
                    tracing::error!(error = %err, "sampling failed, stopping loop");
                    return Err(err);
                }
            }
        }
    }
}

/// One poll tick: batched fetch, strict parse, delta compute when a previous
/// sample exists, single-lock append, unconditional cache replacement.
async fn sample_tick<F, Fut>(
    shared: &Mutex<HistoryState>,
    total_mem_gb: f64,
    previous: &mut Option<RawSample>,
    exec: &F,
) -> ProfilerResult<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = TransportResult<String>>,
{
    let raw_text = exec().await?;
    let timestamp = Utc::now();
    let sample = parser::parse_telemetry(&raw_text, timestamp)?;

    if let Some(prev) = previous.as_ref() {
        let usage = UsageSample::between(prev, &sample, total_mem_gb);
        shared.lock().unwrap().push_tick(sample.timestamp, &usage);
    }

    // Seeds the first delta and keeps later ones consecutive
    *previous = Some(sample);
    Ok(())
}
