//! End-to-end pipeline tests: raw command output through parsing, usage
//! derivation, and history bookkeeping, without a real board.

use chrono::{TimeDelta, Utc};

use boardmon_core::profiler::{HistoryState, parse_telemetry, parse_total_mem};
use boardmon_core::{ProfilerSettings, UsageSample};

const TICK_A: &str = "\
cpu  1000 0 500 8000 500 0 0 0
cpu0 500 0 250 4000 250 0 0 0
cpu1 500 0 250 4000 250 0 0 0
intr 12345 1 2 3
ctxt 6789
MemAvailable:    2097152 kB
1000000
";

const TICK_B: &str = "\
cpu  1400 0 700 8300 400 0 0 0
cpu0 700 0 350 4150 200 0 0 0
cpu1 700 0 350 4150 200 0 0 0
intr 12399 1 2 3
ctxt 6800
MemAvailable:    1048576 kB
1250000
";

#[test]
fn test_two_ticks_produce_history() {
    let total_mem_gb = parse_total_mem("MemTotal: 4194304 kB\n").unwrap();
    assert!((total_mem_gb - 4.0).abs() < 1e-9);

    let t0 = Utc::now();
    let t1 = t0 + TimeDelta::milliseconds(500);
    let prev = parse_telemetry(TICK_A, t0).unwrap();
    let curr = parse_telemetry(TICK_B, t1).unwrap();

    let usage = UsageSample::between(&prev, &curr, total_mem_gb);

    // Aggregate: total delta 800, idle delta 200, busy 600
    assert!((usage.cpu_percent["cpu"] - 75.0).abs() < 1e-9);
    assert!((usage.cpu_percent["cpu0"] - 75.0).abs() < 1e-9);
    assert!((usage.cpu_percent["cpu1"] - 75.0).abs() < 1e-9);

    // 250ms of inference over a 500ms window
    assert!((usage.npu_percent - 50.0).abs() < 1e-9);

    // 1 GB available of 4 GB total
    assert!((usage.mem_used_gb - 3.0).abs() < 1e-9);
    assert!((usage.mem_used_percent - 75.0).abs() < 1e-9);

    let settings = ProfilerSettings::default().with_history_length(50);
    let mut state = HistoryState::new(settings.effective_history_length());
    state.push_tick(curr.timestamp, &usage);

    let cpu = state.cpu_history();
    assert_eq!(cpu.timestamps, vec![t1]);
    assert_eq!(cpu.per_label.len(), 3);
    let npu = state.npu_history();
    assert_eq!(npu.values.len(), 1);
    let mem = state.mem_history();
    assert!((mem.used_percent[0] - 75.0).abs() < 1e-9);
}

#[test]
fn test_settings_survive_persistence() {
    let settings = ProfilerSettings::default()
        .with_board_address("SL16x3")
        .with_interval_ms(250)
        .with_history_length(20);

    let json = serde_json::to_string_pretty(&settings).unwrap();
    let restored: ProfilerSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, settings);
    assert_eq!(restored.effective_interval_ms(), 250);
    assert_eq!(restored.effective_history_length(), 20);
}

#[test]
fn test_settings_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiler.json");

    let settings = ProfilerSettings::default().with_board_address("10.0.0.7");
    std::fs::write(&path, serde_json::to_vec(&settings).unwrap()).unwrap();

    let restored: ProfilerSettings =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(restored, settings);
}
