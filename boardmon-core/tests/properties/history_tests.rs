//! Property-based tests for the history buffers

use std::collections::BTreeMap;

use chrono::Utc;
use proptest::prelude::*;

use boardmon_core::UsageSample;
use boardmon_core::profiler::HistoryState;

fn usage_tick(labels: &[String], value: f64) -> UsageSample {
    UsageSample {
        cpu_percent: labels.iter().map(|l| (l.clone(), value)).collect(),
        npu_percent: value,
        mem_used_gb: value,
        mem_used_percent: value,
    }
}

/// A per-tick label set drawn from a small pool, so labels appear and
/// vanish across the run like cores going on and offline
fn arb_label_sets() -> impl Strategy<Value = Vec<Vec<String>>> {
    let pool = vec!["cpu", "cpu0", "cpu1", "cpu2", "cpu3"];
    prop::collection::vec(
        prop::collection::btree_set(prop::sample::select(pool), 0..5),
        1..40,
    )
    .prop_map(|sets| {
        sets.into_iter()
            .map(|set| set.into_iter().map(str::to_string).collect())
            .collect()
    })
}

proptest! {
    /// However labels come and go, every buffer stays in lock-step with the
    /// timestamp axis and never exceeds capacity
    #[test]
    fn buffers_stay_bounded_and_aligned(
        capacity in 2usize..16,
        label_sets in arb_label_sets(),
    ) {
        let mut state = HistoryState::new(capacity);

        for (i, labels) in label_sets.iter().enumerate() {
            state.push_tick(Utc::now(), &usage_tick(labels, i as f64));

            let len = state.len();
            prop_assert!(len <= capacity);

            let cpu = state.cpu_history();
            prop_assert_eq!(cpu.timestamps.len(), len);
            for values in cpu.per_label.values() {
                prop_assert_eq!(values.len(), len);
            }
            prop_assert_eq!(state.npu_history().values.len(), len);
            let mem = state.mem_history();
            prop_assert_eq!(mem.used_gb.len(), len);
            prop_assert_eq!(mem.used_percent.len(), len);
        }
    }

    /// After overflow, the retained scalar values are exactly the newest
    /// `capacity` ticks in order
    #[test]
    fn eviction_keeps_newest_in_order(
        capacity in 2usize..8,
        ticks in 1usize..30,
    ) {
        let mut state = HistoryState::new(capacity);
        let labels = vec!["cpu".to_string()];

        for i in 0..ticks {
            state.push_tick(Utc::now(), &usage_tick(&labels, i as f64));
        }

        let expected: Vec<f64> = (ticks.saturating_sub(capacity)..ticks)
            .map(|i| i as f64)
            .collect();
        prop_assert_eq!(state.npu_history().values, expected.clone());
        prop_assert_eq!(&state.cpu_history().per_label["cpu"], &expected);
    }

    /// Snapshots are detached copies, not views
    #[test]
    fn snapshots_are_detached(ticks in 1usize..10) {
        let mut state = HistoryState::new(16);
        let labels = vec!["cpu".to_string()];
        for i in 0..ticks {
            state.push_tick(Utc::now(), &usage_tick(&labels, i as f64));
        }

        let before = state.npu_history();
        state.push_tick(Utc::now(), &usage_tick(&labels, 999.0));
        prop_assert_eq!(before.values.len(), ticks);
        prop_assert_eq!(state.npu_history().values.len(), ticks + 1);
    }
}

#[test]
fn empty_history_has_no_labels() {
    let state = HistoryState::new(4);
    assert!(state.cpu_history().per_label.is_empty());
    assert_eq!(state.cpu_history().per_label, BTreeMap::new());
}
