// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Overflow Interval Reconstruction
//!
//! Signals are generated as minute offsets from a fixed base so that start
//! times collide often enough to exercise re-sent and out-of-order signals.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::BTreeSet;

use cip_functions::functions::combined_sewage_overflow::overflow_id;
use cip_functions::{CombinedSewageOverflow, Stopwatch};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
}

fn now() -> DateTime<Utc> {
    base() + Duration::days(2)
}

fn fresh() -> CombinedSewageOverflow {
    CombinedSewageOverflow::new("combinedsewageoverflow:prop", "default", base())
}

fn total(record: &CombinedSewageOverflow) -> Duration {
    record
        .overflows
        .iter()
        .fold(Duration::zero(), |acc, o| acc + o.duration)
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// A start or stop signal for one of a few dozen start times
fn signal() -> impl Strategy<Value = Stopwatch> {
    (
        0i64..48,
        any::<bool>(),
        1i64..120,
        proptest::option::of(1i64..7200),
    )
        .prop_map(|(slot, state, length, duration)| {
            let start = base() + Duration::minutes(slot * 30);
            Stopwatch {
                start_time: Some(start),
                stop_time: (!state).then(|| start + Duration::minutes(length)),
                duration: duration.map(Duration::seconds),
                state,
                ..Default::default()
            }
        })
}

fn signal_sequence() -> impl Strategy<Value = Vec<Stopwatch>> {
    prop::collection::vec(signal(), 0..60)
}

fn start_signal(offset: i64) -> Stopwatch {
    Stopwatch {
        start_time: Some(base() + Duration::seconds(offset)),
        state: true,
        ..Default::default()
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Intervals stay ordered by start time
    #[test]
    fn prop_intervals_are_ordered(signals in signal_sequence()) {
        let mut record = fresh();

        for signal in &signals {
            let _ = record.merge_signal(signal, now());
            prop_assert!(
                record.overflows.windows(2).all(|w| w[0].start_time < w[1].start_time),
                "Intervals must be strictly ascending by start time"
            );
        }
    }

    /// Property: Cumulative time is the exact sum of interval durations
    #[test]
    fn prop_cumulative_time_is_sum(signals in signal_sequence()) {
        let mut record = fresh();

        for signal in &signals {
            let _ = record.merge_signal(signal, now());
            prop_assert_eq!(record.cumulative_time, total(&record));
        }
    }

    /// Property: Record state follows the latest interval
    #[test]
    fn prop_state_follows_latest_interval(signals in signal_sequence()) {
        let mut record = fresh();

        for signal in &signals {
            let _ = record.merge_signal(signal, now());
            let latest = record.latest().map(|o| o.state).unwrap_or(false);
            prop_assert_eq!(record.state, latest);
        }
    }

    /// Property: A rejected merge leaves the record untouched
    #[test]
    fn prop_rejection_has_no_side_effect(signals in signal_sequence(), extra in signal()) {
        let mut record = fresh();
        for signal in &signals {
            let _ = record.merge_signal(signal, now());
        }

        let before = record.clone();
        if record.merge_signal(&extra, now()).is_err() {
            prop_assert_eq!(record, before);
        }
    }

    /// Property: Re-sending a start signal is idempotent
    #[test]
    fn prop_repeated_start_is_idempotent(signals in signal_sequence(), slot in 0i64..48) {
        let mut record = fresh();
        for signal in &signals {
            let _ = record.merge_signal(signal, now());
        }

        let start = start_signal(slot * 30 * 60);
        if record.merge_signal(&start, now()).is_ok() {
            let once = record.clone();
            let changed = record.merge_signal(&start, now());

            prop_assert_eq!(changed, Ok(false));
            prop_assert_eq!(record, once);
        }
    }

    /// Property: Distinct start times produce distinct intervals
    #[test]
    fn prop_distinct_starts_distinct_intervals(
        offsets in prop::collection::btree_set(0i64..1_000_000, 1..40)
    ) {
        let mut record = fresh();
        for offset in &offsets {
            prop_assert_eq!(record.merge_signal(&start_signal(*offset), now()), Ok(true));
        }

        prop_assert_eq!(record.overflows.len(), offsets.len());

        let ids: BTreeSet<_> = record.overflows.iter().map(|o| o.id.clone()).collect();
        prop_assert_eq!(ids.len(), offsets.len());
    }

    /// Property: Interval identity depends on the start time alone
    #[test]
    fn prop_overflow_id_is_deterministic(nanos in 0i64..4_000_000_000_000_000_000) {
        let start = DateTime::from_timestamp_nanos(nanos);

        prop_assert_eq!(overflow_id(start), overflow_id(start));
        prop_assert_ne!(overflow_id(start), overflow_id(start + Duration::nanoseconds(1)));
    }
}
