//! Look-ahead contamination tests for the alignment engine.
//!
//! Invariant: no snapshot may carry a game state timestamped after its tick,
//! and the attached state is always the latest one that is not.
//!
//! Method: random non-decreasing timestamp streams, interleaved arbitrarily,
//! checked against a brute-force reference and against truncation: aligning a
//! prefix of the ticks must reproduce the same prefix of snapshots.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use shotclock_core::data::align::{align, verify_snapshot};
use shotclock_core::domain::{EventStateObservation, MarketTick};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

// ── Strategies (proptest) ────────────────────────────────────────────

/// Non-decreasing timestamps built from non-negative gaps (zero gaps = ties).
fn arb_times(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..5, 0..max_len).prop_map(|gaps| {
        gaps.iter()
            .scan(0i64, |t, g| {
                *t += g;
                Some(*t)
            })
            .collect()
    })
}

fn make_states(times: &[i64]) -> Vec<EventStateObservation> {
    times
        .iter()
        .enumerate()
        .map(|(i, &t)| EventStateObservation::new(ts(t), i as u32, 0, 1, 720.0))
        .collect()
}

fn make_ticks(times: &[i64]) -> Vec<MarketTick> {
    times
        .iter()
        .enumerate()
        .map(|(i, &t)| MarketTick::new(ts(t), "PROP").with_price("home", (i % 100) as f64 / 100.0))
        .collect()
}

proptest! {
    /// No snapshot exposes a state from after its tick.
    #[test]
    fn no_lookahead(state_times in arb_times(40), tick_times in arb_times(40)) {
        let snaps = align(&make_states(&state_times), &make_ticks(&tick_times)).unwrap();
        for s in &snaps {
            prop_assert!(s.is_causal());
        }
    }

    /// Snapshot count equals tick count, including with no states at all.
    #[test]
    fn length_preserved(state_times in arb_times(40), tick_times in arb_times(40)) {
        let snaps = align(&make_states(&state_times), &make_ticks(&tick_times)).unwrap();
        prop_assert_eq!(snaps.len(), tick_times.len());
        let bare = align(&[], &make_ticks(&tick_times)).unwrap();
        prop_assert_eq!(bare.len(), tick_times.len());
        prop_assert!(bare.iter().all(|s| s.game_state.is_none()));
    }

    /// Attached state equals the brute-force "last state with ts <= tick".
    #[test]
    fn matches_reference(state_times in arb_times(40), tick_times in arb_times(40)) {
        let states = make_states(&state_times);
        let snaps = align(&states, &make_ticks(&tick_times)).unwrap();
        for s in &snaps {
            let expected = states.iter().rev().find(|st| st.timestamp <= s.tick.timestamp);
            prop_assert_eq!(s.game_state.as_ref(), expected);
        }
    }

    /// Attached state timestamps never go backwards.
    #[test]
    fn causal_monotonicity(state_times in arb_times(40), tick_times in arb_times(40)) {
        let snaps = align(&make_states(&state_times), &make_ticks(&tick_times)).unwrap();
        let mut prev = None;
        for (i, s) in snaps.iter().enumerate() {
            prop_assert!(verify_snapshot(prev, s, i).is_ok());
            prev = Some(s);
        }
    }

    /// Aligning a prefix of the ticks gives a prefix of the snapshots.
    #[test]
    fn prefix_stable(state_times in arb_times(40), tick_times in arb_times(40), cut in 0usize..40) {
        let states = make_states(&state_times);
        let ticks = make_ticks(&tick_times);
        let cut = cut.min(ticks.len());
        let full = align(&states, &ticks).unwrap();
        let truncated = align(&states, &ticks[..cut]).unwrap();
        prop_assert_eq!(&full[..cut], &truncated[..]);
    }
}

#[test]
fn two_tick_example_alignment() {
    let states = vec![
        EventStateObservation::new(ts(5), 0, 0, 1, 720.0),
        EventStateObservation::new(ts(20), 2, 0, 1, 700.0),
    ];
    let ticks = vec![
        MarketTick::new(ts(10), "EX").with_price("home", 0.40),
        MarketTick::new(ts(30), "EX").with_price("home", 0.55),
    ];
    let snaps = align(&states, &ticks).unwrap();
    assert_eq!(snaps[0].game_state.as_ref().unwrap().timestamp, ts(5));
    assert_eq!(snaps[1].game_state.as_ref().unwrap().timestamp, ts(20));
}
