//! Causal alignment of an event-state timeline onto a tick stream.
//!
//! One forward merge pass: a cursor walks the state sequence and is only ever
//! advanced past observations whose timestamp is `<=` the current tick. A state
//! timestamped after the tick is never inspected beyond the comparison that
//! stops the cursor, so no snapshot can carry future information.

use crate::domain::{EventStateObservation, MarketTick, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which input stream an ordering error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    EventState,
    Tick,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::EventState => write!(f, "event-state"),
            StreamKind::Tick => write!(f, "tick"),
        }
    }
}

/// Fatal alignment errors.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignError {
    #[error("{stream} stream out of order at index {index}: {timestamp} < previous {previous}")]
    OutOfOrderInput {
        stream: StreamKind,
        index: usize,
        previous: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    #[error("alignment invariant violated at snapshot {index}: {detail}")]
    AlignmentInvariantViolation { index: usize, detail: String },
}

/// Check that timestamps never decrease. Equal timestamps are allowed.
fn check_sorted<T>(
    items: &[T],
    stream: StreamKind,
    ts: impl Fn(&T) -> DateTime<Utc>,
) -> Result<(), AlignError> {
    for (i, pair) in items.windows(2).enumerate() {
        let (previous, timestamp) = (ts(&pair[0]), ts(&pair[1]));
        if timestamp < previous {
            return Err(AlignError::OutOfOrderInput {
                stream,
                index: i + 1,
                previous,
                timestamp,
            });
        }
    }
    Ok(())
}

/// Merge states and ticks into one snapshot per tick, in tick order.
///
/// Each snapshot carries the latest state with `timestamp <= tick.timestamp`
/// (ties resolve to the state being available). States sharing a timestamp
/// resolve to the last one in arrival order. A final state does not stop the
/// merge: later ticks still get snapshots with the state frozen at final.
pub fn align(
    states: &[EventStateObservation],
    ticks: &[MarketTick],
) -> Result<Vec<Snapshot>, AlignError> {
    check_sorted(states, StreamKind::EventState, |s| s.timestamp)?;
    check_sorted(ticks, StreamKind::Tick, |t| t.timestamp)?;

    let mut snapshots = Vec::with_capacity(ticks.len());
    let mut cursor = 0usize;
    let mut current: Option<&EventStateObservation> = None;

    for (index, tick) in ticks.iter().enumerate() {
        while let Some(next) = states.get(cursor) {
            if next.timestamp > tick.timestamp {
                break;
            }
            current = Some(next);
            cursor += 1;
        }
        snapshots.push(Snapshot {
            index,
            tick: tick.clone(),
            game_state: current.cloned(),
        });
    }

    Ok(snapshots)
}

/// Re-check a snapshot against its predecessor before it is consumed.
///
/// Guards the engine against snapshot sequences that were not produced by
/// [`align`] (hand-built, deserialized, or spliced).
pub fn verify_snapshot(
    prev: Option<&Snapshot>,
    snapshot: &Snapshot,
    index: usize,
) -> Result<(), AlignError> {
    let violation = |detail: String| AlignError::AlignmentInvariantViolation { index, detail };

    if let Some(state) = &snapshot.game_state {
        if state.timestamp > snapshot.tick.timestamp {
            return Err(violation(format!(
                "game state at {} is after tick at {}",
                state.timestamp, snapshot.tick.timestamp
            )));
        }
    }

    let Some(prev) = prev else {
        return Ok(());
    };

    if snapshot.tick.timestamp < prev.tick.timestamp {
        return Err(violation(format!(
            "tick at {} precedes previous tick at {}",
            snapshot.tick.timestamp, prev.tick.timestamp
        )));
    }

    match (&prev.game_state, &snapshot.game_state) {
        (Some(before), Some(after)) if after.timestamp < before.timestamp => Err(violation(format!(
            "game state regressed from {} to {}",
            before.timestamp, after.timestamp
        ))),
        (Some(before), None) => Err(violation(format!(
            "game state at {} disappeared",
            before.timestamp
        ))),
        _ => Ok(()),
    }
}
