//! Snapshot: a tick paired with the game state known at that instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::observation::EventStateObservation;
use super::tick::MarketTick;

/// One tick plus the most recent game state with `timestamp <= tick.timestamp`.
///
/// `game_state` is `None` when no observation precedes the tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Position of this snapshot in the aligned sequence.
    pub index: usize,
    pub tick: MarketTick,
    pub game_state: Option<EventStateObservation>,
}

impl Snapshot {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.tick.timestamp
    }

    /// Whether the attached game state is the final whistle.
    pub fn is_final(&self) -> bool {
        self.game_state.as_ref().is_some_and(|s| s.is_final)
    }

    pub fn price(&self, outcome: &str) -> Option<f64> {
        self.tick.price(outcome)
    }

    /// No attached state is timestamped after the tick.
    pub fn is_causal(&self) -> bool {
        self.game_state
            .as_ref()
            .map_or(true, |s| s.timestamp <= self.tick.timestamp)
    }
}
