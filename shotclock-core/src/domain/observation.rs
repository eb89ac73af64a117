//! EventStateObservation: the reconstructed real-world game state at an instant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tick::{AWAY, HOME};

/// One observation of the underlying game: score, period and clock.
///
/// Produced externally in non-decreasing timestamp order per game. Observations
/// sharing a timestamp keep their arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStateObservation {
    pub timestamp: DateTime<Utc>,
    pub score_home: u32,
    pub score_away: u32,
    pub period: u32,
    /// Seconds left on the game clock in the current period.
    pub clock_remaining: f64,
    #[serde(default)]
    pub is_final: bool,
}

impl EventStateObservation {
    pub fn new(
        timestamp: DateTime<Utc>,
        score_home: u32,
        score_away: u32,
        period: u32,
        clock_remaining: f64,
    ) -> Self {
        Self {
            timestamp,
            score_home,
            score_away,
            period,
            clock_remaining,
            is_final: false,
        }
    }

    /// Mark this observation as the final whistle.
    pub fn finalized(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Home minus away.
    pub fn score_diff(&self) -> i64 {
        i64::from(self.score_home) - i64::from(self.score_away)
    }

    pub fn clock_remaining_minutes(&self) -> f64 {
        self.clock_remaining / 60.0
    }

    /// Outcome label of the side currently ahead, `None` when level.
    pub fn leader(&self) -> Option<&'static str> {
        match self.score_diff() {
            d if d > 0 => Some(HOME),
            d if d < 0 => Some(AWAY),
            _ => None,
        }
    }
}
