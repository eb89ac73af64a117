//! Micro momentum follow: ride a slow drift on a cheap outcome while the score is quiet.

use crate::domain::Order;
use std::collections::{BTreeMap, VecDeque};

use super::{open_price, stake_quantity, Decision, DecisionContext, Strategy};

/// Keeps the last `window` in-band `(price, score_diff)` observations per
/// outcome. Once a window is full, picks the outcome with the largest upward
/// drift of at least `min_trend_move` over a window in which the score
/// differential moved by no more than `max_score_diff_change`. The drift must
/// start at or below `entry_max_price`. Buys `stake` dollars unless already
/// holding that outcome.
#[derive(Debug, Clone)]
pub struct MicroMomentumFollow {
    pub window: usize,
    pub min_trend_move: f64,
    pub max_score_diff_change: i64,
    /// Inclusive band; prices outside it are not recorded.
    pub price_min: f64,
    pub price_max: f64,
    pub entry_max_price: f64,
    pub stake: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftPoint {
    pub price: f64,
    pub score_diff: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriftMemory {
    pub history: BTreeMap<String, VecDeque<DriftPoint>>,
}

impl MicroMomentumFollow {
    pub fn default_params() -> Self {
        Self {
            window: 10,
            min_trend_move: 0.07,
            max_score_diff_change: 3,
            price_min: 0.05,
            price_max: 0.40,
            entry_max_price: 0.40,
            stake: 25.0,
        }
    }

    fn in_band(&self, price: f64) -> bool {
        (self.price_min..=self.price_max).contains(&price)
    }

    /// Upward move across a full window, when it qualifies.
    fn drift(&self, points: &VecDeque<DriftPoint>) -> Option<f64> {
        if points.len() < self.window {
            return None;
        }
        let (first, last) = (points.front()?, points.back()?);
        let move_up = last.price - first.price;
        let quiet = (last.score_diff - first.score_diff).abs() <= self.max_score_diff_change;
        let cheap_start = (self.price_min..=self.entry_max_price).contains(&first.price);
        (move_up > 0.0 && move_up >= self.min_trend_move && quiet && cheap_start && self.in_band(last.price))
            .then_some(move_up)
    }
}

impl Strategy for MicroMomentumFollow {
    type Memory = DriftMemory;

    fn name(&self) -> &str {
        "micro_momentum_follow"
    }

    fn decide(&self, ctx: &DecisionContext<'_>, mut memory: Self::Memory) -> Decision<Self::Memory> {
        let Some(state) = ctx.snapshot.game_state.as_ref() else {
            return Decision::hold(memory);
        };
        let score_diff = state.score_diff();
        let tick = &ctx.snapshot.tick;

        for (outcome, quote) in &tick.side_prices {
            let price = open_price(quote);
            if !self.in_band(price) {
                continue;
            }
            let points = memory.history.entry(outcome.clone()).or_default();
            points.push_back(DriftPoint { price, score_diff });
            while points.len() > self.window {
                points.pop_front();
            }
        }

        let mut best: Option<(&str, f64)> = None;
        for outcome in tick.outcomes() {
            let Some(move_up) = memory.history.get(outcome).and_then(|points| self.drift(points)) else {
                continue;
            };
            if best.map_or(true, |(_, b)| move_up > b) {
                best = Some((outcome, move_up));
            }
        }

        let order = best
            .filter(|(outcome, _)| !ctx.portfolio.has_position(outcome))
            .and_then(|(outcome, _)| {
                let quote = tick.quote(outcome)?;
                Some(Order::market_buy(outcome, stake_quantity(self.stake, open_price(quote))))
            });
        Decision::new(order.into_iter().collect(), memory)
    }
}
