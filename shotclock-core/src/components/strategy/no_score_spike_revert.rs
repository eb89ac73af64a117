//! No-score spike revert: fade a price jump the scoreboard does not explain.

use crate::domain::Order;
use std::collections::BTreeMap;

use super::{open_price, stake_quantity, Decision, DecisionContext, Strategy};

/// Between consecutive snapshots where the score differential changed by at
/// most `max_score_diff_change`, finds the outcome whose price moved the most.
/// If that move is at least `spike_min_abs` in either direction, buys `stake`
/// dollars of the other outcome.
#[derive(Debug, Clone)]
pub struct NoScoreSpikeRevert {
    pub spike_min_abs: f64,
    pub max_score_diff_change: i64,
    /// Inclusive band; prices outside it are treated as unquoted.
    pub price_min: f64,
    pub price_max: f64,
    pub stake: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevertMemory {
    pub last_score_diff: Option<i64>,
    pub last_prices: BTreeMap<String, f64>,
}

impl NoScoreSpikeRevert {
    pub fn default_params() -> Self {
        Self {
            spike_min_abs: 0.08,
            max_score_diff_change: 0,
            price_min: 0.01,
            price_max: 0.99,
            stake: 25.0,
        }
    }
}

impl Strategy for NoScoreSpikeRevert {
    type Memory = RevertMemory;

    fn name(&self) -> &str {
        "no_score_spike_revert"
    }

    fn decide(&self, ctx: &DecisionContext<'_>, mut memory: Self::Memory) -> Decision<Self::Memory> {
        let tick = &ctx.snapshot.tick;
        let Some(state) = ctx.snapshot.game_state.as_ref() else {
            return Decision::hold(memory);
        };
        if tick.side_prices.len() < 2 {
            return Decision::hold(memory);
        }
        let score_diff = state.score_diff();

        let prices: BTreeMap<String, f64> = tick
            .side_prices
            .iter()
            .map(|(outcome, quote)| (outcome.clone(), open_price(quote)))
            .filter(|(_, p)| (self.price_min..=self.price_max).contains(p))
            .collect();

        let mut orders = Vec::new();
        let quiet = memory
            .last_score_diff
            .is_some_and(|last| (score_diff - last).abs() <= self.max_score_diff_change);
        if quiet {
            let mut biggest: Option<(&str, f64)> = None;
            for (outcome, price) in &prices {
                let Some(last) = memory.last_prices.get(outcome) else {
                    continue;
                };
                let delta = price - last;
                if delta.abs() > biggest.map_or(0.0, |(_, d)| d.abs()) {
                    biggest = Some((outcome.as_str(), delta));
                }
            }

            if let Some((spiked, _)) = biggest.filter(|(_, d)| d.abs() >= self.spike_min_abs) {
                let fade = tick
                    .opposite(spiked)
                    .filter(|other| !ctx.portfolio.has_position(other))
                    .and_then(|other| tick.quote(other).map(|q| (other, open_price(q))));
                if let Some((other, price)) = fade {
                    orders.push(Order::market_buy(other, stake_quantity(self.stake, price)));
                }
            }
        }

        memory.last_score_diff = Some(score_diff);
        memory.last_prices = prices;
        Decision::new(orders, memory)
    }
}
