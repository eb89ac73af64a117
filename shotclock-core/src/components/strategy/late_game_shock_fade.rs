//! Late-game shock fade: in a close finish, buy against an overreaction.

use crate::domain::Order;
use std::collections::BTreeMap;

use super::{open_price, stake_quantity, Decision, DecisionContext, Strategy};

/// Late in a close game (`period >= min_period`, at most `late_minutes` on
/// the clock, `|score_diff| <= max_score_diff`), when one outcome jumps by at
/// least `min_shock_move` since the previous snapshot on a score change of at
/// most `max_score_change`, and now trades at least `min_gap` above the
/// other outcome, buys `stake` dollars of the other outcome. One entry per
/// snapshot.
#[derive(Debug, Clone)]
pub struct LateGameShockFade {
    pub min_period: u32,
    pub late_minutes: f64,
    pub max_score_diff: i64,
    pub min_shock_move: f64,
    pub max_score_change: i64,
    pub min_gap: f64,
    /// Exclusive band the faded side must be priced in.
    pub price_min: f64,
    pub price_max: f64,
    pub stake: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShockFadeMemory {
    pub last_score_diff: Option<i64>,
    pub last_price: BTreeMap<String, f64>,
}

impl LateGameShockFade {
    pub fn default_params() -> Self {
        Self {
            min_period: 4,
            late_minutes: 4.0,
            max_score_diff: 6,
            min_shock_move: 0.15,
            max_score_change: 3,
            min_gap: 0.30,
            price_min: 0.01,
            price_max: 0.99,
            stake: 25.0,
        }
    }
}

impl Strategy for LateGameShockFade {
    type Memory = ShockFadeMemory;

    fn name(&self) -> &str {
        "late_game_shock_fade"
    }

    fn decide(&self, ctx: &DecisionContext<'_>, mut memory: Self::Memory) -> Decision<Self::Memory> {
        let Some(state) = ctx.snapshot.game_state.as_ref() else {
            return Decision::hold(memory);
        };
        let tick = &ctx.snapshot.tick;
        let score_diff = state.score_diff();
        let in_window = state.period >= self.min_period
            && state.clock_remaining_minutes() <= self.late_minutes
            && score_diff.abs() <= self.max_score_diff;

        let mut orders = Vec::new();
        let score_steady = memory
            .last_score_diff
            .is_some_and(|last| (score_diff - last).abs() <= self.max_score_change);

        if in_window && score_steady {
            for (outcome, quote) in &tick.side_prices {
                let price = open_price(quote);
                let Some(prev) = memory.last_price.get(outcome) else {
                    continue;
                };
                if price - prev < self.min_shock_move {
                    continue;
                }
                let Some(other) = tick.opposite(outcome) else {
                    continue;
                };
                let Some(other_price) = tick.quote(other).map(open_price) else {
                    continue;
                };
                if price - other_price < self.min_gap
                    || other_price <= self.price_min
                    || other_price >= self.price_max
                    || ctx.portfolio.has_position(other)
                {
                    continue;
                }
                orders.push(Order::market_buy(other, stake_quantity(self.stake, other_price)));
                break;
            }
        }

        for (outcome, quote) in &tick.side_prices {
            memory.last_price.insert(outcome.clone(), open_price(quote));
        }
        memory.last_score_diff = Some(score_diff);
        Decision::new(orders, memory)
    }
}
