//! Late-game underdog: buy the long shot in a close game near the end.

use crate::domain::Order;

use super::{open_price, stake_quantity, Decision, DecisionContext, Strategy};

/// Buys the cheapest outcome once, when the game is late and close and the
/// market still prices that outcome below `max_price`. The position is held
/// to liquidation.
#[derive(Debug, Clone)]
pub struct LateGameUnderdog {
    pub min_period: u32,
    /// Seconds left in the period at or below which the game counts as late.
    pub max_clock_secs: f64,
    pub max_score_diff: i64,
    pub max_price: f64,
    /// Dollars per entry; quantity = stake / price.
    pub stake: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnderdogMemory {
    pub entered: bool,
}

impl LateGameUnderdog {
    pub fn default_params() -> Self {
        Self {
            min_period: 4,
            max_clock_secs: 300.0,
            max_score_diff: 6,
            max_price: 0.15,
            stake: 100.0,
        }
    }
}

impl Strategy for LateGameUnderdog {
    type Memory = UnderdogMemory;

    fn name(&self) -> &str {
        "late_game_underdog"
    }

    fn decide(&self, ctx: &DecisionContext<'_>, mut memory: Self::Memory) -> Decision<Self::Memory> {
        if memory.entered {
            return Decision::hold(memory);
        }
        let Some(state) = ctx.snapshot.game_state.as_ref() else {
            return Decision::hold(memory);
        };
        let late = state.period >= self.min_period && state.clock_remaining <= self.max_clock_secs;
        if !late || state.score_diff().abs() > self.max_score_diff {
            return Decision::hold(memory);
        }

        // Underdog = lowest price to open; ties go to the first outcome label.
        let underdog = ctx
            .snapshot
            .tick
            .side_prices
            .iter()
            .map(|(outcome, quote)| (outcome, open_price(quote)))
            .filter(|(_, p)| *p > 0.0)
            .fold(None, |best: Option<(&String, f64)>, (outcome, p)| match best {
                Some((_, bp)) if bp <= p => best,
                _ => Some((outcome, p)),
            });

        let Some((outcome, price)) = underdog else {
            return Decision::hold(memory);
        };
        if price >= self.max_price || ctx.portfolio.has_position(outcome) {
            return Decision::hold(memory);
        }

        memory.entered = true;
        let qty = stake_quantity(self.stake, price);
        Decision::new(vec![Order::market_buy(outcome, qty)], memory)
    }
}
