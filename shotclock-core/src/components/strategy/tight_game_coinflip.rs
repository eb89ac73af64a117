//! Tight-game coin flip: crunch time, close score, both sides near 50/50.

use crate::domain::Order;

use super::{open_price, stake_quantity, Decision, DecisionContext, Strategy};

/// In crunch time of a close game, when at least two outcomes are priced
/// inside `[p_low, p_high]`, buy `stake` dollars of the cheaper one unless
/// already holding it.
#[derive(Debug, Clone)]
pub struct TightGameCoinflip {
    pub min_period: u32,
    pub max_clock_secs: f64,
    pub close_score_max: i64,
    pub p_low: f64,
    pub p_high: f64,
    pub stake: f64,
}

impl TightGameCoinflip {
    pub fn default_params() -> Self {
        Self {
            min_period: 4,
            max_clock_secs: 240.0,
            close_score_max: 5,
            p_low: 0.35,
            p_high: 0.65,
            stake: 25.0,
        }
    }
}

impl Strategy for TightGameCoinflip {
    type Memory = ();

    fn name(&self) -> &str {
        "tight_game_coinflip"
    }

    fn decide(&self, ctx: &DecisionContext<'_>, memory: ()) -> Decision<()> {
        let Some(state) = ctx.snapshot.game_state.as_ref() else {
            return Decision::hold(memory);
        };
        if state.period < self.min_period || state.clock_remaining > self.max_clock_secs {
            return Decision::hold(memory);
        }
        if state.score_diff().abs() > self.close_score_max {
            return Decision::hold(memory);
        }

        let in_band: Vec<(&String, f64)> = ctx
            .snapshot
            .tick
            .side_prices
            .iter()
            .map(|(outcome, quote)| (outcome, open_price(quote)))
            .filter(|(_, p)| (self.p_low..=self.p_high).contains(p))
            .collect();
        if in_band.len() < 2 {
            return Decision::hold(memory);
        }

        let cheaper = in_band
            .iter()
            .copied()
            .fold(None, |best: Option<(&String, f64)>, (outcome, p)| match best {
                Some((_, bp)) if bp <= p => best,
                _ => Some((outcome, p)),
            });
        match cheaper {
            Some((outcome, price)) if !ctx.portfolio.has_position(outcome) => Decision::new(
                vec![Order::market_buy(outcome, stake_quantity(self.stake, price))],
                memory,
            ),
            _ => Decision::hold(memory),
        }
    }
}
