//! Underdog resilience: back a pre-game underdog that is keeping it close mid-game.

use crate::domain::Order;

use super::{open_price, stake_quantity, Decision, DecisionContext, Strategy};

/// The first quoted snapshot fixes the pre-game underdog: the cheapest
/// outcome, kept only if priced at or below `pregame_underdog_max`. During
/// periods `min_period..=max_period` (skipping the last `min_clock_secs` of
/// `max_period`), in a game within `max_score_diff`, buys `stake` dollars of
/// the underdog while the market still prices it at or below
/// `current_underdog_max` and no more than `max_rebound` above its pre-game
/// price.
#[derive(Debug, Clone)]
pub struct UnderdogResilience {
    pub pregame_underdog_max: f64,
    pub current_underdog_max: f64,
    pub max_rebound: f64,
    pub max_score_diff: i64,
    pub min_period: u32,
    pub max_period: u32,
    pub min_clock_secs: f64,
    /// Exclusive band on the underdog's current price.
    pub price_min: f64,
    pub price_max: f64,
    pub stake: f64,
}

/// What the opening market said about the game.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PregameRead {
    #[default]
    Unseen,
    /// No clear underdog; the game is not traded.
    Skip,
    Underdog { outcome: String, pregame_price: f64 },
}

impl UnderdogResilience {
    pub fn default_params() -> Self {
        Self {
            pregame_underdog_max: 0.40,
            current_underdog_max: 0.45,
            max_rebound: 0.10,
            max_score_diff: 6,
            min_period: 2,
            max_period: 3,
            min_clock_secs: 60.0,
            price_min: 0.01,
            price_max: 0.99,
            stake: 25.0,
        }
    }

    fn read_pregame(&self, ctx: &DecisionContext<'_>) -> PregameRead {
        let tick = &ctx.snapshot.tick;
        if tick.side_prices.len() < 2 {
            return PregameRead::Skip;
        }
        match tick.cheapest() {
            Some((outcome, price)) if price <= self.pregame_underdog_max => PregameRead::Underdog {
                outcome: outcome.to_string(),
                pregame_price: price,
            },
            _ => PregameRead::Skip,
        }
    }
}

impl Strategy for UnderdogResilience {
    type Memory = PregameRead;

    fn name(&self) -> &str {
        "underdog_resilience"
    }

    fn decide(&self, ctx: &DecisionContext<'_>, memory: Self::Memory) -> Decision<Self::Memory> {
        let memory = match memory {
            PregameRead::Unseen => self.read_pregame(ctx),
            read => read,
        };
        let PregameRead::Underdog {
            outcome,
            pregame_price,
        } = &memory
        else {
            return Decision::hold(memory);
        };

        let Some(state) = ctx.snapshot.game_state.as_ref() else {
            return Decision::hold(memory);
        };
        if state.period < self.min_period || state.period > self.max_period {
            return Decision::hold(memory);
        }
        if state.period == self.max_period && state.clock_remaining < self.min_clock_secs {
            return Decision::hold(memory);
        }
        if state.score_diff().abs() > self.max_score_diff {
            return Decision::hold(memory);
        }

        let Some(quote) = ctx.snapshot.tick.quote(outcome) else {
            return Decision::hold(memory);
        };
        let price = quote.price;
        let still_doubted = price > self.price_min
            && price < self.price_max
            && price <= self.current_underdog_max
            && price <= pregame_price + self.max_rebound;
        if !still_doubted || ctx.portfolio.has_position(outcome) {
            return Decision::hold(memory);
        }

        let order = Order::market_buy(outcome.clone(), stake_quantity(self.stake, open_price(quote)));
        Decision::new(vec![order], memory)
    }
}
