//! Panic spread fade: wait out a spread blow-out on one side, then buy the other.

use crate::domain::Order;
use std::collections::{BTreeMap, VecDeque};

use super::{open_price, stake_quantity, Decision, DecisionContext, Strategy};

/// Watches bid/ask spread and price per outcome over a rolling window.
///
/// A panic starts when an outcome's spread is both wider than
/// `spread_spike_min` and `spread_spike_factor` times its recent average,
/// while its price has risen at least `min_price_jump` across the window.
/// The panic is faded on the first tick where the panicking side stops making
/// new highs: buy `stake` dollars of the opposite outcome.
#[derive(Debug, Clone)]
pub struct PanicSpreadFade {
    pub spread_window: usize,
    pub spread_spike_min: f64,
    pub spread_spike_factor: f64,
    pub min_price_jump: f64,
    pub min_period: u32,
    /// Inclusive band the faded side must be priced in.
    pub price_min: f64,
    pub price_max: f64,
    pub stake: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanicTrack {
    pub spreads: VecDeque<f64>,
    pub prices: VecDeque<f64>,
    pub panic: Option<Panic>,
}

/// An outcome still running up, with the side to fade into.
#[derive(Debug, Clone, PartialEq)]
pub struct Panic {
    pub peak: f64,
    pub opposite: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanicMemory {
    pub tracks: BTreeMap<String, PanicTrack>,
}

impl PanicSpreadFade {
    pub fn default_params() -> Self {
        Self {
            spread_window: 20,
            spread_spike_min: 0.05,
            spread_spike_factor: 2.0,
            min_price_jump: 0.05,
            min_period: 2,
            price_min: 0.01,
            price_max: 0.99,
            stake: 25.0,
        }
    }

    fn push_capped(&self, window: &mut VecDeque<f64>, value: f64) {
        window.push_back(value);
        while window.len() > self.spread_window {
            window.pop_front();
        }
    }

    /// Whether the latest observation in `track` opens a panic.
    fn is_panic(&self, track: &PanicTrack, spread: f64, price: f64) -> bool {
        if track.spreads.len() < 3 || track.prices.len() < 3 {
            return false;
        }
        let history = track.spreads.len() - 1;
        let avg_spread = track.spreads.iter().take(history).sum::<f64>() / history as f64;
        if avg_spread <= 0.0 {
            return false;
        }
        if spread < self.spread_spike_min || spread < self.spread_spike_factor * avg_spread {
            return false;
        }
        track
            .prices
            .front()
            .is_some_and(|oldest| price - oldest >= self.min_price_jump)
    }
}

impl Strategy for PanicSpreadFade {
    type Memory = PanicMemory;

    fn name(&self) -> &str {
        "panic_spread_fade"
    }

    fn decide(&self, ctx: &DecisionContext<'_>, mut memory: Self::Memory) -> Decision<Self::Memory> {
        let Some(state) = ctx.snapshot.game_state.as_ref() else {
            return Decision::hold(memory);
        };
        if state.period < self.min_period {
            return Decision::hold(memory);
        }
        let tick = &ctx.snapshot.tick;

        for (outcome, quote) in &tick.side_prices {
            let mut track = memory.tracks.remove(outcome).unwrap_or_default();
            if let Some(spread) = quote.spread() {
                self.push_capped(&mut track.spreads, spread);
            }
            self.push_capped(&mut track.prices, quote.price);
            memory.tracks.insert(outcome.clone(), track);
        }

        // Fade panics that stopped making new highs.
        let mut orders = Vec::new();
        for (outcome, track) in memory.tracks.iter_mut() {
            let Some(panic) = track.panic.as_mut() else {
                continue;
            };
            let Some(price) = tick.price(outcome) else {
                continue;
            };
            if price > panic.peak {
                panic.peak = price;
                continue;
            }
            if let Some(quote) = tick.quote(&panic.opposite) {
                let in_band = (self.price_min..=self.price_max).contains(&quote.price);
                if in_band && !ctx.portfolio.has_position(&panic.opposite) {
                    let qty = stake_quantity(self.stake, open_price(quote));
                    orders.push(Order::market_buy(panic.opposite.clone(), qty));
                }
            }
            track.panic = None;
        }

        // Open new panics.
        for (outcome, quote) in &tick.side_prices {
            let Some(spread) = quote.spread() else {
                continue;
            };
            let Some(opposite) = tick.opposite(outcome) else {
                continue;
            };
            let Some(track) = memory.tracks.get_mut(outcome) else {
                continue;
            };
            if track.panic.is_none() && self.is_panic(track, spread, quote.price) {
                track.panic = Some(Panic {
                    peak: quote.price,
                    opposite: opposite.to_string(),
                });
            }
        }

        Decision::new(orders, memory)
    }
}
