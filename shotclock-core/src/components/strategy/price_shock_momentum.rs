//! Price-shock momentum: follow a sharp upward jump, exit on fixed moves.

use crate::domain::{Order, OrderAction};
use std::collections::BTreeMap;

use super::{stake_quantity, Decision, DecisionContext, Strategy};

/// When an outcome's price rises by at least `min_shock_move` between two
/// consecutive in-band observations, buy `stake` dollars of it. Exit the whole
/// position once price moves `take_profit_move` above or `stop_loss_move`
/// below the entry.
#[derive(Debug, Clone)]
pub struct PriceShockMomentum {
    pub min_shock_move: f64,
    pub take_profit_move: f64,
    pub stop_loss_move: f64,
    pub stake: f64,
    /// Only prices strictly inside (price_min, price_max) are considered.
    pub price_min: f64,
    pub price_max: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShockMemory {
    /// Last in-band price seen per outcome.
    pub last_price: BTreeMap<String, f64>,
    /// Entry price per outcome with an open position.
    pub entry_price: BTreeMap<String, f64>,
}

impl PriceShockMomentum {
    pub fn default_params() -> Self {
        Self {
            min_shock_move: 0.10,
            take_profit_move: 0.10,
            stop_loss_move: 0.08,
            stake: 25.0,
            price_min: 0.01,
            price_max: 0.99,
        }
    }
}

impl Strategy for PriceShockMomentum {
    type Memory = ShockMemory;

    fn name(&self) -> &str {
        "price_shock_momentum"
    }

    fn decide(&self, ctx: &DecisionContext<'_>, mut memory: Self::Memory) -> Decision<Self::Memory> {
        let mut orders = Vec::new();
        let tick = &ctx.snapshot.tick;

        // A rejected entry never opened a position.
        for rejection in ctx.recent_rejections {
            if rejection.order.action == OrderAction::Buy
                && !ctx.portfolio.has_position(&rejection.order.outcome)
            {
                memory.entry_price.remove(&rejection.order.outcome);
            }
        }

        // Exits first.
        for (outcome, position) in &ctx.portfolio.positions {
            if position.is_flat() {
                continue;
            }
            let (Some(current), Some(entry)) = (tick.price(outcome), memory.entry_price.get(outcome).copied())
            else {
                continue;
            };
            let moved = current - entry;
            if moved >= self.take_profit_move || moved <= -self.stop_loss_move {
                orders.push(Order::market_sell(outcome, position.quantity));
                memory.entry_price.remove(outcome);
            }
        }

        // Entries.
        for (outcome, quote) in &tick.side_prices {
            let p = quote.price;
            if !(self.price_min < p && p < self.price_max) {
                continue;
            }
            let prev = memory.last_price.insert(outcome.clone(), p);

            if ctx.portfolio.has_position(outcome) || memory.entry_price.contains_key(outcome) {
                continue;
            }
            let Some(prev) = prev else {
                continue;
            };
            if p - prev >= self.min_shock_move {
                orders.push(Order::market_buy(outcome, stake_quantity(self.stake, p)));
                memory.entry_price.insert(outcome.clone(), p);
            }
        }

        Decision::new(orders, memory)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{holding, snap};
    use super::*;
    use crate::domain::{PortfolioState, RejectReason, Rejection};

    fn decide(
        s: &PriceShockMomentum,
        snapshot: &crate::domain::Snapshot,
        portfolio: &PortfolioState,
        memory: ShockMemory,
    ) -> Decision<ShockMemory> {
        s.decide(
            &DecisionContext {
                snapshot,
                portfolio,
                recent_rejections: &[],
            },
            memory,
        )
    }

    #[test]
    fn first_observation_only_primes_memory() {
        let s = PriceShockMomentum::default_params();
        let d = decide(&s, &snap(0, 0.40, 0.60), &PortfolioState::new(100.0), Default::default());
        assert!(d.orders.is_empty());
        assert_eq!(d.memory.last_price["home"], 0.40);
    }

    #[test]
    fn buys_on_upward_shock() {
        let s = PriceShockMomentum::default_params();
        let p = PortfolioState::new(100.0);
        let d0 = decide(&s, &snap(0, 0.40, 0.60), &p, Default::default());
        let d1 = decide(&s, &snap(1, 0.52, 0.48), &p, d0.memory);
        assert_eq!(d1.orders.len(), 1);
        assert_eq!(d1.orders[0].outcome, "home");
        assert!((d1.orders[0].quantity - 25.0 / 0.52).abs() < 1e-9);
        assert_eq!(d1.memory.entry_price["home"], 0.52);
    }

    #[test]
    fn exits_on_take_profit_and_stop_loss() {
        let s = PriceShockMomentum::default_params();
        let mut memory = ShockMemory::default();
        memory.entry_price.insert("home".into(), 0.50);
        memory.last_price.insert("home".into(), 0.50);

        let tp = decide(&s, &snap(2, 0.61, 0.39), &holding("home", 50.0, 0.5), memory.clone());
        assert_eq!(tp.orders[0].action, OrderAction::Sell);
        assert!(!tp.memory.entry_price.contains_key("home"));

        let sl = decide(&s, &snap(2, 0.41, 0.59), &holding("home", 50.0, 0.5), memory.clone());
        assert_eq!(sl.orders[0].action, OrderAction::Sell);

        let hold = decide(&s, &snap(2, 0.55, 0.45), &holding("home", 50.0, 0.5), memory);
        assert!(hold.orders.is_empty());
    }

    #[test]
    fn out_of_band_prices_are_ignored() {
        let s = PriceShockMomentum::default_params();
        let p = PortfolioState::new(100.0);
        let d0 = decide(&s, &snap(0, 0.85, 0.15), &p, Default::default());
        let d1 = decide(&s, &snap(1, 0.995, 0.005), &p, d0.memory);
        assert!(d1.orders.is_empty());
        assert_eq!(d1.memory.last_price["home"], 0.85);
    }

    #[test]
    fn rejected_entry_can_reenter_on_next_shock() {
        let s = PriceShockMomentum::default_params();
        let p = PortfolioState::new(5.0);
        let d0 = decide(&s, &snap(0, 0.30, 0.50), &p, Default::default());
        let d1 = decide(&s, &snap(1, 0.45, 0.50), &p, d0.memory);
        assert_eq!(d1.orders.len(), 1);
        assert!(d1.memory.entry_price.contains_key("home"));

        let rejection = Rejection {
            snapshot_index: 1,
            timestamp: snap(1, 0.45, 0.50).timestamp(),
            order: d1.orders[0].clone(),
            reason: RejectReason::InsufficientFunds {
                required: 25.0,
                available: 5.0,
            },
        };
        let d2 = s.decide(
            &DecisionContext {
                snapshot: &snap(2, 0.30, 0.50),
                portfolio: &p,
                recent_rejections: std::slice::from_ref(&rejection),
            },
            d1.memory,
        );
        assert!(d2.orders.is_empty());
        assert!(!d2.memory.entry_price.contains_key("home"));

        let d3 = decide(&s, &snap(3, 0.45, 0.50), &p, d2.memory);
        assert_eq!(d3.orders.len(), 1);
        assert_eq!(d3.orders[0].outcome, "home");
        assert_eq!(d3.orders[0].action, OrderAction::Buy);
    }
}
