//! Execution price selection for strategy fills and liquidations.

use crate::domain::{EventStateObservation, OrderAction, Quote, AWAY, HOME};
use serde::{Deserialize, Serialize};

/// Which quote field a strategy order executes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FillPricing {
    /// Fill at the quoted price.
    #[default]
    Mid,
    /// Buy at the ask, sell at the bid. Falls back to price when one-sided.
    CrossSpread,
}

/// How open positions are valued at forced close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LiquidationPricing {
    /// Last available tick price.
    #[default]
    LastTick,
    /// Contract payout from the final score when decided, else last tick.
    Settlement,
}

/// Price an order of the given direction executes at.
pub fn execution_price(quote: &Quote, action: OrderAction, pricing: FillPricing) -> f64 {
    match (pricing, action) {
        (FillPricing::Mid, _) => quote.price,
        (FillPricing::CrossSpread, OrderAction::Buy) => quote.ask.unwrap_or(quote.price),
        (FillPricing::CrossSpread, OrderAction::Sell) => quote.bid.unwrap_or(quote.price),
    }
}

/// Settlement payout of a moneyline outcome, if the game decides it.
///
/// Only `home`/`away` on a final, non-tied state settle; everything else is
/// `None` and the caller falls back to the last quote.
pub fn settlement_price(outcome: &str, state: Option<&EventStateObservation>) -> Option<f64> {
    let state = state.filter(|s| s.is_final)?;
    let winner = state.leader()?;
    match outcome {
        HOME | AWAY => Some(if outcome == winner { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn final_state(home: u32, away: u32) -> EventStateObservation {
        EventStateObservation::new(Utc.timestamp_opt(0, 0).unwrap(), home, away, 4, 0.0).finalized()
    }

    #[test]
    fn mid_ignores_spread() {
        let q = Quote::with_spread(0.50, 0.48, 0.53);
        assert_eq!(execution_price(&q, OrderAction::Buy, FillPricing::Mid), 0.50);
    }

    #[test]
    fn cross_spread_pays_the_spread() {
        let q = Quote::with_spread(0.50, 0.48, 0.53);
        assert_eq!(execution_price(&q, OrderAction::Buy, FillPricing::CrossSpread), 0.53);
        assert_eq!(execution_price(&q, OrderAction::Sell, FillPricing::CrossSpread), 0.48);
        let one_sided = Quote::new(0.5);
        assert_eq!(
            execution_price(&one_sided, OrderAction::Buy, FillPricing::CrossSpread),
            0.5
        );
    }

    #[test]
    fn settlement_pays_winner() {
        let s = final_state(101, 99);
        assert_eq!(settlement_price(HOME, Some(&s)), Some(1.0));
        assert_eq!(settlement_price(AWAY, Some(&s)), Some(0.0));
        assert_eq!(settlement_price("KX-OTHER", Some(&s)), None);
    }

    #[test]
    fn no_settlement_when_tied_or_live() {
        assert_eq!(settlement_price(HOME, Some(&final_state(100, 100))), None);
        let live = EventStateObservation::new(Utc.timestamp_opt(0, 0).unwrap(), 10, 2, 2, 300.0);
        assert_eq!(settlement_price(HOME, Some(&live)), None);
        assert_eq!(settlement_price(HOME, None), None);
    }
}
