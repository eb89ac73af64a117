//! Portfolio update: applies fills to the portfolio.
//!
//! Handles position creation and closure, realized PnL, fee accounting and
//! cash. Positions are long-only: a sell never exceeds the held quantity.

use crate::domain::{Fill, OrderAction, PortfolioState, Position};

/// Apply one fill and record its gross realized PnL on the fill.
///
/// - Buy: deduct `qty * price + fee`, add to position at weighted-average cost.
/// - Sell: add `qty * price - fee`, reduce position, realize `(price - avg) * qty`.
///
/// Unrealized PnL is not touched here; callers re-mark after applying.
pub fn apply_fill(fill: &mut Fill, portfolio: &mut PortfolioState) {
    portfolio.cash += fill.cash_delta();
    portfolio.fees_paid += fill.fee;

    match fill.action {
        OrderAction::Buy => {
            portfolio
                .positions
                .entry(fill.outcome.clone())
                .or_insert_with(|| Position::new(fill.outcome.clone()))
                .add(fill.quantity, fill.price);
            fill.realized_pnl = 0.0;
        }
        OrderAction::Sell => {
            let realized = match portfolio.positions.get_mut(&fill.outcome) {
                Some(pos) => pos.reduce(fill.quantity, fill.price),
                None => 0.0,
            };
            fill.realized_pnl = realized;
            portfolio.realized_pnl += realized;
            if portfolio
                .positions
                .get(&fill.outcome)
                .is_some_and(Position::is_flat)
            {
                portfolio.positions.remove(&fill.outcome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FillKind, OrderKind};
    use chrono::{TimeZone, Utc};

    fn fill(action: OrderAction, price: f64, qty: f64, fee: f64) -> Fill {
        Fill {
            seq: 0,
            snapshot_index: 0,
            timestamp: Utc.timestamp_opt(10, 0).unwrap(),
            outcome: "home".into(),
            action,
            quantity: qty,
            price,
            fee,
            order_kind: OrderKind::Market,
            kind: FillKind::Strategy,
            realized_pnl: 0.0,
        }
    }

    #[test]
    fn buy_creates_position_and_spends_cash() {
        let mut p = PortfolioState::new(100.0);
        apply_fill(&mut fill(OrderAction::Buy, 0.40, 10.0, 0.02), &mut p);
        assert!((p.cash - 95.98).abs() < 1e-12);
        assert_eq!(p.position_qty("home"), 10.0);
        assert!((p.fees_paid - 0.02).abs() < 1e-12);
    }

    #[test]
    fn sell_closes_and_realizes() {
        let mut p = PortfolioState::new(100.0);
        apply_fill(&mut fill(OrderAction::Buy, 0.40, 10.0, 0.0), &mut p);
        let mut sell = fill(OrderAction::Sell, 0.55, 10.0, 0.0);
        apply_fill(&mut sell, &mut p);

        assert!((sell.realized_pnl - 1.5).abs() < 1e-12);
        assert!((p.realized_pnl - 1.5).abs() < 1e-12);
        assert!((p.cash - 101.5).abs() < 1e-12);
        assert!(p.positions.is_empty());
    }

    #[test]
    fn partial_sell_keeps_average() {
        let mut p = PortfolioState::new(100.0);
        let mut fills = vec![
            fill(OrderAction::Buy, 0.40, 10.0, 0.0),
            fill(OrderAction::Buy, 0.60, 10.0, 0.0),
            fill(OrderAction::Sell, 0.70, 5.0, 0.0),
        ];
        for f in &mut fills {
            apply_fill(f, &mut p);
        }
        let pos = p.position("home").unwrap();
        assert_eq!(pos.quantity, 15.0);
        assert!((pos.avg_entry_price - 0.50).abs() < 1e-12);
        assert!((fills[2].realized_pnl - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ledger_identity_holds_after_round_trip_with_fees() {
        let mut p = PortfolioState::new(50.0);
        apply_fill(&mut fill(OrderAction::Buy, 0.30, 20.0, 0.05), &mut p);
        apply_fill(&mut fill(OrderAction::Sell, 0.20, 20.0, 0.04), &mut p);
        p.recompute_unrealized();
        assert!(p.is_consistent());
        assert!((p.equity() - (50.0 - 2.0 - 0.09)).abs() < 1e-9);
    }
}
