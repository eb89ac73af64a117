//! PortfolioState: cash, positions, marks and PnL for one run.

use super::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Absolute tolerance for accounting comparisons.
pub const ACCOUNTING_EPSILON: f64 = 1e-9;

/// Aggregate portfolio state, owned by the simulator.
///
/// Two views of equity must agree at every step:
/// `cash + Σ qty * mark == initial_cash + realized + unrealized - fees`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub initial_cash: f64,
    /// Open positions keyed by outcome label. Flat positions are removed.
    pub positions: BTreeMap<String, Position>,
    /// Gross realized PnL (fees tracked separately).
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub fees_paid: f64,
    /// Last known price per outcome; carried forward when a tick omits it.
    pub marks: BTreeMap<String, f64>,
}

impl PortfolioState {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            positions: BTreeMap::new(),
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            fees_paid: 0.0,
            marks: BTreeMap::new(),
        }
    }

    /// Mark price for an outcome, falling back to entry price if never quoted.
    pub fn mark(&self, outcome: &str) -> Option<f64> {
        self.marks
            .get(outcome)
            .copied()
            .or_else(|| self.positions.get(outcome).map(|p| p.avg_entry_price))
    }

    /// Cash plus marked value of every open position.
    pub fn equity(&self) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|p| p.market_value(self.mark(&p.outcome).unwrap_or(p.avg_entry_price)))
            .sum();
        self.cash + position_value
    }

    /// Equity reconstructed from the PnL ledger.
    pub fn ledger_equity(&self) -> f64 {
        self.initial_cash + self.realized_pnl + self.unrealized_pnl - self.fees_paid
    }

    /// Net PnL since start: realized + unrealized - fees.
    pub fn total_pnl(&self) -> f64 {
        self.realized_pnl + self.unrealized_pnl - self.fees_paid
    }

    pub fn position(&self, outcome: &str) -> Option<&Position> {
        self.positions.get(outcome).filter(|p| !p.is_flat())
    }

    pub fn position_qty(&self, outcome: &str) -> f64 {
        self.position(outcome).map_or(0.0, |p| p.quantity)
    }

    pub fn has_position(&self, outcome: &str) -> bool {
        self.position(outcome).is_some()
    }

    pub fn is_flat(&self) -> bool {
        self.positions.values().all(Position::is_flat)
    }

    /// Sum of contracts held across all outcomes.
    pub fn gross_exposure(&self) -> f64 {
        self.positions.values().map(|p| p.quantity).sum()
    }

    /// Recompute unrealized PnL from current marks.
    pub fn recompute_unrealized(&mut self) {
        self.unrealized_pnl = self
            .positions
            .values()
            .map(|p| p.unrealized_pnl(self.mark(&p.outcome).unwrap_or(p.avg_entry_price)))
            .sum();
    }

    /// Whether both equity views agree within tolerance.
    pub fn is_consistent(&self) -> bool {
        (self.equity() - self.ledger_equity()).abs() <= ACCOUNTING_EPSILON * self.initial_cash.abs().max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_portfolio_equity_is_cash() {
        let p = PortfolioState::new(100.0);
        assert_eq!(p.equity(), 100.0);
        assert_eq!(p.ledger_equity(), 100.0);
        assert!(p.is_flat());
    }

    #[test]
    fn equity_views_agree_after_mark() {
        let mut p = PortfolioState::new(100.0);
        let mut pos = Position::new("home");
        pos.add(10.0, 0.40);
        p.cash -= 4.0;
        p.positions.insert("home".into(), pos);
        p.marks.insert("home".into(), 0.55);
        p.recompute_unrealized();
        assert!((p.equity() - 101.5).abs() < 1e-9);
        assert!(p.is_consistent());
        assert_eq!(p.position_qty("home"), 10.0);
        assert_eq!(p.position_qty("away"), 0.0);
    }

    #[test]
    fn missing_mark_falls_back_to_entry() {
        let mut p = PortfolioState::new(10.0);
        let mut pos = Position::new("away");
        pos.add(5.0, 0.2);
        p.cash -= 1.0;
        p.positions.insert("away".into(), pos);
        assert_eq!(p.mark("away"), Some(0.2));
        assert!((p.equity() - 10.0).abs() < 1e-12);
    }
}
