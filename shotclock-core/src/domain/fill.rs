use super::order::{OrderAction, OrderKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What produced a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillKind {
    /// A strategy order that passed every check.
    Strategy,
    /// Forced close at final state or end of stream.
    Liquidation,
}

/// An executed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Monotone sequence number within the run.
    pub seq: usize,
    pub snapshot_index: usize,
    pub timestamp: DateTime<Utc>,
    pub outcome: String,
    pub action: OrderAction,
    pub quantity: f64,
    /// Execution price in [0, 1].
    pub price: f64,
    pub fee: f64,
    pub order_kind: OrderKind,
    pub kind: FillKind,
    /// Gross PnL realized by this fill. Zero for buys.
    pub realized_pnl: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }

    /// Signed cash change: negative for buys, positive for sells, fee always deducted.
    pub fn cash_delta(&self) -> f64 {
        match self.action {
            OrderAction::Buy => -self.notional() - self.fee,
            OrderAction::Sell => self.notional() - self.fee,
        }
    }

    pub fn is_liquidation(&self) -> bool {
        self.kind == FillKind::Liquidation
    }
}
