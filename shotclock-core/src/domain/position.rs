use serde::{Deserialize, Serialize};

/// Quantity dust below this is treated as flat.
pub const QTY_EPSILON: f64 = 1e-9;

/// Long holding in a single outcome, tracked at weighted-average cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub outcome: String,
    pub quantity: f64,
    pub avg_entry_price: f64,
}

impl Position {
    pub fn new(outcome: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
            quantity: 0.0,
            avg_entry_price: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity <= QTY_EPSILON
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        self.quantity * current_price
    }

    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.avg_entry_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.quantity * (current_price - self.avg_entry_price)
    }

    /// Add to the position, re-averaging the entry price.
    pub fn add(&mut self, quantity: f64, price: f64) {
        let total_qty = self.quantity + quantity;
        self.avg_entry_price = (self.cost_basis() + quantity * price) / total_qty;
        self.quantity = total_qty;
    }

    /// Reduce the position and return the gross realized PnL of the reduction.
    ///
    /// Average entry price is unchanged by a reduction; a position reduced to
    /// dust is reset to flat.
    pub fn reduce(&mut self, quantity: f64, price: f64) -> f64 {
        let sold = quantity.min(self.quantity);
        let realized = (price - self.avg_entry_price) * sold;
        self.quantity -= sold;
        if self.is_flat() {
            self.quantity = 0.0;
            self.avg_entry_price = 0.0;
        }
        realized
    }
}
