//! Price threshold: buy a fixed quantity whenever the price dips below a level.

use crate::domain::{Order, RejectReason, HOME};

use super::{Decision, DecisionContext, Strategy};

/// Buys `quantity` of one outcome on every snapshot where its price is below
/// `entry_threshold`, until the position would exceed `max_position` or
/// `max_entries` orders have been sent. Optionally sells everything once the
/// price reaches `exit_threshold`.
///
/// Stops buying for the rest of the run after a funds or exposure rejection.
#[derive(Debug, Clone)]
pub struct PriceThreshold {
    pub outcome: String,
    pub entry_threshold: f64,
    pub exit_threshold: Option<f64>,
    pub quantity: f64,
    pub max_position: Option<f64>,
    /// 0 = unlimited.
    pub max_entries: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceThresholdMemory {
    pub entries: u32,
    /// Set after a funds/exposure rejection.
    pub halted: bool,
}

impl PriceThreshold {
    pub fn new(outcome: impl Into<String>, entry_threshold: f64, quantity: f64) -> Self {
        Self {
            outcome: outcome.into(),
            entry_threshold,
            exit_threshold: None,
            quantity,
            max_position: None,
            max_entries: 0,
        }
    }

    pub fn default_params() -> Self {
        Self::new(HOME, 0.45, 1.0)
    }
}

impl Strategy for PriceThreshold {
    type Memory = PriceThresholdMemory;

    fn name(&self) -> &str {
        "price_threshold"
    }

    fn decide(&self, ctx: &DecisionContext<'_>, mut memory: Self::Memory) -> Decision<Self::Memory> {
        if ctx.recent_rejections.iter().any(|r| {
            matches!(
                r.reason,
                RejectReason::InsufficientFunds { .. } | RejectReason::ExposureLimitExceeded { .. }
            )
        }) {
            memory.halted = true;
        }

        let Some(price) = ctx.snapshot.price(&self.outcome) else {
            return Decision::hold(memory);
        };
        let held = ctx.portfolio.position_qty(&self.outcome);

        if let Some(exit) = self.exit_threshold {
            if held > 0.0 && price >= exit {
                return Decision::new(vec![Order::market_sell(&self.outcome, held)], memory);
            }
        }

        if memory.halted || price >= self.entry_threshold {
            return Decision::hold(memory);
        }
        if self.max_entries > 0 && memory.entries >= self.max_entries {
            return Decision::hold(memory);
        }
        if self
            .max_position
            .is_some_and(|max| held + self.quantity > max)
        {
            return Decision::hold(memory);
        }

        memory.entries += 1;
        Decision::new(vec![Order::market_buy(&self.outcome, self.quantity)], memory)
    }
}
