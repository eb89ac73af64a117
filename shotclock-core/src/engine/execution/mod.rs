//! Execution model: fill pricing, liquidation pricing and fees.
//!
//! Stateless: carries only configuration. The simulator asks it for a price
//! and a fee, and applies the result to the portfolio itself.

pub mod cost_model;
pub mod fill_price;

pub use cost_model::{FeeModel, KALSHI_DEFAULT_RATE};
pub use fill_price::{execution_price, settlement_price, FillPricing, LiquidationPricing};

use serde::{Deserialize, Serialize};

/// Configuration for order execution.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub fee_model: FeeModel,
    #[serde(default)]
    pub fill_pricing: FillPricing,
    #[serde(default)]
    pub liquidation_pricing: LiquidationPricing,
}

impl ExecutionConfig {
    pub fn frictionless() -> Self {
        Self::default()
    }

    pub fn with_fees(fee_model: FeeModel) -> Self {
        Self {
            fee_model,
            ..Self::default()
        }
    }
}
