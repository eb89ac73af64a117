//! Fee model: per-fill trading fees.
//!
//! Fees are always charged on top of notional: buyers pay `qty * price + fee`,
//! sellers receive `qty * price - fee`. A sell fee never exceeds the proceeds,
//! so selling cannot take cash below zero.

use serde::{Deserialize, Serialize};

/// Default Kalshi taker fee multiplier.
pub const KALSHI_DEFAULT_RATE: f64 = 0.07;

/// Guards `ceil` against float noise just above an exact cent.
const CENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FeeModel {
    #[default]
    None,
    /// Flat fee per contract.
    PerContract { fee: f64 },
    /// `ceil(rate * contracts * p * (1 - p) * 100) / 100`, rounded up to the cent.
    Kalshi {
        #[serde(default = "default_kalshi_rate")]
        rate: f64,
    },
}

fn default_kalshi_rate() -> f64 {
    KALSHI_DEFAULT_RATE
}

impl FeeModel {
    pub fn kalshi() -> Self {
        FeeModel::Kalshi {
            rate: KALSHI_DEFAULT_RATE,
        }
    }

    /// Fee for one fill of `quantity` contracts at `price`.
    pub fn compute_fee(&self, price: f64, quantity: f64) -> f64 {
        match *self {
            FeeModel::None => 0.0,
            FeeModel::PerContract { fee } => fee * quantity,
            FeeModel::Kalshi { rate } => {
                if price <= 0.0 || price >= 1.0 || quantity <= 0.0 {
                    return 0.0;
                }
                let cents = rate * quantity * price * (1.0 - price) * 100.0;
                (cents - CENT_EPSILON).ceil().max(0.0) / 100.0
            }
        }
    }

    /// Fee for a sell, capped at the sale proceeds.
    pub fn sell_fee(&self, price: f64, quantity: f64) -> f64 {
        self.compute_fee(price, quantity).min((price * quantity).max(0.0))
    }

    /// Rate or per-contract fee, for validation.
    pub fn parameter(&self) -> f64 {
        match *self {
            FeeModel::None => 0.0,
            FeeModel::PerContract { fee } => fee,
            FeeModel::Kalshi { rate } => rate,
        }
    }
}
