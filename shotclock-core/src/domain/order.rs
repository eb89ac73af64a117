//! Orders emitted by strategies, and the rejections the simulator returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Buy,
    Sell,
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderAction::Buy => write!(f, "buy"),
            OrderAction::Sell => write!(f, "sell"),
        }
    }
}

/// Market or limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderKind {
    /// Fill at whatever the tick implies.
    Market,
    /// Buy fills if tick price <= limit, sell fills if tick price >= limit.
    Limit { limit_price: f64 },
}

/// A strategy's request to trade one outcome on the current snapshot.
///
/// Orders are all-or-nothing and live for exactly one snapshot: anything that
/// cannot fill is rejected, never queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub outcome: String,
    pub action: OrderAction,
    pub quantity: f64,
    pub kind: OrderKind,
}

impl Order {
    pub fn market_buy(outcome: impl Into<String>, quantity: f64) -> Self {
        Self {
            outcome: outcome.into(),
            action: OrderAction::Buy,
            quantity,
            kind: OrderKind::Market,
        }
    }

    pub fn market_sell(outcome: impl Into<String>, quantity: f64) -> Self {
        Self {
            outcome: outcome.into(),
            action: OrderAction::Sell,
            quantity,
            kind: OrderKind::Market,
        }
    }

    pub fn limit_buy(outcome: impl Into<String>, quantity: f64, limit_price: f64) -> Self {
        Self {
            outcome: outcome.into(),
            action: OrderAction::Buy,
            quantity,
            kind: OrderKind::Limit { limit_price },
        }
    }

    pub fn limit_sell(outcome: impl Into<String>, quantity: f64, limit_price: f64) -> Self {
        Self {
            outcome: outcome.into(),
            action: OrderAction::Sell,
            quantity,
            kind: OrderKind::Limit { limit_price },
        }
    }

    pub fn limit_price(&self) -> Option<f64> {
        match self.kind {
            OrderKind::Market => None,
            OrderKind::Limit { limit_price } => Some(limit_price),
        }
    }
}

/// Why an order did not fill. All variants are recoverable: the run continues.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// Strategy bug: non-positive quantity, unquoted outcome, oversized sell.
    #[error("invalid order: {detail}")]
    InvalidOrder { detail: String },

    #[error("insufficient funds: required {required:.4}, available {available:.4}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("exposure limit exceeded: resulting exposure {resulting} > limit {limit}")]
    ExposureLimitExceeded { resulting: f64, limit: f64 },

    #[error("limit {limit_price} not marketable at {market_price}")]
    LimitNotMarketable { limit_price: f64, market_price: f64 },

    #[error("market closed: positions already liquidated")]
    MarketClosed,
}

impl RejectReason {
    /// Stable snake_case label, used as a key in rejection counts.
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::InvalidOrder { .. } => "invalid_order",
            RejectReason::InsufficientFunds { .. } => "insufficient_funds",
            RejectReason::ExposureLimitExceeded { .. } => "exposure_limit_exceeded",
            RejectReason::LimitNotMarketable { .. } => "limit_not_marketable",
            RejectReason::MarketClosed => "market_closed",
        }
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        RejectReason::InvalidOrder {
            detail: detail.into(),
        }
    }
}

/// A rejected order, kept in the run result for post-hoc analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub snapshot_index: usize,
    pub timestamp: DateTime<Utc>,
    pub order: Order,
    pub reason: RejectReason,
}
