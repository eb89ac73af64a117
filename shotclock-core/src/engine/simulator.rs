//! Portfolio simulator: validates orders against one snapshot and applies fills.
//!
//! Orders are checked and filled in the order the strategy returned them, so a
//! later order in the same batch sees cash and positions updated by earlier
//! ones. No partial fills, no queueing: an order fills in full or is rejected.

use crate::domain::{
    Fill, FillKind, Order, OrderAction, OrderKind, PortfolioState, RejectReason, Rejection,
    Snapshot, ACCOUNTING_EPSILON, QTY_EPSILON,
};
use crate::engine::execution::{execution_price, settlement_price, LiquidationPricing};
use crate::engine::portfolio_update::apply_fill;
use crate::engine::state::{ExposureMode, SimConfig};
use tracing::debug;

/// Simulated account for a single run.
#[derive(Debug, Clone)]
pub struct PortfolioSimulator {
    config: SimConfig,
    portfolio: PortfolioState,
    next_seq: usize,
    closed: bool,
}

impl PortfolioSimulator {
    pub fn new(config: SimConfig) -> Self {
        let portfolio = PortfolioState::new(config.initial_cash);
        Self {
            config,
            portfolio,
            next_seq: 0,
            closed: false,
        }
    }

    pub fn state(&self) -> &PortfolioState {
        &self.portfolio
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Whether terminal liquidation has happened. A closed account rejects all orders.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Update marks from the snapshot's tick and recompute unrealized PnL.
    ///
    /// Outcomes the tick does not quote keep their previous mark.
    pub fn mark(&mut self, snapshot: &Snapshot) {
        for (outcome, quote) in &snapshot.tick.side_prices {
            if quote.is_valid() {
                self.portfolio.marks.insert(outcome.clone(), quote.price);
            }
        }
        self.portfolio.recompute_unrealized();
    }

    /// Apply a batch of orders against the snapshot's tick.
    pub fn apply(&mut self, orders: &[Order], snapshot: &Snapshot) -> (Vec<Fill>, Vec<Rejection>) {
        let mut fills = Vec::new();
        let mut rejections = Vec::new();

        for order in orders {
            match self.check(order, snapshot) {
                Ok((price, fee)) => {
                    let mut fill = Fill {
                        seq: self.next_seq,
                        snapshot_index: snapshot.index,
                        timestamp: snapshot.timestamp(),
                        outcome: order.outcome.clone(),
                        action: order.action,
                        quantity: order.quantity,
                        price,
                        fee,
                        order_kind: order.kind,
                        kind: FillKind::Strategy,
                        realized_pnl: 0.0,
                    };
                    self.next_seq += 1;
                    apply_fill(&mut fill, &mut self.portfolio);
                    self.portfolio.recompute_unrealized();
                    debug!(
                        snapshot = snapshot.index,
                        outcome = %fill.outcome,
                        action = %fill.action,
                        qty = fill.quantity,
                        price = fill.price,
                        fee = fill.fee,
                        "fill"
                    );
                    fills.push(fill);
                }
                Err(reason) => {
                    debug!(
                        snapshot = snapshot.index,
                        outcome = %order.outcome,
                        action = %order.action,
                        reason = %reason,
                        "order rejected"
                    );
                    rejections.push(Rejection {
                        snapshot_index: snapshot.index,
                        timestamp: snapshot.timestamp(),
                        order: order.clone(),
                        reason,
                    });
                }
            }
        }

        (fills, rejections)
    }

    /// Validate an order and return its execution `(price, fee)`.
    fn check(&self, order: &Order, snapshot: &Snapshot) -> Result<(f64, f64), RejectReason> {
        if !order.quantity.is_finite() || order.quantity <= 0.0 {
            return Err(RejectReason::invalid(format!(
                "quantity must be positive, got {}",
                order.quantity
            )));
        }
        if let Some(limit) = order.limit_price() {
            if !limit.is_finite() || !(0.0..=1.0).contains(&limit) {
                return Err(RejectReason::invalid(format!(
                    "limit price {limit} outside [0, 1]"
                )));
            }
        }
        let quote = snapshot
            .tick
            .quote(&order.outcome)
            .filter(|q| q.is_valid())
            .ok_or_else(|| {
                RejectReason::invalid(format!("outcome '{}' not quoted", order.outcome))
            })?;

        if self.closed {
            return Err(RejectReason::MarketClosed);
        }

        let price = execution_price(quote, order.action, self.config.execution.fill_pricing);

        if let OrderKind::Limit { limit_price } = order.kind {
            let marketable = match order.action {
                OrderAction::Buy => price <= limit_price,
                OrderAction::Sell => price >= limit_price,
            };
            if !marketable {
                return Err(RejectReason::LimitNotMarketable {
                    limit_price,
                    market_price: price,
                });
            }
        }

        let fee_model = &self.config.execution.fee_model;
        let fee = match order.action {
            OrderAction::Buy => fee_model.compute_fee(price, order.quantity),
            OrderAction::Sell => fee_model.sell_fee(price, order.quantity),
        };

        match order.action {
            OrderAction::Buy => {
                if let Some(limit) = self.config.max_position {
                    let resulting = match self.config.exposure_mode {
                        ExposureMode::Independent => {
                            self.portfolio.position_qty(&order.outcome) + order.quantity
                        }
                        ExposureMode::Netted => self.portfolio.gross_exposure() + order.quantity,
                    };
                    if resulting > limit + QTY_EPSILON {
                        return Err(RejectReason::ExposureLimitExceeded { resulting, limit });
                    }
                }
                let required = order.quantity * price + fee;
                if required > self.portfolio.cash + ACCOUNTING_EPSILON {
                    return Err(RejectReason::InsufficientFunds {
                        required,
                        available: self.portfolio.cash,
                    });
                }
            }
            OrderAction::Sell => {
                let held = self.portfolio.position_qty(&order.outcome);
                if order.quantity > held + QTY_EPSILON {
                    return Err(RejectReason::invalid(format!(
                        "sell {} exceeds held {held} of '{}'",
                        order.quantity, order.outcome
                    )));
                }
            }
        }

        Ok((price, fee))
    }

    /// Force-close every open position and close the account.
    ///
    /// Prices: settlement payout when configured and decided, else the current
    /// tick's quote for the outcome, else the last carried-forward mark.
    pub fn liquidate(&mut self, snapshot: &Snapshot) -> Vec<Fill> {
        let open: Vec<(String, f64)> = self
            .portfolio
            .positions
            .values()
            .filter(|p| !p.is_flat())
            .map(|p| (p.outcome.clone(), p.quantity))
            .collect();

        let mut fills = Vec::with_capacity(open.len());
        for (outcome, quantity) in open {
            let settled = match self.config.execution.liquidation_pricing {
                LiquidationPricing::Settlement => {
                    settlement_price(&outcome, snapshot.game_state.as_ref())
                }
                LiquidationPricing::LastTick => None,
            };
            let price = settled
                .or_else(|| {
                    snapshot.tick.quote(&outcome).filter(|q| q.is_valid()).map(|q| {
                        execution_price(q, OrderAction::Sell, self.config.execution.fill_pricing)
                    })
                })
                .or_else(|| self.portfolio.mark(&outcome))
                .unwrap_or(0.0);
            let fee = self.config.execution.fee_model.sell_fee(price, quantity);

            let mut fill = Fill {
                seq: self.next_seq,
                snapshot_index: snapshot.index,
                timestamp: snapshot.timestamp(),
                outcome: outcome.clone(),
                action: OrderAction::Sell,
                quantity,
                price,
                fee,
                order_kind: OrderKind::Market,
                kind: FillKind::Liquidation,
                realized_pnl: 0.0,
            };
            self.next_seq += 1;
            apply_fill(&mut fill, &mut self.portfolio);
            self.portfolio.marks.insert(outcome, price);
            debug!(
                snapshot = snapshot.index,
                outcome = %fill.outcome,
                qty = fill.quantity,
                price = fill.price,
                "liquidation fill"
            );
            fills.push(fill);
        }

        self.portfolio.recompute_unrealized();
        self.closed = true;
        fills
    }

    pub fn into_state(self) -> PortfolioState {
        self.portfolio
    }
}
