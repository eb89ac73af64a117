//! Performance metrics: pure functions of a run's recorded history.
//!
//! Everything here is recomputable from the run artifact alone: the equity
//! curve, the fill ledger and the rejection log. Round trips are rebuilt by
//! replaying fills per outcome: a trip opens when an outcome goes from flat
//! to held and closes when it returns to flat.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shotclock_core::domain::{Fill, OrderAction, Rejection, QTY_EPSILON};
use shotclock_core::engine::EquityPoint;

/// Entry-price buckets, as `(label, upper bound exclusive)`.
pub const ENTRY_BUCKETS: &[(&str, f64)] = &[
    ("0-0.05", 0.05),
    ("0.05-0.10", 0.10),
    ("0.10-0.15", 0.15),
    ("0.15+", f64::INFINITY),
];

/// Profit factor reported when there are profits and no losses.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

/// One flat → open → flat cycle in a single outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub outcome: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    /// Total contracts bought during the trip.
    pub quantity: f64,
    /// Weighted-average buy price.
    pub entry_price: f64,
    /// Weighted-average sell price.
    pub exit_price: f64,
    pub gross_pnl: f64,
    /// Fees on every fill of the trip, entry and exit.
    pub fees: f64,
    pub net_pnl: f64,
    /// Closed by forced liquidation rather than a strategy sell.
    pub liquidated: bool,
}

impl RoundTrip {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn holding_secs(&self) -> f64 {
        (self.closed_at - self.opened_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Per-bucket statistics over round trips grouped by entry price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub count: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub total_fees: f64,
    pub avg_fee: f64,
}

/// Summary metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub initial_cash: f64,
    pub final_equity: f64,
    pub total_return: f64,
    /// Net of fees.
    pub total_pnl: f64,
    /// Before fees.
    pub gross_pnl: f64,
    pub total_fees: f64,
    /// Peak-to-trough decline as a negative fraction (e.g. -0.15).
    pub max_drawdown: f64,
    /// Fills of any kind.
    pub trade_count: usize,
    pub liquidation_count: usize,
    pub round_trips: usize,
    /// Fraction of closed round trips with positive net PnL.
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_fee_per_round_trip: f64,
    pub profit_factor: f64,
    pub avg_holding_secs: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub buckets: BTreeMap<String, BucketStats>,
    pub rejections_by_reason: BTreeMap<String, usize>,
}

impl RunMetrics {
    /// Compute all metrics from a run's recorded history.
    pub fn compute(
        initial_cash: f64,
        equity_curve: &[EquityPoint],
        fills: &[Fill],
        rejections: &[Rejection],
    ) -> Self {
        let final_equity = equity_curve.last().map_or(initial_cash, |p| p.equity);
        let mut equity = Vec::with_capacity(equity_curve.len() + 1);
        equity.push(initial_cash);
        equity.extend(equity_curve.iter().map(|p| p.equity));

        let trips = round_trips(fills);
        let total_pnl = final_equity - initial_cash;
        let total_fees: f64 = fills.iter().map(|f| f.fee).sum();

        Self {
            initial_cash,
            final_equity,
            total_return: total_return(&equity),
            total_pnl,
            gross_pnl: total_pnl + total_fees,
            total_fees,
            max_drawdown: max_drawdown(&equity),
            trade_count: fills.len(),
            liquidation_count: fills.iter().filter(|f| f.is_liquidation()).count(),
            round_trips: trips.len(),
            win_rate: win_rate(&trips),
            avg_win: mean_f64(&pnls(&trips, |p| p > 0.0)),
            avg_loss: mean_f64(&pnls(&trips, |p| p < 0.0)),
            avg_fee_per_round_trip: mean_f64(&trips.iter().map(|t| t.fees).collect::<Vec<_>>()),
            profit_factor: profit_factor(&trips),
            avg_holding_secs: mean_f64(&trips.iter().map(RoundTrip::holding_secs).collect::<Vec<_>>()),
            max_consecutive_wins: max_consecutive(&trips, true),
            max_consecutive_losses: max_consecutive(&trips, false),
            buckets: bucket_stats(&trips),
            rejections_by_reason: rejection_counts(rejections),
        }
    }
}

// ─── Round trips ────────────────────────────────────────────────────

#[derive(Debug)]
struct OpenTrip {
    opened_at: DateTime<Utc>,
    held: f64,
    bought: f64,
    buy_notional: f64,
    sold: f64,
    sell_notional: f64,
    gross_pnl: f64,
    fees: f64,
}

/// Rebuild closed round trips from the fill ledger, in closing order.
///
/// Trips still open at the end of the ledger (aborted or failed runs) are
/// not reported.
pub fn round_trips(fills: &[Fill]) -> Vec<RoundTrip> {
    let mut open: BTreeMap<&str, OpenTrip> = BTreeMap::new();
    let mut closed = Vec::new();

    for fill in fills {
        let trip = open.entry(fill.outcome.as_str()).or_insert_with(|| OpenTrip {
            opened_at: fill.timestamp,
            held: 0.0,
            bought: 0.0,
            buy_notional: 0.0,
            sold: 0.0,
            sell_notional: 0.0,
            gross_pnl: 0.0,
            fees: 0.0,
        });
        trip.fees += fill.fee;
        match fill.action {
            OrderAction::Buy => {
                trip.held += fill.quantity;
                trip.bought += fill.quantity;
                trip.buy_notional += fill.notional();
            }
            OrderAction::Sell => {
                trip.held -= fill.quantity;
                trip.sold += fill.quantity;
                trip.sell_notional += fill.notional();
                trip.gross_pnl += fill.realized_pnl;
            }
        }

        if trip.held <= QTY_EPSILON && trip.sold > 0.0 {
            if let Some(trip) = open.remove(fill.outcome.as_str()) {
                closed.push(RoundTrip {
                    outcome: fill.outcome.clone(),
                    opened_at: trip.opened_at,
                    closed_at: fill.timestamp,
                    quantity: trip.bought,
                    entry_price: ratio(trip.buy_notional, trip.bought),
                    exit_price: ratio(trip.sell_notional, trip.sold),
                    gross_pnl: trip.gross_pnl,
                    fees: trip.fees,
                    net_pnl: trip.gross_pnl - trip.fees,
                    liquidated: fill.is_liquidation(),
                });
            }
        }
    }
    closed
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&initial), Some(&last)) if equity.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let Some(&first) = equity.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Fraction of round trips that were winners.
pub fn win_rate(trips: &[RoundTrip]) -> f64 {
    if trips.is_empty() {
        return 0.0;
    }
    trips.iter().filter(|t| t.is_winner()).count() as f64 / trips.len() as f64
}

/// Profit factor: gross profits / gross losses, net of fees.
///
/// Capped at [`PROFIT_FACTOR_CAP`] when there are no losses.
pub fn profit_factor(trips: &[RoundTrip]) -> f64 {
    if trips.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = pnls(trips, |p| p > 0.0).iter().sum();
    let gross_loss: f64 = pnls(trips, |p| p < 0.0).iter().map(|p| p.abs()).sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { PROFIT_FACTOR_CAP } else { 0.0 };
    }
    (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
}

fn bucket_stats(trips: &[RoundTrip]) -> BTreeMap<String, BucketStats> {
    let mut grouped: BTreeMap<&str, Vec<&RoundTrip>> =
        ENTRY_BUCKETS.iter().map(|(label, _)| (*label, Vec::new())).collect();
    for trip in trips {
        let label = ENTRY_BUCKETS
            .iter()
            .find(|(_, upper)| trip.entry_price < *upper)
            .map_or("0.15+", |(label, _)| *label);
        grouped.entry(label).or_default().push(trip);
    }

    grouped
        .into_iter()
        .map(|(label, arr)| {
            let count = arr.len();
            let all: Vec<f64> = arr.iter().map(|t| t.net_pnl).collect();
            let wins: Vec<f64> = all.iter().copied().filter(|p| *p > 0.0).collect();
            let losses: Vec<f64> = all.iter().copied().filter(|p| *p < 0.0).collect();
            let total_fees: f64 = arr.iter().map(|t| t.fees).sum();
            let stats = BucketStats {
                count,
                win_rate: if count > 0 {
                    wins.len() as f64 / count as f64
                } else {
                    0.0
                },
                avg_pnl: mean_f64(&all),
                avg_win: mean_f64(&wins),
                avg_loss: mean_f64(&losses),
                total_fees,
                avg_fee: ratio(total_fees, count as f64),
            };
            (label.to_string(), stats)
        })
        .collect()
}

fn rejection_counts(rejections: &[Rejection]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for r in rejections {
        *counts.entry(r.reason.label().to_string()).or_insert(0) += 1;
    }
    counts
}

// ─── Helpers ────────────────────────────────────────────────────────

fn pnls(trips: &[RoundTrip], keep: impl Fn(f64) -> bool) -> Vec<f64> {
    trips.iter().map(|t| t.net_pnl).filter(|p| keep(*p)).collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn max_consecutive(trips: &[RoundTrip], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trip in trips {
        if trip.is_winner() == winners {
            current += 1;
            if current > max_streak {
                max_streak = current;
            }
        } else {
            current = 0;
        }
    }
    max_streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shotclock_core::domain::{FillKind, Order, OrderKind, RejectReason};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[allow(clippy::too_many_arguments)]
    fn fill(
        seq: usize,
        secs: i64,
        outcome: &str,
        action: OrderAction,
        qty: f64,
        price: f64,
        fee: f64,
        realized: f64,
    ) -> Fill {
        Fill {
            seq,
            snapshot_index: seq,
            timestamp: ts(secs),
            outcome: outcome.into(),
            action,
            quantity: qty,
            price,
            fee,
            order_kind: OrderKind::Market,
            kind: FillKind::Strategy,
            realized_pnl: realized,
        }
    }

    fn point(secs: i64, equity: f64) -> EquityPoint {
        EquityPoint {
            timestamp: ts(secs),
            cash: equity,
            equity,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            fees_paid: 0.0,
        }
    }

    /// Buy 10 @0.40, sell 10 @0.55 with 0.02 fee each leg.
    fn winning_trip() -> Vec<Fill> {
        vec![
            fill(0, 10, "home", OrderAction::Buy, 10.0, 0.40, 0.02, 0.0),
            fill(1, 40, "home", OrderAction::Sell, 10.0, 0.55, 0.02, 1.5),
        ]
    }

    #[test]
    fn max_drawdown_known() {
        let dd = max_drawdown(&[100.0, 110.0, 88.0, 120.0]);
        assert!((dd - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_monotonic_increase() {
        assert_eq!(max_drawdown(&[100.0, 101.0, 102.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn total_return_basic() {
        assert!((total_return(&[100.0, 90.0, 110.0]) - 0.10).abs() < 1e-12);
        assert_eq!(total_return(&[100.0]), 0.0);
    }

    #[test]
    fn round_trip_rebuilt_from_fills() {
        let trips = round_trips(&winning_trip());
        assert_eq!(trips.len(), 1);
        let t = &trips[0];
        assert_eq!(t.outcome, "home");
        assert!((t.entry_price - 0.40).abs() < 1e-12);
        assert!((t.exit_price - 0.55).abs() < 1e-12);
        assert!((t.fees - 0.04).abs() < 1e-12);
        assert!((t.net_pnl - 1.46).abs() < 1e-12);
        assert_eq!(t.holding_secs(), 30.0);
        assert!(!t.liquidated);
    }

    #[test]
    fn scaled_in_trip_averages_entry() {
        let fills = vec![
            fill(0, 10, "away", OrderAction::Buy, 10.0, 0.10, 0.0, 0.0),
            fill(1, 20, "away", OrderAction::Buy, 10.0, 0.20, 0.0, 0.0),
            fill(2, 30, "away", OrderAction::Sell, 5.0, 0.30, 0.0, 0.75),
            fill(3, 50, "away", OrderAction::Sell, 15.0, 0.05, 0.0, -1.5),
        ];
        let trips = round_trips(&fills);
        assert_eq!(trips.len(), 1);
        assert!((trips[0].entry_price - 0.15).abs() < 1e-12);
        assert!((trips[0].exit_price - 0.1125).abs() < 1e-12);
        assert_eq!(trips[0].quantity, 20.0);
        assert_eq!(trips[0].opened_at, ts(10));
        assert!((trips[0].net_pnl - (-0.75)).abs() < 1e-12);
    }

    #[test]
    fn open_trip_is_not_counted() {
        let fills = vec![fill(0, 10, "home", OrderAction::Buy, 1.0, 0.4, 0.0, 0.0)];
        assert!(round_trips(&fills).is_empty());
    }

    #[test]
    fn outcomes_tracked_independently() {
        let fills = vec![
            fill(0, 10, "home", OrderAction::Buy, 1.0, 0.4, 0.0, 0.0),
            fill(1, 11, "away", OrderAction::Buy, 1.0, 0.6, 0.0, 0.0),
            fill(2, 12, "away", OrderAction::Sell, 1.0, 0.5, 0.0, -0.1),
            fill(3, 13, "home", OrderAction::Sell, 1.0, 0.5, 0.0, 0.1),
        ];
        let trips = round_trips(&fills);
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].outcome, "away");
        assert_eq!(trips[1].outcome, "home");
    }

    #[test]
    fn compute_summary() {
        let curve = vec![point(10, 99.98), point(40, 101.46)];
        let rejection = Rejection {
            snapshot_index: 1,
            timestamp: ts(40),
            order: Order::market_buy("home", 1e6),
            reason: RejectReason::InsufficientFunds {
                required: 1.0,
                available: 0.0,
            },
        };
        let m = RunMetrics::compute(100.0, &curve, &winning_trip(), &[rejection]);
        assert!((m.total_pnl - 1.46).abs() < 1e-9);
        assert!((m.total_fees - 0.04).abs() < 1e-12);
        assert!((m.gross_pnl - 1.50).abs() < 1e-9);
        assert!((m.total_return - 0.0146).abs() < 1e-9);
        assert_eq!(m.trade_count, 2);
        assert_eq!(m.round_trips, 1);
        assert_eq!(m.win_rate, 1.0);
        assert_eq!(m.profit_factor, PROFIT_FACTOR_CAP);
        assert_eq!(m.avg_holding_secs, 30.0);
        assert!(m.max_drawdown < 0.0);
        assert_eq!(m.rejections_by_reason["insufficient_funds"], 1);
        assert_eq!(m.buckets["0.15+"].count, 1);
        assert_eq!(m.buckets["0-0.05"].count, 0);
        assert_eq!(m.buckets.len(), ENTRY_BUCKETS.len());
    }

    #[test]
    fn empty_history() {
        let m = RunMetrics::compute(100.0, &[], &[], &[]);
        assert_eq!(m.final_equity, 100.0);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert!(m.rejections_by_reason.is_empty());
    }

    #[test]
    fn streaks() {
        let mut fills = Vec::new();
        let pnl = [1.0, 1.0, -1.0, -1.0, -1.0, 1.0];
        for (i, p) in pnl.iter().enumerate() {
            let secs = i as i64 * 10;
            fills.push(fill(2 * i, secs, "home", OrderAction::Buy, 1.0, 0.5, 0.0, 0.0));
            fills.push(fill(2 * i + 1, secs + 5, "home", OrderAction::Sell, 1.0, 0.5 + p, 0.0, *p));
        }
        let trips = round_trips(&fills);
        assert_eq!(max_consecutive(&trips, true), 2);
        assert_eq!(max_consecutive(&trips, false), 3);
        assert!((profit_factor(&trips) - 1.0).abs() < 1e-12);
    }
}
