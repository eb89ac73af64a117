//! Snapshot-by-snapshot event loop: the heart of the backtesting engine.
//!
//! Per snapshot:
//! 1. Cancellation check (abort between snapshots, no rollback)
//! 2. Causality re-check against the previous snapshot
//! 3. Mark-to-market at the tick's prices
//! 4. Strategy decides, simulator applies the orders
//! 5. Terminal liquidation on a final state or the last snapshot
//! 6. Equity point appended

use crate::components::{DecisionContext, Strategy, StrategyKind};
use crate::data::align::verify_snapshot;
use crate::domain::{Rejection, Snapshot};
use crate::engine::simulator::PortfolioSimulator;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use super::state::{EngineOutput, EquityPoint, LiquidationCause, RunStatus, SimConfig};

/// Run one strategy over an aligned snapshot sequence.
///
/// Deterministic: identical snapshots, strategy and config produce an
/// identical `EngineOutput`. Once positions are liquidated the account is
/// closed; later snapshots are still marked and recorded but not offered to
/// the strategy. Failed and aborted runs keep their partial results and do
/// not liquidate.
pub fn run_snapshots<S: Strategy>(
    snapshots: &[Snapshot],
    strategy: &S,
    config: &SimConfig,
    cancel: Option<&AtomicBool>,
) -> EngineOutput {
    info!(
        strategy = strategy.name(),
        snapshots = snapshots.len(),
        initial_cash = config.initial_cash,
        "run started"
    );

    let mut sim = PortfolioSimulator::new(config.clone());
    let mut memory = S::Memory::default();
    let mut status = RunStatus::Running;
    let mut equity_curve = Vec::with_capacity(snapshots.len());
    let mut fills = Vec::new();
    let mut rejections = Vec::new();
    let mut last_rejections: Vec<Rejection> = Vec::new();
    let mut last_consistent: Option<usize> = None;
    let mut liquidation = None;
    let mut prev: Option<&Snapshot> = None;

    for (i, snapshot) in snapshots.iter().enumerate() {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            warn!(snapshot = i, "run aborted");
            status = RunStatus::Aborted {
                last_consistent_index: last_consistent,
            };
            break;
        }

        if let Err(error) = verify_snapshot(prev, snapshot, i) {
            warn!(snapshot = i, %error, "run failed");
            status = RunStatus::Failed {
                snapshot_index: i,
                last_consistent_index: last_consistent,
                error,
            };
            break;
        }

        sim.mark(snapshot);

        if !sim.is_closed() {
            let decision = strategy.decide(
                &DecisionContext {
                    snapshot,
                    portfolio: sim.state(),
                    recent_rejections: &last_rejections,
                },
                memory,
            );
            memory = decision.memory;

            let (new_fills, new_rejections) = sim.apply(&decision.orders, snapshot);
            fills.extend(new_fills);
            rejections.extend(new_rejections.iter().cloned());
            last_rejections = new_rejections;

            let cause = if snapshot.is_final() {
                Some(LiquidationCause::GameFinal)
            } else if i + 1 == snapshots.len() {
                Some(LiquidationCause::StreamExhausted)
            } else {
                None
            };
            if let Some(cause) = cause {
                let closing = sim.liquidate(snapshot);
                info!(snapshot = i, ?cause, positions = closing.len(), "positions liquidated");
                fills.extend(closing);
                liquidation = Some(cause);
            }
        }

        equity_curve.push(EquityPoint::from_portfolio(snapshot.timestamp(), sim.state()));
        last_consistent = Some(i);
        prev = Some(snapshot);
    }

    if status == RunStatus::Running {
        status = RunStatus::Completed;
    }

    let snapshots_processed = last_consistent.map_or(0, |i| i + 1);
    let final_portfolio = sim.into_state();
    info!(
        status = status.label(),
        fills = fills.len(),
        rejections = rejections.len(),
        final_equity = final_portfolio.equity(),
        "run finished"
    );

    EngineOutput {
        status,
        equity_curve,
        fills,
        rejections,
        final_portfolio,
        snapshots_processed,
        liquidation,
    }
}

/// Dispatch a configured strategy to its monomorphized engine loop.
pub fn run_strategy(
    snapshots: &[Snapshot],
    strategy: &StrategyKind,
    config: &SimConfig,
    cancel: Option<&AtomicBool>,
) -> EngineOutput {
    match strategy {
        StrategyKind::PriceThreshold(s) => run_snapshots(snapshots, s, config, cancel),
        StrategyKind::LateGameUnderdog(s) => run_snapshots(snapshots, s, config, cancel),
        StrategyKind::PriceShockMomentum(s) => run_snapshots(snapshots, s, config, cancel),
        StrategyKind::TightGameCoinflip(s) => run_snapshots(snapshots, s, config, cancel),
        StrategyKind::PanicSpreadFade(s) => run_snapshots(snapshots, s, config, cancel),
        StrategyKind::MicroMomentumFollow(s) => run_snapshots(snapshots, s, config, cancel),
        StrategyKind::NoScoreSpikeRevert(s) => run_snapshots(snapshots, s, config, cancel),
        StrategyKind::LateGameShockFade(s) => run_snapshots(snapshots, s, config, cancel),
        StrategyKind::UnderdogResilience(s) => run_snapshots(snapshots, s, config, cancel),
    }
}
