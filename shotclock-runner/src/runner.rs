//! Backtest runner: wires together loading, alignment, engine and metrics.
//!
//! Entry points:
//! - `run_game()`: loads one game directory, then runs. Used by `shotclock run`.
//! - `run_loaded_game()`: pre-loaded streams, no I/O.
//! - `run_batch()` / `run_batch_loaded()`: many games in parallel, one isolated
//!   run per game, aggregated in game-id order.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use shotclock_core::data::{align, AlignError};
use shotclock_core::domain::{Fill, PortfolioState, Rejection};
use shotclock_core::engine::{run_strategy, EquityPoint, LiquidationCause, RunStatus};
use shotclock_core::fingerprint::DatasetHash;

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{discover_games, load_game_dir, GameData, LoadError};
use crate::metrics::{round_trips, RunMetrics};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("alignment error in game '{game_id}': {source}")]
    Align {
        game_id: String,
        #[source]
        source: AlignError,
    },
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete, finalized result of one game's backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRun {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub game_id: String,
    pub config: BacktestConfig,
    pub dataset_hash: DatasetHash,
    pub status: RunStatus,
    /// One point per processed snapshot.
    pub equity_curve: Vec<EquityPoint>,
    /// Strategy and liquidation fills, in execution order.
    pub trades: Vec<Fill>,
    pub rejections: Vec<Rejection>,
    pub metrics: RunMetrics,
    pub final_portfolio: PortfolioState,
    pub snapshot_count: usize,
    pub snapshots_processed: usize,
    pub liquidation: Option<LiquidationCause>,
}

impl BacktestRun {
    pub fn strategy_name(&self) -> &str {
        &self.config.strategy.name
    }

    /// Recompute metrics from the recorded history; equal to `metrics` for
    /// any untampered artifact.
    pub fn recompute_metrics(&self) -> RunMetrics {
        RunMetrics::compute(
            self.config.portfolio.initial_cash,
            &self.equity_curve,
            &self.trades,
            &self.rejections,
        )
    }
}

/// Load one game directory and backtest it.
pub fn run_game(
    config: &BacktestConfig,
    game_dir: &Path,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestRun, RunError> {
    let game = load_game_dir(game_dir)?;
    run_loaded_game(config, &game, cancel)
}

/// Backtest pre-loaded streams: no I/O.
///
/// Out-of-order input is an `Err`. A run that fails mid-way (alignment
/// invariant violation) or is cancelled is still an `Ok` run carrying its
/// partial history and a non-completed status.
pub fn run_loaded_game(
    config: &BacktestConfig,
    game: &GameData,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestRun, RunError> {
    let strategy = config.build_strategy()?;
    let sim_config = config.to_sim_config();
    let run_id = config.run_id(&game.dataset_hash)?;

    let snapshots = align(&game.states, &game.ticks).map_err(|source| RunError::Align {
        game_id: game.game_id.clone(),
        source,
    })?;

    info!(
        game = %game.game_id,
        strategy = strategy.name(),
        config_hash = %config.strategy.full_hash(),
        dataset = game.dataset_hash.short(),
        snapshots = snapshots.len(),
        "starting backtest"
    );
    let output = run_strategy(&snapshots, &strategy, &sim_config, cancel);

    let metrics = RunMetrics::compute(
        sim_config.initial_cash,
        &output.equity_curve,
        &output.fills,
        &output.rejections,
    );
    if output.status.is_completed() {
        info!(
            game = %game.game_id,
            total_pnl = metrics.total_pnl,
            trades = metrics.trade_count,
            "backtest completed"
        );
    } else {
        warn!(game = %game.game_id, status = output.status.label(), "backtest did not complete");
    }

    Ok(BacktestRun {
        schema_version: SCHEMA_VERSION,
        run_id,
        game_id: game.game_id.clone(),
        config: config.clone(),
        dataset_hash: game.dataset_hash.clone(),
        status: output.status,
        equity_curve: output.equity_curve,
        trades: output.fills,
        rejections: output.rejections,
        metrics,
        final_portfolio: output.final_portfolio,
        snapshot_count: snapshots.len(),
        snapshots_processed: output.snapshots_processed,
        liquidation: output.liquidation,
    })
}

// ─── Batch ──────────────────────────────────────────────────────────

/// A game that produced no run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameFailure {
    pub game_id: String,
    pub error: String,
}

/// Cross-game totals. Every field is a sum or count, so the result does not
/// depend on which game finished first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub games: usize,
    pub completed: usize,
    /// Runs that ended failed or aborted, plus games that could not be loaded or aligned.
    pub failed: usize,
    pub total_pnl: f64,
    pub gross_pnl: f64,
    pub total_fees: f64,
    pub trade_count: usize,
    pub round_trips: usize,
    pub winning_round_trips: usize,
    pub win_rate: f64,
    pub worst_drawdown: f64,
    pub rejections_by_reason: BTreeMap<String, usize>,
}

impl BatchSummary {
    fn add_run(&mut self, run: &BacktestRun) {
        let m = &run.metrics;
        self.games += 1;
        if run.status.is_completed() {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        self.total_pnl += m.total_pnl;
        self.gross_pnl += m.gross_pnl;
        self.total_fees += m.total_fees;
        self.trade_count += m.trade_count;
        self.round_trips += m.round_trips;
        self.winning_round_trips += round_trips(&run.trades)
            .iter()
            .filter(|t| t.is_winner())
            .count();
        self.worst_drawdown = self.worst_drawdown.min(m.max_drawdown);
        for (reason, count) in &m.rejections_by_reason {
            *self.rejections_by_reason.entry(reason.clone()).or_insert(0) += count;
        }
    }

    fn finish(&mut self) {
        self.win_rate = if self.round_trips > 0 {
            self.winning_round_trips as f64 / self.round_trips as f64
        } else {
            0.0
        };
    }

    /// Fold runs and failures into totals. Runs are summed in game-id order so
    /// float totals are byte-stable.
    pub fn from_results(runs: &[BacktestRun], failures: &[GameFailure]) -> Self {
        let mut ordered: Vec<&BacktestRun> = runs.iter().collect();
        ordered.sort_by(|a, b| a.game_id.cmp(&b.game_id));

        let mut summary = Self::default();
        for run in ordered {
            summary.add_run(run);
        }
        summary.games += failures.len();
        summary.failed += failures.len();
        summary.finish();
        summary
    }
}

/// Result of a batch: every run sorted by game id, the games that produced no
/// run, and the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub runs: Vec<BacktestRun>,
    pub failures: Vec<GameFailure>,
    pub summary: BatchSummary,
}

/// Backtest every game directory under `games_root` in parallel.
///
/// A game that fails to load or align is recorded in `failures`; the rest of
/// the batch still runs. `jobs` caps the worker threads (`None` = rayon default).
pub fn run_batch(
    config: &BacktestConfig,
    games_root: &Path,
    jobs: Option<usize>,
    cancel: Option<&AtomicBool>,
) -> Result<BatchResult, RunError> {
    config.validate()?;
    let dirs = discover_games(games_root)?;
    info!(games = dirs.len(), root = %games_root.display(), "starting batch");

    let outcomes = in_pool(jobs, || {
        dirs.par_iter()
            .map(|dir| {
                let game_id = dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (game_id, run_game(config, dir, cancel))
            })
            .collect::<Vec<_>>()
    })?;
    Ok(collect_batch(outcomes))
}

/// Backtest pre-loaded games in parallel: no I/O.
pub fn run_batch_loaded(
    config: &BacktestConfig,
    games: &[GameData],
    jobs: Option<usize>,
    cancel: Option<&AtomicBool>,
) -> Result<BatchResult, RunError> {
    config.validate()?;
    let outcomes = in_pool(jobs, || {
        games
            .par_iter()
            .map(|game| (game.game_id.clone(), run_loaded_game(config, game, cancel)))
            .collect::<Vec<_>>()
    })?;
    Ok(collect_batch(outcomes))
}

fn in_pool<T: Send>(jobs: Option<usize>, work: impl FnOnce() -> T + Send) -> Result<T, RunError> {
    match jobs {
        Some(n) if n > 0 => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| RunError::ThreadPool(e.to_string()))?;
            Ok(pool.install(work))
        }
        _ => Ok(work()),
    }
}

fn collect_batch(outcomes: Vec<(String, Result<BacktestRun, RunError>)>) -> BatchResult {
    let mut runs = Vec::new();
    let mut failures = Vec::new();
    for (game_id, outcome) in outcomes {
        match outcome {
            Ok(run) => runs.push(run),
            Err(e) => {
                warn!(game = %game_id, error = %e, "game skipped");
                failures.push(GameFailure {
                    game_id,
                    error: e.to_string(),
                });
            }
        }
    }
    runs.sort_by(|a, b| a.game_id.cmp(&b.game_id));
    failures.sort_by(|a, b| a.game_id.cmp(&b.game_id));
    let summary = BatchSummary::from_results(&runs, &failures);
    info!(
        games = summary.games,
        completed = summary.completed,
        failed = summary.failed,
        total_pnl = summary.total_pnl,
        "batch finished"
    );
    BatchResult {
        runs,
        failures,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use shotclock_core::domain::{EventStateObservation, MarketTick};
    use shotclock_core::fingerprint::StrategyConfig;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn config() -> BacktestConfig {
        BacktestConfig::new(StrategyConfig::new("price_threshold").with_param("entry_threshold", 0.45))
    }

    fn game(id: &str, first_price: f64) -> GameData {
        GameData::new(
            id,
            vec![
                EventStateObservation::new(ts(5), 0, 0, 1, 720.0),
                EventStateObservation::new(ts(20), 2, 0, 1, 700.0),
            ],
            vec![
                MarketTick::new(ts(10), id).with_price("home", first_price),
                MarketTick::new(ts(30), id).with_price("home", 0.55),
            ],
        )
    }

    #[test]
    fn single_game_round_trip() {
        let run = run_loaded_game(&config(), &game("g1", 0.40), None).unwrap();
        assert!(run.status.is_completed());
        assert_eq!(run.trades.len(), 2);
        assert_eq!(run.equity_curve.len(), 2);
        assert_eq!(run.snapshot_count, 2);
        assert!((run.metrics.total_pnl - 0.15).abs() < 1e-9);
        assert_eq!(run.recompute_metrics(), run.metrics);
        assert_eq!(run.run_id.len(), 64);
    }

    #[test]
    fn out_of_order_ticks_are_an_error() {
        let mut g = game("g1", 0.40);
        g.ticks.swap(0, 1);
        let err = run_loaded_game(&config(), &g, None).unwrap_err();
        assert!(matches!(err, RunError::Align { .. }));
    }

    #[test]
    fn batch_sorted_and_summed() {
        let games = vec![game("b", 0.40), game("a", 0.30), game("c", 0.50)];
        let result = run_batch_loaded(&config(), &games, Some(2), None).unwrap();
        let ids: Vec<&str> = result.runs.iter().map(|r| r.game_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(result.summary.games, 3);
        assert_eq!(result.summary.completed, 3);
        // "c" never trades: 0.50 is not below 0.45.
        assert_eq!(result.summary.round_trips, 2);
        assert_eq!(result.summary.winning_round_trips, 2);
        assert!((result.summary.total_pnl - (0.25 + 0.15)).abs() < 1e-9);
    }

    #[test]
    fn batch_is_order_independent() {
        let forward = vec![game("a", 0.30), game("b", 0.40), game("c", 0.20)];
        let mut reversed = forward.clone();
        reversed.reverse();
        let x = run_batch_loaded(&config(), &forward, None, None).unwrap();
        let y = run_batch_loaded(&config(), &reversed, Some(3), None).unwrap();
        assert_eq!(
            serde_json::to_string(&x).unwrap(),
            serde_json::to_string(&y).unwrap()
        );
    }

    #[test]
    fn batch_records_failures_and_continues() {
        let mut bad = game("bad", 0.40);
        bad.ticks.swap(0, 1);
        let result = run_batch_loaded(&config(), &[bad, game("ok", 0.40)], None, None).unwrap();
        assert_eq!(result.runs.len(), 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].game_id, "bad");
        assert_eq!(result.summary.games, 2);
        assert_eq!(result.summary.failed, 1);
    }
}
