//! Shotclock Runner: backtest orchestration, metrics and artifacts.
//!
//! This crate builds on `shotclock-core` to provide:
//! - TOML backtest configuration with deterministic run ids
//! - Loading of per-game state timelines (CSV) and tick streams (JSONL)
//! - Single-game runner and parallel batch runner
//! - Summary metrics recomputable from the run artifact
//! - JSON/CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, ExecutionSection, PortfolioSection, RunId};
pub use data_loader::{
    discover_games, load_game_dir, load_states_csv, load_ticks_jsonl, GameData, LoadError,
    PriceUnit,
};
pub use export::{
    downsample_to_minutes, export_equity_csv, export_json, export_trades_csv, import_json,
    save_artifacts, save_batch,
};
pub use metrics::{round_trips, BucketStats, RoundTrip, RunMetrics};
pub use runner::{
    run_batch, run_batch_loaded, run_game, run_loaded_game, BacktestRun, BatchResult,
    BatchSummary, GameFailure, RunError, SCHEMA_VERSION,
};
