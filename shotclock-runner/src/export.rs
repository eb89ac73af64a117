//! Reporting and export: JSON and CSV artifact generation.
//!
//! A saved run lives in `<output>/<strategy>/<run_id>/`:
//! - `summary.json`: status and metrics
//! - `config.json`: the configuration that was run
//! - `trades.csv`: fill ledger
//! - `equity_curve.csv`: equity, one row per minute
//! - `run.json`: the full `BacktestRun`, re-importable
//!
//! All persisted runs include a `schema_version` field. Newer versions are
//! rejected on load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use shotclock_core::domain::{Fill, OrderKind};
use shotclock_core::engine::{EquityPoint, RunStatus};
use shotclock_core::fingerprint::ConfigHash;

use crate::metrics::RunMetrics;
use crate::runner::{BacktestRun, BatchResult, BatchSummary, GameFailure, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestRun` to pretty JSON.
pub fn export_json(run: &BacktestRun) -> Result<String> {
    serde_json::to_string_pretty(run).context("failed to serialize BacktestRun to JSON")
}

/// Deserialize a `BacktestRun` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestRun> {
    let run: BacktestRun =
        serde_json::from_str(json).context("failed to deserialize BacktestRun from JSON")?;
    if run.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            run.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(run)
}

/// The `summary.json` payload.
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    schema_version: u32,
    run_id: &'a str,
    game_id: &'a str,
    strategy: &'a str,
    /// Exact identity of the strategy configuration.
    config_hash: ConfigHash,
    dataset_hash: &'a str,
    status: &'a RunStatus,
    snapshot_count: usize,
    snapshots_processed: usize,
    metrics: &'a RunMetrics,
}

pub fn export_summary_json(run: &BacktestRun) -> Result<String> {
    let summary = RunSummary {
        schema_version: run.schema_version,
        run_id: &run.run_id,
        game_id: &run.game_id,
        strategy: run.strategy_name(),
        config_hash: run.config.strategy.full_hash(),
        dataset_hash: &run.dataset_hash.0,
        status: &run.status,
        snapshot_count: run.snapshot_count,
        snapshots_processed: run.snapshots_processed,
        metrics: &run.metrics,
    };
    serde_json::to_string_pretty(&summary).context("failed to serialize run summary")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the fill ledger as CSV.
///
/// Columns: seq, snapshot_index, timestamp, outcome, action, quantity, price,
/// fee, order_type, limit_price, kind, realized_pnl
pub fn export_trades_csv(fills: &[Fill]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "seq",
        "snapshot_index",
        "timestamp",
        "outcome",
        "action",
        "quantity",
        "price",
        "fee",
        "order_type",
        "limit_price",
        "kind",
        "realized_pnl",
    ])?;

    for f in fills {
        let (order_type, limit_price) = match f.order_kind {
            OrderKind::Market => ("market", String::new()),
            OrderKind::Limit { limit_price } => ("limit", format!("{limit_price:.4}")),
        };
        let kind = if f.is_liquidation() { "liquidation" } else { "strategy" };
        wtr.write_record([
            &f.seq.to_string(),
            &f.snapshot_index.to_string(),
            &f.timestamp.to_rfc3339(),
            &f.outcome,
            &f.action.to_string(),
            &format!("{:.6}", f.quantity),
            &format!("{:.4}", f.price),
            &format!("{:.4}", f.fee),
            order_type,
            &limit_price,
            kind,
            &format!("{:.6}", f.realized_pnl),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an equity curve as CSV.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "equity",
        "cash",
        "realized_pnl",
        "unrealized_pnl",
        "fees_paid",
    ])?;
    for p in equity_curve {
        wtr.write_record([
            &p.timestamp.to_rfc3339(),
            &format!("{:.6}", p.equity),
            &format!("{:.6}", p.cash),
            &format!("{:.6}", p.realized_pnl),
            &format!("{:.6}", p.unrealized_pnl),
            &format!("{:.6}", p.fees_paid),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Collapse an equity curve to one point per UTC minute, keeping the last
/// point seen in each minute. Output is in minute order.
pub fn downsample_to_minutes(equity_curve: &[EquityPoint]) -> Vec<EquityPoint> {
    let mut by_minute: BTreeMap<i64, &EquityPoint> = BTreeMap::new();
    for p in equity_curve {
        by_minute.insert(p.timestamp.timestamp().div_euclid(60), p);
    }
    by_minute.into_values().cloned().collect()
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory a run's artifacts are written to.
pub fn artifact_dir(run: &BacktestRun, output_dir: &Path) -> PathBuf {
    output_dir.join(run.strategy_name()).join(&run.run_id)
}

fn write(path: PathBuf, content: &str) -> Result<()> {
    std::fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Save the full artifact set for a single run. Returns the run directory.
///
/// The directory name is the run id, so re-running identical inputs
/// overwrites the same artifacts with identical bytes.
pub fn save_artifacts(run: &BacktestRun, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = artifact_dir(run, output_dir);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(run_dir.join("summary.json"), &export_summary_json(run)?)?;
    let config_json =
        serde_json::to_string_pretty(&run.config).context("failed to serialize config")?;
    write(run_dir.join("config.json"), &config_json)?;
    write(run_dir.join("trades.csv"), &export_trades_csv(&run.trades)?)?;
    write(
        run_dir.join("equity_curve.csv"),
        &export_equity_csv(&downsample_to_minutes(&run.equity_curve))?,
    )?;
    write(run_dir.join("run.json"), &export_json(run)?)?;

    Ok(run_dir)
}

/// Save every run of a batch plus `batch_summary.json` under
/// `<output>/<strategy>/`. Returns the path of the summary file.
pub fn save_batch(result: &BatchResult, strategy: &str, output_dir: &Path) -> Result<PathBuf> {
    for run in &result.runs {
        save_artifacts(run, output_dir)?;
    }
    let dir = output_dir.join(strategy);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))?;

    #[derive(Serialize)]
    struct Index<'a> {
        schema_version: u32,
        summary: &'a BatchSummary,
        runs: Vec<(&'a str, &'a str)>,
        failures: &'a [GameFailure],
    }
    let index = Index {
        schema_version: SCHEMA_VERSION,
        summary: &result.summary,
        runs: result
            .runs
            .iter()
            .map(|r| (r.game_id.as_str(), r.run_id.as_str()))
            .collect(),
        failures: &result.failures,
    };
    let path = dir.join("batch_summary.json");
    let json = serde_json::to_string_pretty(&index).context("failed to serialize batch summary")?;
    write(path.clone(), &json)?;
    Ok(path)
}
