//! Artifact export: directory layout, CSV contents, JSON round-trip.

use chrono::{DateTime, TimeZone, Utc};
use shotclock_core::domain::{MarketTick, HOME};
use shotclock_runner::export::{artifact_dir, export_trades_csv};
use shotclock_runner::{
    import_json, export_json, run_loaded_game, save_artifacts, BacktestConfig, BacktestRun,
    GameData,
};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Ten minutes of ticks, one every 20 seconds, dipping below the threshold once.
fn sample_run() -> BacktestRun {
    let ticks = (0..30)
        .map(|i| {
            let price = if i == 3 { 0.40 } else { 0.50 };
            MarketTick::new(ts(i * 20), "ART").with_price(HOME, price)
        })
        .collect();
    let config = BacktestConfig::from_toml(
        "[strategy]\nname = \"price_threshold\"\n[strategy.params]\nentry_threshold = 0.45\n",
    )
    .unwrap();
    run_loaded_game(&config, &GameData::new("artifact-game", vec![], ticks), None).unwrap()
}

#[test]
fn save_writes_full_bundle() {
    let tmp = tempfile::tempdir().unwrap();
    let run = sample_run();
    let dir = save_artifacts(&run, tmp.path()).unwrap();

    assert_eq!(dir, tmp.path().join("price_threshold").join(&run.run_id));
    assert_eq!(dir, artifact_dir(&run, tmp.path()));
    for file in [
        "summary.json",
        "config.json",
        "trades.csv",
        "equity_curve.csv",
        "run.json",
    ] {
        assert!(dir.join(file).exists(), "missing {file}");
    }
}

#[test]
fn equity_csv_is_downsampled_to_minutes() {
    let tmp = tempfile::tempdir().unwrap();
    let run = sample_run();
    assert_eq!(run.equity_curve.len(), 30);

    let dir = save_artifacts(&run, tmp.path()).unwrap();
    let csv = std::fs::read_to_string(dir.join("equity_curve.csv")).unwrap();
    // Header + one row per minute over 580 seconds.
    assert_eq!(csv.lines().count(), 1 + 10);
}

#[test]
fn trades_csv_lists_every_fill() {
    let run = sample_run();
    let csv = export_trades_csv(&run.trades).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 1 + run.trades.len());
    assert!(lines[0].starts_with("seq,snapshot_index,timestamp,outcome,action"));
    assert!(lines[1].contains(",buy,"));
    assert!(lines[1].ends_with(",strategy,0.000000"));
    assert!(lines[2].contains(",liquidation,"));
}

#[test]
fn summary_json_carries_metrics_and_status() {
    let tmp = tempfile::tempdir().unwrap();
    let run = sample_run();
    let dir = save_artifacts(&run, tmp.path()).unwrap();
    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["status"]["state"], "completed");
    assert_eq!(summary["strategy"], "price_threshold");
    assert_eq!(summary["metrics"]["round_trips"], 1);
    assert!(summary["metrics"]["buckets"]["0.15+"].is_object());
    assert_eq!(summary["config_hash"], run.config.strategy.full_hash().0);
}

#[test]
fn json_round_trip_preserves_run() {
    let run = sample_run();
    let json = export_json(&run).unwrap();
    let back = import_json(&json).unwrap();
    assert_eq!(back, run);
    assert_eq!(back.recompute_metrics(), run.metrics);
}

#[test]
fn import_rejects_newer_schema() {
    let mut run = sample_run();
    run.schema_version = 99;
    let json = export_json(&run).unwrap();
    let err = import_json(&json).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version 99"));
}

#[test]
fn saving_twice_is_byte_identical() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let dir_a = save_artifacts(&sample_run(), a.path()).unwrap();
    let dir_b = save_artifacts(&sample_run(), b.path()).unwrap();
    for file in ["summary.json", "trades.csv", "equity_curve.csv", "run.json"] {
        assert_eq!(
            std::fs::read(dir_a.join(file)).unwrap(),
            std::fs::read(dir_b.join(file)).unwrap(),
            "{file} differs"
        );
    }
}
