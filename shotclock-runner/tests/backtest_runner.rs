//! End-to-end runner tests: TOML config → aligned snapshots → engine → metrics.

use std::sync::atomic::AtomicBool;

use chrono::{DateTime, TimeZone, Utc};
use shotclock_core::domain::{EventStateObservation, MarketTick, HOME};
use shotclock_core::engine::{LiquidationCause, RunStatus};
use shotclock_runner::{run_loaded_game, BacktestConfig, GameData};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Two ticks, two states: the canonical alignment example.
fn two_tick_game() -> GameData {
    GameData::new(
        "two-tick",
        vec![
            EventStateObservation::new(ts(5), 0, 0, 1, 720.0),
            EventStateObservation::new(ts(20), 2, 0, 1, 700.0),
        ],
        vec![
            MarketTick::new(ts(10), "T").with_price(HOME, 0.40),
            MarketTick::new(ts(30), "T").with_price(HOME, 0.55),
        ],
    )
}

/// Close game in the last minutes; away is the cheap side and wins.
fn late_game() -> GameData {
    GameData::new(
        "late",
        vec![
            EventStateObservation::new(ts(0), 98, 96, 4, 200.0),
            EventStateObservation::new(ts(50), 100, 102, 4, 0.0).finalized(),
        ],
        vec![
            MarketTick::new(ts(10), "L")
                .with_price("home", 0.90)
                .with_price("away", 0.10),
            MarketTick::new(ts(40), "L")
                .with_price("home", 0.70)
                .with_price("away", 0.30),
            MarketTick::new(ts(60), "L")
                .with_price("home", 0.02)
                .with_price("away", 0.97),
            MarketTick::new(ts(70), "L")
                .with_price("home", 0.01)
                .with_price("away", 0.99),
        ],
    )
}

const THRESHOLD: &str = r#"
[strategy]
name = "price_threshold"

[strategy.params]
entry_threshold = 0.45
quantity = 1.0
"#;

#[test]
fn worked_example_without_fees() {
    let config = BacktestConfig::from_toml(THRESHOLD).unwrap();
    let run = run_loaded_game(&config, &two_tick_game(), None).unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.liquidation, Some(LiquidationCause::StreamExhausted));
    assert_eq!(run.trades.len(), 2);
    assert_eq!(run.trades[0].timestamp, ts(10));
    assert!(!run.trades[0].is_liquidation());
    assert_eq!(run.trades[1].timestamp, ts(30));
    assert!(run.trades[1].is_liquidation());
    assert!((run.metrics.total_pnl - 0.15).abs() < 1e-9);
    assert_eq!(run.metrics.round_trips, 1);
    assert_eq!(run.metrics.win_rate, 1.0);
    assert!(run.final_portfolio.is_flat());
}

#[test]
fn worked_example_with_kalshi_fees() {
    let toml = format!("{THRESHOLD}\n[fees]\nmodel = \"kalshi\"\n");
    let config = BacktestConfig::from_toml(&toml).unwrap();
    let run = run_loaded_game(&config, &two_tick_game(), None).unwrap();

    // 0.07 * p * (1 - p) rounds up to 2 cents on both legs.
    assert!((run.trades[0].fee - 0.02).abs() < 1e-12);
    assert!((run.trades[1].fee - 0.02).abs() < 1e-12);
    assert!((run.metrics.total_fees - 0.04).abs() < 1e-12);
    assert!((run.metrics.total_pnl - 0.11).abs() < 1e-9);
    assert!((run.metrics.gross_pnl - 0.15).abs() < 1e-9);
}

#[test]
fn late_game_underdog_settles_on_final_score() {
    let config = BacktestConfig::from_toml(
        r#"
[strategy]
name = "late_game_underdog"

[strategy.params]
stake = 10.0

[execution]
liquidation_pricing = "settlement"
"#,
    )
    .unwrap();
    let run = run_loaded_game(&config, &late_game(), None).unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.liquidation, Some(LiquidationCause::GameFinal));
    assert_eq!(run.trades.len(), 2);
    assert_eq!(run.trades[0].outcome, "away");
    assert!((run.trades[0].quantity - 100.0).abs() < 1e-9);
    assert_eq!(run.trades[1].price, 1.0);
    assert!((run.metrics.total_pnl - 90.0).abs() < 1e-6);
    // The snapshot after the final state is still marked and recorded.
    assert_eq!(run.equity_curve.len(), 4);
    assert_eq!(run.snapshots_processed, 4);
}

#[test]
fn last_tick_liquidation_uses_final_quote() {
    let config = BacktestConfig::from_toml(
        "[strategy]\nname = \"late_game_underdog\"\n[strategy.params]\nstake = 10.0\n",
    )
    .unwrap();
    let run = run_loaded_game(&config, &late_game(), None).unwrap();
    assert_eq!(run.trades[1].price, 0.97);
    assert_eq!(run.trades[1].timestamp, ts(60));
}

#[test]
fn exposure_limit_rejections_reach_metrics() {
    let config = BacktestConfig::from_toml(
        r#"
[strategy]
name = "price_threshold"

[strategy.params]
entry_threshold = 0.60
quantity = 5.0

[portfolio]
max_position = 5.0
"#,
    )
    .unwrap();
    let game = GameData::new(
        "capped",
        vec![],
        (0..4)
            .map(|i| MarketTick::new(ts(10 + i), "C").with_price(HOME, 0.50))
            .collect(),
    );
    let run = run_loaded_game(&config, &game, None).unwrap();
    let strategy_fills = run.trades.iter().filter(|f| !f.is_liquidation()).count();
    assert_eq!(strategy_fills, 1);
    assert_eq!(run.metrics.rejections_by_reason["exposure_limit_exceeded"], 1);
    assert_eq!(run.rejections.len(), 1);
}

#[test]
fn cancelled_run_keeps_partial_result() {
    let config = BacktestConfig::from_toml(THRESHOLD).unwrap();
    let cancel = AtomicBool::new(true);
    let run = run_loaded_game(&config, &two_tick_game(), Some(&cancel)).unwrap();
    assert!(matches!(run.status, RunStatus::Aborted { .. }));
    assert!(run.trades.is_empty());
    assert_eq!(run.snapshots_processed, 0);
    assert_eq!(run.metrics.final_equity, config.portfolio.initial_cash);
}

#[test]
fn replay_is_byte_identical() {
    let config = BacktestConfig::from_toml(THRESHOLD).unwrap();
    let a = run_loaded_game(&config, &late_game(), None).unwrap();
    let b = run_loaded_game(&config, &late_game(), None).unwrap();
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
    assert_eq!(a.run_id, b.run_id);
}

#[test]
fn every_named_strategy_runs() {
    for name in shotclock_core::components::STRATEGY_NAMES {
        let config = BacktestConfig::from_toml(&format!("[strategy]\nname = \"{name}\"\n")).unwrap();
        let run = run_loaded_game(&config, &late_game(), None).unwrap();
        assert!(run.status.is_completed(), "{name} did not complete");
        assert!(run.final_portfolio.is_flat(), "{name} left a position open");
        assert_eq!(run.recompute_metrics(), run.metrics);
    }
}
