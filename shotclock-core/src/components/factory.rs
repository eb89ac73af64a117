//! Factory: converts a `StrategyConfig` into a concrete strategy.
//!
//! Strategies are selected once, at configuration time, into `StrategyKind`.
//! The engine is generic over `Strategy`, so each variant runs monomorphized
//! with its own memory type.

use crate::domain::HOME;
use crate::fingerprint::StrategyConfig;

use super::strategy::{
    LateGameShockFade, LateGameUnderdog, MicroMomentumFollow, NoScoreSpikeRevert, PanicSpreadFade,
    PriceShockMomentum, PriceThreshold, TightGameCoinflip, UnderdogResilience,
};

// ─── Error type ──────────────────────────────────────────────────────

/// Errors that can occur during strategy construction.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FactoryError {
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),
    #[error("Invalid parameter {param} = {value} for {strategy}: {reason}")]
    InvalidParam {
        strategy: String,
        param: String,
        value: f64,
        reason: &'static str,
    },
}

/// Names accepted by [`build_strategy`].
pub const STRATEGY_NAMES: &[&str] = &[
    "price_threshold",
    "late_game_underdog",
    "price_shock_momentum",
    "tight_game_coinflip",
    "panic_spread_fade",
    "micro_momentum_follow",
    "no_score_spike_revert",
    "late_game_shock_fade",
    "underdog_resilience",
];

/// A configured strategy, one variant per implementation.
#[derive(Debug, Clone)]
pub enum StrategyKind {
    PriceThreshold(PriceThreshold),
    LateGameUnderdog(LateGameUnderdog),
    PriceShockMomentum(PriceShockMomentum),
    TightGameCoinflip(TightGameCoinflip),
    PanicSpreadFade(PanicSpreadFade),
    MicroMomentumFollow(MicroMomentumFollow),
    NoScoreSpikeRevert(NoScoreSpikeRevert),
    LateGameShockFade(LateGameShockFade),
    UnderdogResilience(UnderdogResilience),
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::PriceThreshold(_) => "price_threshold",
            StrategyKind::LateGameUnderdog(_) => "late_game_underdog",
            StrategyKind::PriceShockMomentum(_) => "price_shock_momentum",
            StrategyKind::TightGameCoinflip(_) => "tight_game_coinflip",
            StrategyKind::PanicSpreadFade(_) => "panic_spread_fade",
            StrategyKind::MicroMomentumFollow(_) => "micro_momentum_follow",
            StrategyKind::NoScoreSpikeRevert(_) => "no_score_spike_revert",
            StrategyKind::LateGameShockFade(_) => "late_game_shock_fade",
            StrategyKind::UnderdogResilience(_) => "underdog_resilience",
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Extract a named f64 parameter, falling back to `default`.
fn param(config: &StrategyConfig, name: &str, default: f64) -> f64 {
    config.params.get(name).copied().unwrap_or(default)
}

fn param_opt(config: &StrategyConfig, name: &str) -> Option<f64> {
    config.params.get(name).copied()
}

fn invalid(config: &StrategyConfig, param: &str, value: f64, reason: &'static str) -> FactoryError {
    FactoryError::InvalidParam {
        strategy: config.name.clone(),
        param: param.to_string(),
        value,
        reason,
    }
}

fn check_probability(config: &StrategyConfig, name: &str, value: f64) -> Result<f64, FactoryError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(invalid(config, name, value, "must be within [0, 1]"))
    }
}

fn check_positive(config: &StrategyConfig, name: &str, value: f64) -> Result<f64, FactoryError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(invalid(config, name, value, "must be positive"))
    }
}

fn check_count(config: &StrategyConfig, name: &str, value: f64) -> Result<u32, FactoryError> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Ok(value as u32)
    } else {
        Err(invalid(config, name, value, "must be a non-negative integer"))
    }
}

fn check_non_negative(config: &StrategyConfig, name: &str, value: f64) -> Result<f64, FactoryError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(invalid(config, name, value, "must be non-negative"))
    }
}

/// Rolling window length, at least `min`.
fn check_window(config: &StrategyConfig, name: &str, value: f64, min: u32) -> Result<usize, FactoryError> {
    let n = check_count(config, name, value)?;
    if n < min {
        return Err(invalid(config, name, value, "window too short"));
    }
    Ok(n as usize)
}

/// `price_min`/`price_max` pair, both probabilities with `price_min < price_max`.
fn price_band(config: &StrategyConfig, default_min: f64, default_max: f64) -> Result<(f64, f64), FactoryError> {
    let price_min = check_probability(config, "price_min", param(config, "price_min", default_min))?;
    let price_max = check_probability(config, "price_max", param(config, "price_max", default_max))?;
    if price_min >= price_max {
        return Err(invalid(config, "price_min", price_min, "must be below price_max"));
    }
    Ok((price_min, price_max))
}

/// Score differential bound given as a non-negative integer.
fn score_bound(config: &StrategyConfig, name: &str, default: i64) -> Result<i64, FactoryError> {
    Ok(i64::from(check_count(config, name, param(config, name, default as f64))?))
}

// ─── Strategy factory ────────────────────────────────────────────────

/// Create a strategy from a `StrategyConfig`. Missing params take defaults.
pub fn build_strategy(config: &StrategyConfig) -> Result<StrategyKind, FactoryError> {
    match config.name.as_str() {
        "price_threshold" => {
            let defaults = PriceThreshold::default_params();
            let outcome = config.outcome.clone().unwrap_or_else(|| HOME.to_string());
            let entry_threshold = check_probability(
                config,
                "entry_threshold",
                param(config, "entry_threshold", defaults.entry_threshold),
            )?;
            let exit_threshold = param_opt(config, "exit_threshold")
                .map(|v| check_probability(config, "exit_threshold", v))
                .transpose()?;
            let quantity = check_positive(config, "quantity", param(config, "quantity", defaults.quantity))?;
            let max_position = param_opt(config, "max_position")
                .map(|v| check_positive(config, "max_position", v))
                .transpose()?;
            let max_entries = check_count(config, "max_entries", param(config, "max_entries", 0.0))?;
            Ok(StrategyKind::PriceThreshold(PriceThreshold {
                outcome,
                entry_threshold,
                exit_threshold,
                quantity,
                max_position,
                max_entries,
            }))
        }
        "late_game_underdog" => {
            let d = LateGameUnderdog::default_params();
            Ok(StrategyKind::LateGameUnderdog(LateGameUnderdog {
                min_period: check_count(config, "min_period", param(config, "min_period", f64::from(d.min_period)))?,
                max_clock_secs: check_non_negative(
                    config,
                    "max_clock_secs",
                    param(config, "max_clock_secs", d.max_clock_secs),
                )?,
                max_score_diff: i64::from(check_count(
                    config,
                    "max_score_diff",
                    param(config, "max_score_diff", d.max_score_diff as f64),
                )?),
                max_price: check_probability(config, "max_price", param(config, "max_price", d.max_price))?,
                stake: check_positive(config, "stake", param(config, "stake", d.stake))?,
            }))
        }
        "price_shock_momentum" => {
            let d = PriceShockMomentum::default_params();
            let (price_min, price_max) = price_band(config, d.price_min, d.price_max)?;
            Ok(StrategyKind::PriceShockMomentum(PriceShockMomentum {
                min_shock_move: check_positive(
                    config,
                    "min_shock_move",
                    param(config, "min_shock_move", d.min_shock_move),
                )?,
                take_profit_move: check_positive(
                    config,
                    "take_profit_move",
                    param(config, "take_profit_move", d.take_profit_move),
                )?,
                stop_loss_move: check_positive(
                    config,
                    "stop_loss_move",
                    param(config, "stop_loss_move", d.stop_loss_move),
                )?,
                stake: check_positive(config, "stake", param(config, "stake", d.stake))?,
                price_min,
                price_max,
            }))
        }
        "tight_game_coinflip" => {
            let d = TightGameCoinflip::default_params();
            let p_low = check_probability(config, "p_low", param(config, "p_low", d.p_low))?;
            let p_high = check_probability(config, "p_high", param(config, "p_high", d.p_high))?;
            if p_low > p_high {
                return Err(invalid(config, "p_low", p_low, "must not exceed p_high"));
            }
            Ok(StrategyKind::TightGameCoinflip(TightGameCoinflip {
                min_period: check_count(config, "min_period", param(config, "min_period", f64::from(d.min_period)))?,
                max_clock_secs: check_non_negative(
                    config,
                    "max_clock_secs",
                    param(config, "max_clock_secs", d.max_clock_secs),
                )?,
                close_score_max: i64::from(check_count(
                    config,
                    "close_score_max",
                    param(config, "close_score_max", d.close_score_max as f64),
                )?),
                p_low,
                p_high,
                stake: check_positive(config, "stake", param(config, "stake", d.stake))?,
            }))
        }
        "panic_spread_fade" => {
            let d = PanicSpreadFade::default_params();
            let (price_min, price_max) = price_band(config, d.price_min, d.price_max)?;
            Ok(StrategyKind::PanicSpreadFade(PanicSpreadFade {
                spread_window: check_window(
                    config,
                    "spread_window",
                    param(config, "spread_window", d.spread_window as f64),
                    3,
                )?,
                spread_spike_min: check_non_negative(
                    config,
                    "spread_spike_min",
                    param(config, "spread_spike_min", d.spread_spike_min),
                )?,
                spread_spike_factor: check_positive(
                    config,
                    "spread_spike_factor",
                    param(config, "spread_spike_factor", d.spread_spike_factor),
                )?,
                min_price_jump: check_non_negative(
                    config,
                    "min_price_jump",
                    param(config, "min_price_jump", d.min_price_jump),
                )?,
                min_period: check_count(config, "min_period", param(config, "min_period", f64::from(d.min_period)))?,
                price_min,
                price_max,
                stake: check_positive(config, "stake", param(config, "stake", d.stake))?,
            }))
        }
        "micro_momentum_follow" => {
            let d = MicroMomentumFollow::default_params();
            let (price_min, price_max) = price_band(config, d.price_min, d.price_max)?;
            Ok(StrategyKind::MicroMomentumFollow(MicroMomentumFollow {
                window: check_window(config, "window", param(config, "window", d.window as f64), 2)?,
                min_trend_move: check_positive(
                    config,
                    "min_trend_move",
                    param(config, "min_trend_move", d.min_trend_move),
                )?,
                max_score_diff_change: score_bound(config, "max_score_diff_change", d.max_score_diff_change)?,
                price_min,
                price_max,
                entry_max_price: check_probability(
                    config,
                    "entry_max_price",
                    param(config, "entry_max_price", d.entry_max_price),
                )?,
                stake: check_positive(config, "stake", param(config, "stake", d.stake))?,
            }))
        }
        "no_score_spike_revert" => {
            let d = NoScoreSpikeRevert::default_params();
            let (price_min, price_max) = price_band(config, d.price_min, d.price_max)?;
            Ok(StrategyKind::NoScoreSpikeRevert(NoScoreSpikeRevert {
                spike_min_abs: check_positive(
                    config,
                    "spike_min_abs",
                    param(config, "spike_min_abs", d.spike_min_abs),
                )?,
                max_score_diff_change: score_bound(config, "max_score_diff_change", d.max_score_diff_change)?,
                price_min,
                price_max,
                stake: check_positive(config, "stake", param(config, "stake", d.stake))?,
            }))
        }
        "late_game_shock_fade" => {
            let d = LateGameShockFade::default_params();
            let (price_min, price_max) = price_band(config, d.price_min, d.price_max)?;
            Ok(StrategyKind::LateGameShockFade(LateGameShockFade {
                min_period: check_count(config, "min_period", param(config, "min_period", f64::from(d.min_period)))?,
                late_minutes: check_non_negative(config, "late_minutes", param(config, "late_minutes", d.late_minutes))?,
                max_score_diff: score_bound(config, "max_score_diff", d.max_score_diff)?,
                min_shock_move: check_positive(
                    config,
                    "min_shock_move",
                    param(config, "min_shock_move", d.min_shock_move),
                )?,
                max_score_change: score_bound(config, "max_score_change", d.max_score_change)?,
                min_gap: check_probability(config, "min_gap", param(config, "min_gap", d.min_gap))?,
                price_min,
                price_max,
                stake: check_positive(config, "stake", param(config, "stake", d.stake))?,
            }))
        }
        "underdog_resilience" => {
            let d = UnderdogResilience::default_params();
            let (price_min, price_max) = price_band(config, d.price_min, d.price_max)?;
            let min_period = check_count(config, "min_period", param(config, "min_period", f64::from(d.min_period)))?;
            let max_period = check_count(config, "max_period", param(config, "max_period", f64::from(d.max_period)))?;
            if min_period > max_period {
                return Err(invalid(config, "min_period", f64::from(min_period), "must not exceed max_period"));
            }
            Ok(StrategyKind::UnderdogResilience(UnderdogResilience {
                pregame_underdog_max: check_probability(
                    config,
                    "pregame_underdog_max",
                    param(config, "pregame_underdog_max", d.pregame_underdog_max),
                )?,
                current_underdog_max: check_probability(
                    config,
                    "current_underdog_max",
                    param(config, "current_underdog_max", d.current_underdog_max),
                )?,
                max_rebound: check_non_negative(config, "max_rebound", param(config, "max_rebound", d.max_rebound))?,
                max_score_diff: score_bound(config, "max_score_diff", d.max_score_diff)?,
                min_period,
                max_period,
                min_clock_secs: check_non_negative(
                    config,
                    "min_clock_secs",
                    param(config, "min_clock_secs", d.min_clock_secs),
                )?,
                price_min,
                price_max,
                stake: check_positive(config, "stake", param(config, "stake", d.stake))?,
            }))
        }
        other => Err(FactoryError::UnknownStrategy(other.to_string())),
    }
}
