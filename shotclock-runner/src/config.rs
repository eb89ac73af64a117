//! Serializable backtest configuration, loaded from TOML.
//!
//! ```toml
//! [strategy]
//! name = "price_threshold"
//! outcome = "home"
//!
//! [strategy.params]
//! entry_threshold = 0.45
//! quantity = 1.0
//!
//! [portfolio]
//! initial_cash = 1000.0
//! max_position = 100.0
//! exposure_mode = "independent"
//!
//! [fees]
//! model = "kalshi"
//! rate = 0.07
//!
//! [execution]
//! fill_pricing = "mid"
//! liquidation_pricing = "last_tick"
//! ```
//!
//! Every section except `[strategy]` has defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use shotclock_core::components::{build_strategy, FactoryError, StrategyKind};
use shotclock_core::engine::{
    ExecutionConfig, ExposureMode, FeeModel, FillPricing, LiquidationPricing, SimConfig,
};
use shotclock_core::fingerprint::{DatasetHash, StrategyConfig};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

/// Default starting bankroll.
pub const DEFAULT_INITIAL_CASH: f64 = 1_000.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Strategy(#[from] FactoryError),
}

/// `[portfolio]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSection {
    pub initial_cash: f64,
    pub max_position: Option<f64>,
    pub exposure_mode: ExposureMode,
}

impl Default for PortfolioSection {
    fn default() -> Self {
        Self {
            initial_cash: DEFAULT_INITIAL_CASH,
            max_position: None,
            exposure_mode: ExposureMode::Independent,
        }
    }
}

/// `[execution]` section. Fees live in their own `[fees]` table.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    pub fill_pricing: FillPricing,
    pub liquidation_pricing: LiquidationPricing,
}

/// Full configuration for one backtest: strategy, account, fees, execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub portfolio: PortfolioSection,
    #[serde(default)]
    pub fees: FeeModel,
    #[serde(default)]
    pub execution: ExecutionSection,
}

impl BacktestConfig {
    /// Config with default account and execution settings for `strategy`.
    pub fn new(strategy: StrategyConfig) -> Self {
        Self {
            strategy,
            portfolio: PortfolioSection::default(),
            fees: FeeModel::None,
            execution: ExecutionSection::default(),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Reject configs the simulator cannot run meaningfully.
    ///
    /// Strategy parameters are checked by building the strategy once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cash = self.portfolio.initial_cash;
        if !cash.is_finite() || cash <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "portfolio.initial_cash must be positive, got {cash}"
            )));
        }
        if let Some(limit) = self.portfolio.max_position {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "portfolio.max_position must be positive, got {limit}"
                )));
            }
        }
        let fee = self.fees.parameter();
        if !fee.is_finite() || fee < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "fees parameter must be non-negative, got {fee}"
            )));
        }
        build_strategy(&self.strategy)?;
        Ok(())
    }

    pub fn build_strategy(&self) -> Result<StrategyKind, ConfigError> {
        Ok(build_strategy(&self.strategy)?)
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            fee_model: self.fees,
            fill_pricing: self.execution.fill_pricing,
            liquidation_pricing: self.execution.liquidation_pricing,
        }
    }

    pub fn to_sim_config(&self) -> SimConfig {
        let mut sim = SimConfig::new(self.portfolio.initial_cash)
            .with_exposure_mode(self.portfolio.exposure_mode)
            .with_execution(self.execution_config());
        sim.max_position = self.portfolio.max_position;
        sim
    }

    /// Deterministic run id: BLAKE3 over the canonical JSON config and the
    /// dataset hash. Identical config + identical inputs give the same id.
    pub fn run_id(&self, dataset: &DatasetHash) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)
            .map_err(|e| ConfigError::Invalid(format!("config is not serializable: {e}")))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(json.as_bytes());
        hasher.update(&[0]);
        hasher.update(dataset.0.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }
}
