//! Simulator configuration, run status, and engine output types.

use crate::data::align::AlignError;
use crate::domain::{Fill, PortfolioState, Rejection};
use crate::engine::execution::ExecutionConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the position limit is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExposureMode {
    /// Each outcome's quantity is checked against the limit on its own.
    #[default]
    Independent,
    /// The sum of quantities across all outcomes is checked against the limit.
    Netted,
}

/// Configuration for a single simulated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub initial_cash: f64,
    /// Maximum contracts held, per outcome or netted. `None` = unlimited.
    #[serde(default)]
    pub max_position: Option<f64>,
    #[serde(default)]
    pub exposure_mode: ExposureMode,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl SimConfig {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            max_position: None,
            exposure_mode: ExposureMode::Independent,
            execution: ExecutionConfig::frictionless(),
        }
    }

    pub fn with_max_position(mut self, max_position: f64) -> Self {
        self.max_position = Some(max_position);
        self
    }

    pub fn with_exposure_mode(mut self, mode: ExposureMode) -> Self {
        self.exposure_mode = mode;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }
}

/// Why open positions were force-closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidationCause {
    /// A final game state was reached.
    GameFinal,
    /// The tick stream ran out before a final state.
    StreamExhausted,
}

/// Run lifecycle: `Initialized -> Running -> {Completed, Failed, Aborted}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Initialized,
    Running,
    Completed,
    /// Fatal per-snapshot error. Nothing after `last_consistent_index` was applied.
    Failed {
        snapshot_index: usize,
        last_consistent_index: Option<usize>,
        error: AlignError,
    },
    /// Cancelled between snapshots. Partial results remain valid.
    Aborted { last_consistent_index: Option<usize> },
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Initialized => "initialized",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed { .. } => "failed",
            RunStatus::Aborted { .. } => "aborted",
        }
    }
}

/// One equity-curve sample, taken after each processed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub equity: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub fees_paid: f64,
}

impl EquityPoint {
    pub fn from_portfolio(timestamp: DateTime<Utc>, portfolio: &PortfolioState) -> Self {
        Self {
            timestamp,
            cash: portfolio.cash,
            equity: portfolio.equity(),
            realized_pnl: portfolio.realized_pnl,
            unrealized_pnl: portfolio.unrealized_pnl,
            fees_paid: portfolio.fees_paid,
        }
    }
}

/// Everything the engine loop produces for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOutput {
    pub status: RunStatus,
    pub equity_curve: Vec<EquityPoint>,
    /// Strategy and liquidation fills, in execution order.
    pub fills: Vec<Fill>,
    pub rejections: Vec<Rejection>,
    pub final_portfolio: PortfolioState,
    /// Number of snapshots fully processed.
    pub snapshots_processed: usize,
    pub liquidation: Option<LiquidationCause>,
}

impl EngineOutput {
    pub fn final_equity(&self) -> f64 {
        self.final_portfolio.equity()
    }
}
