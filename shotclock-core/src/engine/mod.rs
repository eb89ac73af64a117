//! Backtesting engine: snapshot loop, portfolio simulation and execution model.
//!
//! The engine consumes an aligned snapshot sequence and one strategy, and
//! folds them through a simulated account:
//!
//! 1. Mark-to-market at each tick
//! 2. Strategy decision
//! 3. Order validation and fills
//! 4. Terminal liquidation, equity accounting

pub mod execution;
pub mod loop_runner;
pub mod portfolio_update;
pub mod simulator;
pub mod state;

pub use execution::{ExecutionConfig, FeeModel, FillPricing, LiquidationPricing};
pub use loop_runner::{run_snapshots, run_strategy};
pub use portfolio_update::apply_fill;
pub use simulator::PortfolioSimulator;
pub use state::{EngineOutput, EquityPoint, ExposureMode, LiquidationCause, RunStatus, SimConfig};
