//! Strategy components: the decision trait, sample strategies, and the factory.

pub mod factory;
pub mod strategy;

pub use factory::{build_strategy, FactoryError, StrategyKind, STRATEGY_NAMES};
pub use strategy::{Decision, DecisionContext, Strategy};
