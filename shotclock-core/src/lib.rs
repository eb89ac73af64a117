//! Shotclock Core: alignment, strategies, portfolio simulation, engine loop.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (game-state observations, market ticks, snapshots, orders, fills, portfolio)
//! - Causal alignment of game states onto ticks (no look-ahead)
//! - Strategy trait with strategy-owned memory, sample strategies and a factory
//! - Portfolio simulator with fee, fill-pricing and exposure models
//! - Snapshot-by-snapshot engine loop with terminal liquidation

pub mod components;
pub mod data;
pub mod domain;
pub mod engine;
pub mod fingerprint;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: all core types are Send + Sync.
    ///
    /// Batch mode runs games on a rayon pool; any type that stops being
    /// Send + Sync breaks the build here first.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::EventStateObservation>();
        require_sync::<domain::EventStateObservation>();
        require_send::<domain::MarketTick>();
        require_sync::<domain::MarketTick>();
        require_send::<domain::Snapshot>();
        require_sync::<domain::Snapshot>();
        require_send::<domain::Order>();
        require_sync::<domain::Order>();
        require_send::<domain::Rejection>();
        require_sync::<domain::Rejection>();
        require_send::<domain::Fill>();
        require_sync::<domain::Fill>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::PortfolioState>();
        require_sync::<domain::PortfolioState>();

        // Alignment
        require_send::<data::AlignError>();
        require_sync::<data::AlignError>();

        // Fingerprint types
        require_send::<fingerprint::StrategyConfig>();
        require_sync::<fingerprint::StrategyConfig>();
        require_send::<fingerprint::DatasetHash>();
        require_sync::<fingerprint::DatasetHash>();

        // Engine types
        require_send::<engine::SimConfig>();
        require_sync::<engine::SimConfig>();
        require_send::<engine::EngineOutput>();
        require_sync::<engine::EngineOutput>();
        require_send::<engine::PortfolioSimulator>();
        require_sync::<engine::PortfolioSimulator>();

        // Strategies
        require_send::<components::StrategyKind>();
        require_sync::<components::StrategyKind>();
    }

    /// Architecture contract: strategies cannot mutate the snapshot or portfolio.
    ///
    /// `decide` takes `&self` and a `DecisionContext` of shared borrows; memory
    /// is passed by value and returned. If this compiles, the contract holds.
    #[test]
    fn strategy_trait_borrows_inputs_immutably() {
        fn _check<S: components::Strategy>(
            s: &S,
            snapshot: &domain::Snapshot,
            portfolio: &domain::PortfolioState,
            memory: S::Memory,
        ) -> components::Decision<S::Memory> {
            s.decide(
                &components::DecisionContext {
                    snapshot,
                    portfolio,
                    recent_rejections: &[],
                },
                memory,
            )
        }
    }
}
