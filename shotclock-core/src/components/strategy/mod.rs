//! Strategy: the pluggable decision function.
//!
//! A strategy sees one snapshot at a time, together with a read-only view of
//! the portfolio and the rejections its previous orders produced. It returns
//! orders plus its updated private memory. The engine threads that memory
//! through every call and never inspects it.
//!
//! # Architecture invariants
//! - `decide` takes `&self` and borrows the snapshot and portfolio immutably:
//!   a strategy cannot mutate either.
//! - All per-run state lives in `Memory`, owned by the run, so one strategy
//!   instance can drive any number of games concurrently.
//! - Same snapshots + same memory ⇒ same orders.

pub mod late_game_shock_fade;
pub mod late_game_underdog;
pub mod micro_momentum_follow;
pub mod no_score_spike_revert;
pub mod panic_spread_fade;
pub mod price_shock_momentum;
pub mod price_threshold;
pub mod tight_game_coinflip;
pub mod underdog_resilience;

pub use late_game_shock_fade::LateGameShockFade;
pub use late_game_underdog::LateGameUnderdog;
pub use micro_momentum_follow::MicroMomentumFollow;
pub use no_score_spike_revert::NoScoreSpikeRevert;
pub use panic_spread_fade::PanicSpreadFade;
pub use price_shock_momentum::PriceShockMomentum;
pub use price_threshold::PriceThreshold;
pub use tight_game_coinflip::TightGameCoinflip;
pub use underdog_resilience::UnderdogResilience;

use crate::domain::{Order, PortfolioState, Quote, Rejection, Snapshot};
use std::fmt::Debug;

/// Everything a strategy may look at when deciding.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub snapshot: &'a Snapshot,
    pub portfolio: &'a PortfolioState,
    /// Rejections of the orders returned on the previous snapshot.
    pub recent_rejections: &'a [Rejection],
}

/// Orders for the current snapshot plus the memory to carry forward.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision<M> {
    pub orders: Vec<Order>,
    pub memory: M,
}

impl<M> Decision<M> {
    pub fn new(orders: Vec<Order>, memory: M) -> Self {
        Self { orders, memory }
    }

    /// No orders; memory carried forward.
    pub fn hold(memory: M) -> Self {
        Self {
            orders: Vec::new(),
            memory,
        }
    }
}

/// Trait for strategies.
pub trait Strategy: Send + Sync {
    /// Strategy-private state threaded between snapshots. Starts at `Default`.
    type Memory: Clone + Default + Debug + Send;

    /// Human-readable name (e.g., "price_threshold").
    fn name(&self) -> &str;

    /// Decide on the current snapshot.
    fn decide(&self, ctx: &DecisionContext<'_>, memory: Self::Memory) -> Decision<Self::Memory>;
}

/// Price paid to open a long: ask when quoted, else the quoted price.
pub(crate) fn open_price(quote: &Quote) -> f64 {
    quote.ask.unwrap_or(quote.price)
}

/// Contracts bought for a dollar stake at `price`.
pub(crate) fn stake_quantity(stake: f64, price: f64) -> f64 {
    if price <= 0.0 {
        0.0
    } else {
        stake / price
    }
}
