//! Domain types: observations, ticks, snapshots, orders, fills, positions, portfolio.

pub mod fill;
pub mod observation;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod snapshot;
pub mod tick;

pub use fill::{Fill, FillKind};
pub use observation::EventStateObservation;
pub use order::{Order, OrderAction, OrderKind, RejectReason, Rejection};
pub use portfolio::{PortfolioState, ACCOUNTING_EPSILON};
pub use position::{Position, QTY_EPSILON};
pub use snapshot::Snapshot;
pub use tick::{MarketTick, Quote, AWAY, HOME};
