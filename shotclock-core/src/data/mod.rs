//! Input streams: causal alignment of game states onto market ticks.

pub mod align;

pub use align::{align, verify_snapshot, AlignError, StreamKind};
