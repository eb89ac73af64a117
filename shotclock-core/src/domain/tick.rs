//! MarketTick: one observed price update for an event's outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome label for the home side of a moneyline market.
pub const HOME: &str = "home";
/// Outcome label for the away side of a moneyline market.
pub const AWAY: &str = "away";

/// Price observation for a single outcome, normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Last / mid price.
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<f64>,
}

impl Quote {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            bid: None,
            ask: None,
        }
    }

    pub fn with_spread(price: f64, bid: f64, ask: f64) -> Self {
        Self {
            price,
            bid: Some(bid),
            ask: Some(ask),
        }
    }

    /// Build a quote from integer cents (0..=100).
    pub fn from_cents(cents: u32) -> Self {
        Self::new(f64::from(cents) / 100.0)
    }

    pub fn spread(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// All present prices are finite and inside [0, 1].
    pub fn is_valid(&self) -> bool {
        let in_range = |p: f64| p.is_finite() && (0.0..=1.0).contains(&p);
        in_range(self.price) && self.bid.map_or(true, in_range) && self.ask.map_or(true, in_range)
    }
}

/// A single market price update for one game.
///
/// `side_prices` is keyed by outcome label (`"home"`, `"away"`, or a venue
/// market ticker). `BTreeMap` keeps iteration order stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTick {
    pub timestamp: DateTime<Utc>,
    pub event_ticker: String,
    pub side_prices: BTreeMap<String, Quote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

impl MarketTick {
    pub fn new(timestamp: DateTime<Utc>, event_ticker: impl Into<String>) -> Self {
        Self {
            timestamp,
            event_ticker: event_ticker.into(),
            side_prices: BTreeMap::new(),
            volume: None,
        }
    }

    pub fn with_price(self, outcome: impl Into<String>, price: f64) -> Self {
        self.with_quote(outcome, Quote::new(price))
    }

    pub fn with_quote(mut self, outcome: impl Into<String>, quote: Quote) -> Self {
        self.side_prices.insert(outcome.into(), quote);
        self
    }

    pub fn with_volume(mut self, volume: u64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn quote(&self, outcome: &str) -> Option<&Quote> {
        self.side_prices.get(outcome)
    }

    pub fn price(&self, outcome: &str) -> Option<f64> {
        self.quote(outcome).map(|q| q.price)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &str> {
        self.side_prices.keys().map(String::as_str)
    }

    /// Lowest-priced outcome. Ties resolve to the first label in key order.
    pub fn cheapest(&self) -> Option<(&str, f64)> {
        self.side_prices
            .iter()
            .fold(None, |best: Option<(&str, f64)>, (outcome, quote)| match best {
                Some((_, p)) if p <= quote.price => best,
                _ => Some((outcome.as_str(), quote.price)),
            })
    }

    /// The other outcome of a two-outcome market.
    pub fn opposite(&self, outcome: &str) -> Option<&str> {
        if self.side_prices.len() != 2 || !self.side_prices.contains_key(outcome) {
            return None;
        }
        self.outcomes().find(|o| *o != outcome)
    }
}
