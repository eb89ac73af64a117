//! Run fingerprinting: deterministic identification of strategy configs and datasets.
//!
//! - `StrategyConfig`: strategy name, optional target outcome, numeric params.
//! - `ConfigHash`: exact identity of a strategy config (name + outcome + params).
//! - `DatasetHash`: content hash of one game's two input streams.
//!
//! Hashes are BLAKE3 over a canonical byte encoding, stable across runs and platforms.

use crate::domain::{EventStateObservation, MarketTick};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Strategy selection plus its parameter mapping, e.g.
/// `{name: "price_threshold", params: {entry_threshold: 0.45, max_position: 100}}`.
///
/// `BTreeMap` keeps parameter order deterministic for hashing and output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyConfig {
    pub name: String,
    /// Outcome the strategy trades; strategies that pick a side per tick ignore it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl StrategyConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: None,
            params: BTreeMap::new(),
        }
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: f64) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Exact hash: name + outcome + every parameter value.
    pub fn full_hash(&self) -> ConfigHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(&[0]);
        if let Some(outcome) = &self.outcome {
            hasher.update(outcome.as_bytes());
        }
        hasher.update(&[0]);
        for (key, value) in &self.params {
            hasher.update(key.as_bytes());
            hasher.update(&value.to_bits().to_le_bytes());
        }
        ConfigHash(hasher.finalize().to_hex().to_string())
    }
}

/// Deterministic strategy configuration hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content hash of a game's input streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    /// First 12 hex chars, for directory names and log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hash_timestamp(hasher: &mut blake3::Hasher, ts: &DateTime<Utc>) {
    hasher.update(&ts.timestamp().to_le_bytes());
    hasher.update(&ts.timestamp_subsec_nanos().to_le_bytes());
}

/// Hash both input streams in order. Any change to a value or to ordering
/// changes the hash.
pub fn dataset_hash(states: &[EventStateObservation], ticks: &[MarketTick]) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();

    hasher.update(&(states.len() as u64).to_le_bytes());
    for s in states {
        hash_timestamp(&mut hasher, &s.timestamp);
        hasher.update(&s.score_home.to_le_bytes());
        hasher.update(&s.score_away.to_le_bytes());
        hasher.update(&s.period.to_le_bytes());
        hasher.update(&s.clock_remaining.to_bits().to_le_bytes());
        hasher.update(&[u8::from(s.is_final)]);
    }

    hasher.update(&(ticks.len() as u64).to_le_bytes());
    for t in ticks {
        hash_timestamp(&mut hasher, &t.timestamp);
        hasher.update(t.event_ticker.as_bytes());
        hasher.update(&[0]);
        for (outcome, quote) in &t.side_prices {
            hasher.update(outcome.as_bytes());
            hasher.update(&quote.price.to_bits().to_le_bytes());
            hasher.update(&quote.bid.map_or(u64::MAX, f64::to_bits).to_le_bytes());
            hasher.update(&quote.ask.map_or(u64::MAX, f64::to_bits).to_le_bytes());
        }
        hasher.update(&t.volume.unwrap_or(u64::MAX).to_le_bytes());
    }

    DatasetHash(hasher.finalize().to_hex().to_string())
}
