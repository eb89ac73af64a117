//! Input loading: one game per directory.
//!
//! ```text
//! <games>/<game_id>/states.csv    timestamp,score_home,score_away,period,clock_remaining,is_final
//! <games>/<game_id>/ticks.jsonl   {"ts": ..., "event_ticker": ..., "prices": {...}, "bids"?, "asks"?, "volume"?, "unit"?}
//! ```
//!
//! Timestamps are RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or epoch seconds.
//! Tick prices are probabilities in [0, 1], or integer cents when the line
//! carries `"unit": "cents"`. Ordering is not checked here: alignment rejects
//! out-of-order streams.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use shotclock_core::domain::{EventStateObservation, MarketTick, Quote};
use shotclock_core::fingerprint::{dataset_hash, DatasetHash};
use thiserror::Error;
use tracing::debug;

pub const STATES_FILE: &str = "states.csv";
pub const TICKS_FILE: &str = "ticks.jsonl";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: malformed CSV: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path}:{line}: malformed JSON: {source}")]
    Json {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}:{line}: invalid {field} '{value}'")]
    InvalidField {
        path: String,
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("{path}:{line}: price {value} for '{outcome}' outside [0, 1]")]
    InvalidPrice {
        path: String,
        line: usize,
        outcome: String,
        value: f64,
    },
    #[error("no game directories found under {0}")]
    NoGames(String),
}

/// Price unit of a tick line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceUnit {
    #[default]
    Probability,
    Cents,
}

impl PriceUnit {
    fn normalize(self, raw: f64) -> f64 {
        match self {
            PriceUnit::Probability => raw,
            PriceUnit::Cents => raw / 100.0,
        }
    }
}

/// Both input streams for one game, plus their content hash.
#[derive(Debug, Clone)]
pub struct GameData {
    pub game_id: String,
    pub states: Vec<EventStateObservation>,
    pub ticks: Vec<MarketTick>,
    pub dataset_hash: DatasetHash,
}

impl GameData {
    pub fn new(
        game_id: impl Into<String>,
        states: Vec<EventStateObservation>,
        ticks: Vec<MarketTick>,
    ) -> Self {
        let dataset_hash = dataset_hash(&states, &ticks);
        Self {
            game_id: game_id.into(),
            states,
            ticks,
            dataset_hash,
        }
    }
}

// ─── Field parsing ──────────────────────────────────────────────────

/// Timestamp as it may appear in either input file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Epoch(f64),
    Text(String),
}

fn parse_epoch(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    Utc.timestamp_opt(whole as i64, nanos.min(999_999_999)).single()
}

fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    text.parse::<f64>().ok().and_then(parse_epoch)
}

fn parse_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Epoch(secs) => parse_epoch(*secs),
        RawTimestamp::Text(text) => parse_timestamp_text(text),
    }
}

/// Seconds, or a `MM:SS` game clock.
fn parse_clock(text: &str) -> Option<f64> {
    let text = text.trim();
    let secs = match text.split_once(':') {
        Some((m, s)) => m.parse::<f64>().ok()? * 60.0 + s.parse::<f64>().ok()?,
        None => text.parse::<f64>().ok()?,
    };
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "f" | "no" => Some(false),
        "1" | "true" | "t" | "yes" => Some(true),
        _ => None,
    }
}

// ─── States CSV ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StateRow {
    timestamp: String,
    score_home: u32,
    score_away: u32,
    period: u32,
    clock_remaining: String,
    #[serde(default)]
    is_final: String,
}

/// Load an event-state timeline from CSV, preserving file order.
pub fn load_states_csv(path: &Path) -> Result<Vec<EventStateObservation>, LoadError> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: display.clone(),
            source,
        })?;

    let mut states = Vec::new();
    for (i, row) in reader.deserialize::<StateRow>().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = row.map_err(|source| LoadError::Csv {
            path: display.clone(),
            source,
        })?;
        let invalid = |field: &'static str, value: &str| LoadError::InvalidField {
            path: display.clone(),
            line,
            field,
            value: value.to_string(),
        };
        let timestamp =
            parse_timestamp_text(&row.timestamp).ok_or_else(|| invalid("timestamp", &row.timestamp))?;
        let clock = parse_clock(&row.clock_remaining)
            .ok_or_else(|| invalid("clock_remaining", &row.clock_remaining))?;
        let is_final = parse_flag(&row.is_final).ok_or_else(|| invalid("is_final", &row.is_final))?;

        let mut obs =
            EventStateObservation::new(timestamp, row.score_home, row.score_away, row.period, clock);
        obs.is_final = is_final;
        states.push(obs);
    }
    let path_str: &str = &display;
    debug!(path = %path_str, count = states.len(), "loaded states");
    Ok(states)
}

// ─── Ticks JSONL ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TickLine {
    ts: RawTimestamp,
    #[serde(default)]
    event_ticker: String,
    prices: BTreeMap<String, f64>,
    #[serde(default)]
    bids: BTreeMap<String, f64>,
    #[serde(default)]
    asks: BTreeMap<String, f64>,
    #[serde(default)]
    volume: Option<u64>,
    #[serde(default)]
    unit: PriceUnit,
}

/// Load a tick stream from JSON Lines, preserving file order. Blank lines are skipped.
pub fn load_ticks_jsonl(path: &Path) -> Result<Vec<MarketTick>, LoadError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;
    parse_ticks(&content, &display)
}

fn parse_ticks(content: &str, display: &str) -> Result<Vec<MarketTick>, LoadError> {
    let mut ticks = Vec::new();
    for (i, text) in content.lines().enumerate() {
        let line = i + 1;
        if text.trim().is_empty() {
            continue;
        }
        let raw: TickLine = serde_json::from_str(text).map_err(|source| LoadError::Json {
            path: display.to_string(),
            line,
            source,
        })?;
        let timestamp = parse_timestamp(&raw.ts).ok_or_else(|| LoadError::InvalidField {
            path: display.to_string(),
            line,
            field: "ts",
            value: format!("{:?}", raw.ts),
        })?;

        let price = |outcome: &str, value: f64| {
            let p = raw.unit.normalize(value);
            if p.is_finite() && (0.0..=1.0).contains(&p) {
                Ok(p)
            } else {
                Err(LoadError::InvalidPrice {
                    path: display.to_string(),
                    line,
                    outcome: outcome.to_string(),
                    value: p,
                })
            }
        };

        let mut tick = MarketTick::new(timestamp, raw.event_ticker.clone());
        for (outcome, &value) in &raw.prices {
            let quote = Quote {
                price: price(outcome, value)?,
                bid: raw.bids.get(outcome).map(|&b| price(outcome, b)).transpose()?,
                ask: raw.asks.get(outcome).map(|&a| price(outcome, a)).transpose()?,
            };
            tick = tick.with_quote(outcome.clone(), quote);
        }
        if let Some(volume) = raw.volume {
            tick = tick.with_volume(volume);
        }
        ticks.push(tick);
    }
    let path_str: &str = display;
    debug!(path = %path_str, count = ticks.len(), "loaded ticks");
    Ok(ticks)
}

// ─── Game directories ───────────────────────────────────────────────

/// Load `states.csv` and `ticks.jsonl` from one game directory.
///
/// A missing `states.csv` yields an empty timeline: every snapshot then
/// carries no game state. `ticks.jsonl` is required.
pub fn load_game_dir(dir: &Path) -> Result<GameData, LoadError> {
    let game_id = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string());

    let states_path = dir.join(STATES_FILE);
    let states = if states_path.exists() {
        load_states_csv(&states_path)?
    } else {
        Vec::new()
    };
    let ticks = load_ticks_jsonl(&dir.join(TICKS_FILE))?;
    Ok(GameData::new(game_id, states, ticks))
}

/// Subdirectories of `root` that contain a tick stream, sorted by name.
pub fn discover_games(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(root).map_err(|source| LoadError::Io {
        path: root.display().to_string(),
        source,
    })?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: root.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() && path.join(TICKS_FILE).is_file() {
            dirs.push(path);
        }
    }
    if dirs.is_empty() {
        return Err(LoadError::NoGames(root.display().to_string()));
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(parse_timestamp_text("1970-01-01T00:00:10Z"), Some(ts(10)));
        assert_eq!(parse_timestamp_text("1970-01-01 00:00:10"), Some(ts(10)));
        assert_eq!(parse_timestamp_text("10"), Some(ts(10)));
        assert_eq!(parse_timestamp(&RawTimestamp::Epoch(10.0)), Some(ts(10)));
        assert_eq!(parse_timestamp_text("yesterday"), None);
    }

    #[test]
    fn fractional_epoch_keeps_millis() {
        let t = parse_epoch(10.25).unwrap();
        assert_eq!(t.timestamp(), 10);
        assert_eq!(t.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn clock_formats() {
        assert_eq!(parse_clock("150"), Some(150.0));
        assert_eq!(parse_clock("2:30"), Some(150.0));
        assert_eq!(parse_clock("-1"), None);
        assert_eq!(parse_clock("soon"), None);
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn cents_lines_are_normalized() {
        let ticks = parse_ticks(
            r#"{"ts": 10, "event_ticker": "X", "prices": {"home": 40, "away": 62}, "unit": "cents"}"#,
            "mem",
        )
        .unwrap();
        assert_eq!(ticks[0].price("home"), Some(0.40));
        assert_eq!(ticks[0].price("away"), Some(0.62));
    }

    #[test]
    fn bids_and_asks_attach_to_quotes() {
        let ticks = parse_ticks(
            r#"{"ts": "1970-01-01T00:00:10Z", "prices": {"home": 0.5}, "bids": {"home": 0.48}, "asks": {"home": 0.52}, "volume": 7}"#,
            "mem",
        )
        .unwrap();
        let q = ticks[0].quote("home").unwrap();
        assert_eq!(q.bid, Some(0.48));
        assert_eq!(q.ask, Some(0.52));
        assert_eq!(ticks[0].volume, Some(7));
        assert_eq!(ticks[0].event_ticker, "");
    }

    #[test]
    fn out_of_range_price_reports_line() {
        let err = parse_ticks(
            "{\"ts\": 1, \"prices\": {\"home\": 0.5}}\n\n{\"ts\": 2, \"prices\": {\"home\": 55}}\n",
            "mem",
        )
        .unwrap_err();
        match err {
            LoadError::InvalidPrice { line, outcome, .. } => {
                assert_eq!(line, 3);
                assert_eq!(outcome, "home");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_json_reports_line() {
        let err = parse_ticks("{\"ts\": 1, \"prices\": {}}\nnot json\n", "mem").unwrap_err();
        assert!(matches!(err, LoadError::Json { line: 2, .. }));
    }
}
