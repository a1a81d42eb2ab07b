//! Ticker universe: the list of symbols an ingestion run covers.
//!
//! Loaded from a JSON tickers file of the form
//! `{"tickers": [{"symbol": "AAPL", "tipo": "Stock", ...}, "MSFT"]}`.
//! Object entries keep their full body so they can also be ingested as
//! `manual` profiles. Bare-string entries carry no type and are excluded
//! whenever a type filter is active.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::normalize_ticker;

/// Universe used when no tickers file is available.
pub const DEFAULT_TICKERS: [&str; 3] = ["AMZN", "AAPL", "NVDA"];

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read tickers file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse tickers file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("tickers file has no valid entries")]
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerUniverse {
    tickers: Vec<String>,
    entries: BTreeMap<String, Value>,
}

impl Default for TickerUniverse {
    fn default() -> Self {
        Self::from_symbols(DEFAULT_TICKERS)
    }
}

impl TickerUniverse {
    /// Build a universe from plain symbols (normalized, blanks and repeats dropped).
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tickers = Vec::new();
        for s in symbols {
            if let Some(t) = normalize_ticker(s.as_ref()) {
                if !tickers.contains(&t) {
                    tickers.push(t);
                }
            }
        }
        Self {
            tickers,
            entries: BTreeMap::new(),
        }
    }

    /// Parse a tickers file body, keeping only entries whose `tipo` equals `type_filter`.
    pub fn from_json(content: &str, type_filter: Option<&str>) -> Result<Self, UniverseError> {
        let data: Value = serde_json::from_str(content)?;
        let items = data
            .get("tickers")
            .and_then(Value::as_array)
            .ok_or(UniverseError::Empty)?;

        let mut tickers = Vec::new();
        let mut entries = BTreeMap::new();
        for item in items {
            let (symbol, tipo) = match item {
                Value::Object(map) => {
                    let symbol = map.get("symbol").and_then(Value::as_str).and_then(normalize_ticker);
                    let tipo = map.get("tipo").and_then(Value::as_str);
                    (symbol, tipo)
                }
                Value::String(s) => (normalize_ticker(s), None),
                _ => (None, None),
            };
            let Some(symbol) = symbol else { continue };

            if item.is_object() {
                entries.insert(symbol.clone(), item.clone());
            }
            let keep = match type_filter {
                Some(wanted) => tipo == Some(wanted),
                None => true,
            };
            if keep && !tickers.contains(&symbol) {
                tickers.push(symbol);
            }
        }

        if tickers.is_empty() {
            return Err(UniverseError::Empty);
        }
        Ok(Self { tickers, entries })
    }

    /// Load a tickers file, falling back to [`DEFAULT_TICKERS`] when it is
    /// missing, unreadable, or yields no tickers.
    pub fn load_or_default(path: &Path, type_filter: Option<&str>) -> Self {
        let loaded = std::fs::read_to_string(path)
            .map_err(UniverseError::from)
            .and_then(|content| Self::from_json(&content, type_filter));
        match loaded {
            Ok(universe) => {
                info!(path = %path.display(), tickers = universe.len(), "loaded ticker universe");
                universe
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "using default tickers");
                Self::default()
            }
        }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// The raw file entry for `ticker`, if the file described it as an object.
    pub fn entry(&self, ticker: &str) -> Option<&Value> {
        normalize_ticker(ticker).and_then(|t| self.entries.get(&t))
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}
