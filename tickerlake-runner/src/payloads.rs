//! Payload sources: where the pipeline gets already-decoded provider JSON.
//!
//! A source answers "what did provider P return for ticker T" with a JSON
//! value, or `None` when there is nothing. Transport failures never reach
//! the pipeline; a source that cannot read a payload reports `None` and logs.

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use tickerlake_core::data::{Provider, TickerUniverse};
use tickerlake_core::domain::canonical_or_empty;

/// The provider-adapter boundary.
pub trait PayloadSource: Send + Sync {
    fn fetch(&self, provider: Provider, ticker: &str) -> Option<Value>;
}

/// Reads `{root}/{TICKER}/{provider}.json`.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    root: PathBuf,
}

impl JsonDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, provider: Provider, ticker: &str) -> PathBuf {
        self.root
            .join(canonical_or_empty(ticker))
            .join(format!("{}.json", provider.name()))
    }
}

impl PayloadSource for JsonDirSource {
    fn fetch(&self, provider: Provider, ticker: &str) -> Option<Value> {
        let path = self.path_for(provider, ticker);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no payload file");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "payload file unreadable");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "payload file is not JSON");
                None
            }
        }
    }
}

/// In-memory payloads keyed by (provider, ticker).
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    payloads: HashMap<(Provider, String), Value>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, provider: Provider, ticker: &str, payload: Value) {
        self.payloads.insert((provider, canonical_or_empty(ticker)), payload);
    }

    pub fn with(mut self, provider: Provider, ticker: &str, payload: Value) -> Self {
        self.insert(provider, ticker, payload);
        self
    }
}

impl PayloadSource for MemorySource {
    fn fetch(&self, provider: Provider, ticker: &str) -> Option<Value> {
        self.payloads.get(&(provider, canonical_or_empty(ticker))).cloned()
    }
}

/// Serves `manual_ticker_info` from the tickers file entries and defers
/// every other provider to `inner`.
pub struct UniverseSource<S> {
    universe: TickerUniverse,
    inner: S,
}

impl<S: PayloadSource> UniverseSource<S> {
    pub fn new(universe: TickerUniverse, inner: S) -> Self {
        Self { universe, inner }
    }
}

impl<S: PayloadSource> PayloadSource for UniverseSource<S> {
    fn fetch(&self, provider: Provider, ticker: &str) -> Option<Value> {
        if provider == Provider::ManualTickerInfo {
            if let Some(entry) = self.universe.entry(ticker) {
                return Some(entry.clone());
            }
        }
        self.inner.fetch(provider, ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_dir_reads_per_ticker_files() {
        let dir = tempfile::tempdir().unwrap();
        let ticker_dir = dir.path().join("AAPL");
        std::fs::create_dir_all(&ticker_dir).unwrap();
        std::fs::write(ticker_dir.join("finnhub_quote.json"), r#"{"c": 190.5}"#).unwrap();
        std::fs::write(ticker_dir.join("newsapi.json"), "not json").unwrap();

        let source = JsonDirSource::new(dir.path());
        assert_eq!(source.fetch(Provider::FinnhubQuote, "aapl"), Some(json!({"c": 190.5})));
        assert_eq!(source.fetch(Provider::Newsapi, "AAPL"), None);
        assert_eq!(source.fetch(Provider::FmpProfile, "AAPL"), None);
    }

    #[test]
    fn memory_source_normalizes_tickers() {
        let source = MemorySource::new().with(Provider::FmpProfile, " msft", json!([]));
        assert!(source.fetch(Provider::FmpProfile, "MSFT").is_some());
        assert!(source.fetch(Provider::FmpRatios, "MSFT").is_none());
    }

    #[test]
    fn universe_entries_serve_manual_profiles() {
        let universe =
            TickerUniverse::from_json(r#"{"tickers": [{"symbol": "NVDA", "tipo": "Stock", "pais": "USA"}]}"#, None)
                .unwrap();
        let source = UniverseSource::new(universe, MemorySource::new());
        let entry = source.fetch(Provider::ManualTickerInfo, "nvda").unwrap();
        assert_eq!(entry["pais"], "USA");
        assert!(source.fetch(Provider::FinnhubQuote, "NVDA").is_none());
    }
}
