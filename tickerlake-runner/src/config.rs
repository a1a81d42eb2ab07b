//! Pipeline configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [store]
//! path = "financial_data.db"
//!
//! [ingest]
//! tickers_file = "tickers.json"
//! payload_dir = "payloads"
//!
//! [indicators]
//! sources = ["yfinance", "alphavantage", "polygon"]
//!
//! [returns]
//! quarter = ["polygon", "alphavantage"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use tickerlake_core::data::{
    Normalizer, Provider, TickerUniverse, DEFAULT_FUNDAMENTAL_PERIODS, DEFAULT_NEWS_LIMIT,
};
use tickerlake_core::domain::{tags, SourceChain};
use tickerlake_core::indicators::engine::DEFAULT_HISTORY_DAYS;
use tickerlake_core::indicators::IndicatorEngine;
use tickerlake_core::returns::{ReturnWindow, ReturnsCalculator, ReturnsPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete runner configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub indicators: IndicatorConfig,
    pub returns: ReturnsPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("financial_data.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Explicit tickers. When empty the universe comes from `tickers_file`.
    pub tickers: Vec<String>,
    pub tickers_file: Option<PathBuf>,
    /// Only entries of this type are taken from `tickers_file`.
    pub ticker_type: Option<String>,
    /// Root of `{TICKER}/{provider}.json` payload files.
    pub payload_dir: PathBuf,
    pub news_limit: usize,
    pub fundamental_periods: usize,
    pub providers: Vec<Provider>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tickers: Vec::new(),
            tickers_file: None,
            ticker_type: Some("Stock".to_string()),
            payload_dir: PathBuf::from("payloads"),
            news_limit: DEFAULT_NEWS_LIMIT,
            fundamental_periods: DEFAULT_FUNDAMENTAL_PERIODS,
            providers: Provider::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Bar sources tried in order; the first with bars feeds every row.
    pub sources: SourceChain,
    pub history_days: u32,
    /// Recompute tickers on the rayon pool.
    pub parallel: bool,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sources: SourceChain::new([tags::YFINANCE, tags::ALPHAVANTAGE, tags::POLYGON]),
            history_days: DEFAULT_HISTORY_DAYS,
            parallel: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indicators.sources.is_empty() {
            return Err(ConfigError::Invalid("indicators.sources is empty".into()));
        }
        if self.indicators.history_days == 0 {
            return Err(ConfigError::Invalid("indicators.history_days must be > 0".into()));
        }
        for window in ReturnWindow::ALL {
            if self.returns.chain(window).is_empty() {
                return Err(ConfigError::Invalid(format!("returns.{window} is empty")));
            }
        }
        if self.ingest.news_limit == 0 {
            return Err(ConfigError::Invalid("ingest.news_limit must be > 0".into()));
        }
        if self.ingest.fundamental_periods == 0 {
            return Err(ConfigError::Invalid("ingest.fundamental_periods must be > 0".into()));
        }
        if self.ingest.providers.is_empty() {
            return Err(ConfigError::Invalid("ingest.providers is empty".into()));
        }
        Ok(())
    }

    /// Tickers to process: the explicit list, else the tickers file, else
    /// the default universe.
    pub fn universe(&self) -> TickerUniverse {
        if !self.ingest.tickers.is_empty() {
            return TickerUniverse::from_symbols(&self.ingest.tickers);
        }
        match &self.ingest.tickers_file {
            Some(path) => TickerUniverse::load_or_default(path, self.ingest.ticker_type.as_deref()),
            None => TickerUniverse::default(),
        }
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.ingest.news_limit, self.ingest.fundamental_periods)
    }

    pub fn indicator_engine(&self) -> IndicatorEngine {
        IndicatorEngine::new(self.indicators.sources.clone(), self.indicators.history_days)
    }

    pub fn returns_calculator(&self) -> ReturnsCalculator {
        ReturnsCalculator::new(self.returns.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.store.path, PathBuf::from("financial_data.db"));
        assert_eq!(config.ingest.news_limit, 10);
        assert_eq!(config.ingest.fundamental_periods, 4);
        assert_eq!(config.ingest.providers.len(), Provider::ALL.len());
        assert_eq!(config.indicators.sources.primary(), Some("yfinance"));
        assert_eq!(config.indicators.history_days, 500);
        assert_eq!(config.returns.year.primary(), Some("alphavantage"));
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            [ingest]
            tickers = ["msft", "aapl"]
            providers = ["alphavantage_daily", "finnhub_quote"]

            [indicators]
            sources = ["polygon"]
            parallel = true

            [returns]
            quarter = ["polygon", "yfinance"]
            "#,
        )
        .unwrap();

        assert_eq!(config.ingest.providers, vec![Provider::AlphavantageDaily, Provider::FinnhubQuote]);
        assert_eq!(config.ingest.payload_dir, PathBuf::from("payloads"));
        assert!(config.indicators.parallel);
        assert_eq!(config.indicators.history_days, 500);
        assert_eq!(config.returns.quarter.primary(), Some("polygon"));
        assert_eq!(config.returns.ytd.primary(), Some("alphavantage"));
        assert_eq!(config.universe().tickers(), ["MSFT".to_string(), "AAPL".to_string()]);
    }

    #[test]
    fn empty_chain_is_invalid() {
        let err = PipelineConfig::from_toml("[indicators]\nsources = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PipelineConfig::from_toml("[returns]\nytd = []\n").unwrap_err();
        assert!(err.to_string().contains("returns.ytd"));
    }

    #[test]
    fn zero_limits_are_invalid() {
        let err = PipelineConfig::from_toml("[ingest]\nnews_limit = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_provider_is_a_parse_error() {
        let err = PipelineConfig::from_toml("[ingest]\nproviders = [\"bloomberg\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn universe_falls_back_to_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.universe().tickers(), ["AMZN", "AAPL", "NVDA"].map(String::from));
    }
}
