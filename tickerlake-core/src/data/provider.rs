//! Provider identities and normalization error types.
//!
//! A provider is identified by the payload shape it returns, not by vendor:
//! the three Financial Modeling Prep endpoints each have their own variant
//! because each one produces a different record group.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{tags, EntityKind};

/// A declared provider payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    YahooChart,
    AlphavantageDaily,
    PolygonAggregates,
    FinnhubQuote,
    FmpProfile,
    FmpRatios,
    FmpIncomeStatement,
    Newsapi,
    ManualTickerInfo,
}

impl Provider {
    pub const ALL: [Provider; 9] = [
        Provider::YahooChart,
        Provider::AlphavantageDaily,
        Provider::PolygonAggregates,
        Provider::FinnhubQuote,
        Provider::FmpProfile,
        Provider::FmpRatios,
        Provider::FmpIncomeStatement,
        Provider::Newsapi,
        Provider::ManualTickerInfo,
    ];

    /// Stable identifier, used in config files and payload file names.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::YahooChart => "yahoo_chart",
            Provider::AlphavantageDaily => "alphavantage_daily",
            Provider::PolygonAggregates => "polygon_aggregates",
            Provider::FinnhubQuote => "finnhub_quote",
            Provider::FmpProfile => "fmp_profile",
            Provider::FmpRatios => "fmp_ratios",
            Provider::FmpIncomeStatement => "fmp_income_statement",
            Provider::Newsapi => "newsapi",
            Provider::ManualTickerInfo => "manual_ticker_info",
        }
    }

    /// The `source` tag written on records from this provider.
    pub fn source_tag(&self) -> &'static str {
        match self {
            Provider::YahooChart => tags::YFINANCE,
            Provider::AlphavantageDaily => tags::ALPHAVANTAGE,
            Provider::PolygonAggregates => tags::POLYGON,
            Provider::FinnhubQuote => tags::FINHUB,
            Provider::FmpProfile | Provider::FmpRatios | Provider::FmpIncomeStatement => tags::FMP,
            Provider::Newsapi => "newsapi",
            Provider::ManualTickerInfo => tags::MANUAL,
        }
    }

    /// Endpoint/category selector for vendors with several endpoints.
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            Provider::FmpProfile => Some("profile"),
            Provider::FmpRatios => Some("ratios"),
            Provider::FmpIncomeStatement => Some("income-statement"),
            _ => None,
        }
    }

    pub fn entity(&self) -> EntityKind {
        match self {
            Provider::YahooChart | Provider::AlphavantageDaily | Provider::PolygonAggregates => {
                EntityKind::Bars
            }
            Provider::FinnhubQuote => EntityKind::Quotes,
            Provider::FmpProfile | Provider::ManualTickerInfo => EntityKind::Profiles,
            Provider::FmpRatios | Provider::FmpIncomeStatement => EntityKind::Fundamentals,
            Provider::Newsapi => EntityKind::News,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or(NormalizeError::UnknownProvider(wanted))
    }
}

/// Structured errors for normalization.
///
/// `MalformedPayload` is used both for a payload whose overall shape is wrong
/// (returned as `Err`) and for individual records that miss a required field
/// (collected in `Normalized::rejected`, the rest of the payload still loads).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("malformed {provider} payload: {reason}")]
    MalformedPayload { provider: Provider, reason: String },

    #[error("invalid ticker symbol {0:?}")]
    InvalidTicker(String),

    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
}

impl NormalizeError {
    pub(crate) fn malformed(provider: Provider, reason: impl Into<String>) -> Self {
        NormalizeError::MalformedPayload {
            provider,
            reason: reason.into(),
        }
    }
}
