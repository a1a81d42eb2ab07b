//! Source tags and ordered source-fallback chains.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source tags written into the `source` column.
pub mod tags {
    pub const YFINANCE: &str = "yfinance";
    pub const ALPHAVANTAGE: &str = "alphavantage";
    pub const POLYGON: &str = "polygon";
    pub const FINHUB: &str = "finhub";
    pub const FMP: &str = "fmp";
    pub const MANUAL: &str = "manual";
}

/// An ordered list of sources consulted one after another until one yields a value.
///
/// Fallback is always expressed as data: callers iterate the chain instead of
/// nesting provider-specific conditionals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceChain(Vec<String>);

impl SourceChain {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: Vec<String> = Vec::new();
        for source in sources {
            let source = source.into().trim().to_string();
            if !source.is_empty() && !seen.contains(&source) {
                seen.push(source);
            }
        }
        Self(seen)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for SourceChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" -> "))
    }
}
