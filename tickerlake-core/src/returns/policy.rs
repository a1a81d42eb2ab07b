//! Per-window source resolution.

use serde::{Deserialize, Serialize};

use super::ReturnWindow;
use crate::domain::{tags, SourceChain};

/// Ordered source chain for each return window.
///
/// Each window is resolved independently: a ticker can take its YTD return
/// from the fallback source and its quarter return from the primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnsPolicy {
    pub ytd: SourceChain,
    pub quarter: SourceChain,
    pub year: SourceChain,
}

impl ReturnsPolicy {
    /// The same chain for every window.
    pub fn uniform(chain: SourceChain) -> Self {
        Self {
            ytd: chain.clone(),
            quarter: chain.clone(),
            year: chain,
        }
    }

    pub fn chain(&self, window: ReturnWindow) -> &SourceChain {
        match window {
            ReturnWindow::Ytd => &self.ytd,
            ReturnWindow::Quarter => &self.quarter,
            ReturnWindow::Year => &self.year,
        }
    }
}

impl Default for ReturnsPolicy {
    fn default() -> Self {
        Self::uniform(SourceChain::new([tags::ALPHAVANTAGE, tags::YFINANCE]))
    }
}
