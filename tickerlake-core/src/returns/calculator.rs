//! Returns Calculator: resolves each window through its source chain.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{window_return, ReturnWindow, ReturnsPolicy};
use crate::domain::canonical_or_empty;
use crate::store::BarHistory;

/// The three trailing returns for one ticker, each with the source it came from.
///
/// A `None` value means the window had no usable bars in any source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailingReturns {
    pub ticker: String,
    pub as_of: Option<NaiveDate>,
    pub ytd: Option<f64>,
    pub quarter: Option<f64>,
    pub year: Option<f64>,
    pub ytd_source: Option<String>,
    pub quarter_source: Option<String>,
    pub year_source: Option<String>,
}

impl TrailingReturns {
    pub fn get(&self, window: ReturnWindow) -> Option<f64> {
        match window {
            ReturnWindow::Ytd => self.ytd,
            ReturnWindow::Quarter => self.quarter,
            ReturnWindow::Year => self.year,
        }
    }

    pub fn source(&self, window: ReturnWindow) -> Option<&str> {
        match window {
            ReturnWindow::Ytd => self.ytd_source.as_deref(),
            ReturnWindow::Quarter => self.quarter_source.as_deref(),
            ReturnWindow::Year => self.year_source.as_deref(),
        }
    }

    fn set(&mut self, window: ReturnWindow, value: f64, source: &str) {
        let (slot, src) = match window {
            ReturnWindow::Ytd => (&mut self.ytd, &mut self.ytd_source),
            ReturnWindow::Quarter => (&mut self.quarter, &mut self.quarter_source),
            ReturnWindow::Year => (&mut self.year, &mut self.year_source),
        };
        *slot = Some(value);
        *src = Some(source.to_string());
    }

    /// True when no window resolved.
    pub fn is_empty(&self) -> bool {
        ReturnWindow::ALL.iter().all(|w| self.get(*w).is_none())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReturnsCalculator {
    policy: ReturnsPolicy,
}

impl ReturnsCalculator {
    pub fn new(policy: ReturnsPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ReturnsPolicy {
        &self.policy
    }

    /// Compute all three windows ending at `as_of`.
    ///
    /// A failed query for one source is logged and treated like an empty
    /// result, so the next source in that window's chain is tried.
    pub fn compute(&self, history: &impl BarHistory, ticker: &str, as_of: NaiveDate) -> TrailingReturns {
        let ticker = canonical_or_empty(ticker);
        let mut out = TrailingReturns {
            ticker: ticker.clone(),
            as_of: Some(as_of),
            ..TrailingReturns::default()
        };

        for window in ReturnWindow::ALL {
            let range = window.range(as_of);
            for source in self.policy.chain(window).iter() {
                let bars = match history.bars_between(&ticker, source, range) {
                    Ok(bars) => bars,
                    Err(e) => {
                        warn!(ticker = %ticker, source, window = %window, error = %e, "return query failed");
                        continue;
                    }
                };
                if let Some(value) = window_return(&bars) {
                    out.set(window, value, source);
                    break;
                }
                debug!(ticker = %ticker, source, window = %window, "no return from source");
            }
        }
        out
    }
}
