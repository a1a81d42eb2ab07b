//! Bar: one OHLCV observation for a ticker on a calendar date from one source.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single ticker on a single day, as reported by one source.
///
/// Prices read back from legacy rows with missing values are `NaN`; such a bar
/// is void and every indicator window that contains it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ticker: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub source: String,
}

impl Bar {
    /// Returns true if any price field is not finite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0
    }
}
