//! Trailing returns: year-to-date, trailing quarter and trailing year.
//!
//! A return is `last_close / first_close - 1` over the bars of one source
//! inside the window. A window without usable bars has no return; callers
//! receive `None`, never `0.0`.

mod calculator;
mod policy;

pub use calculator::{ReturnsCalculator, TrailingReturns};
pub use policy::ReturnsPolicy;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Bar, DateWindow};

/// Calendar days covered by the trailing quarter.
pub const QUARTER_DAYS: u32 = 90;
/// Calendar days covered by the trailing year.
pub const YEAR_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnWindow {
    /// Since January 1 of the `as_of` year.
    Ytd,
    Quarter,
    Year,
}

impl ReturnWindow {
    pub const ALL: [ReturnWindow; 3] = [ReturnWindow::Ytd, ReturnWindow::Quarter, ReturnWindow::Year];

    pub fn as_str(self) -> &'static str {
        match self {
            ReturnWindow::Ytd => "ytd",
            ReturnWindow::Quarter => "quarter",
            ReturnWindow::Year => "year",
        }
    }

    /// Inclusive date range `[start, as_of]` for this window.
    pub fn range(self, as_of: NaiveDate) -> DateWindow {
        match self {
            ReturnWindow::Ytd => {
                let jan_first = NaiveDate::from_ymd_opt(as_of.year(), 1, 1).unwrap_or(as_of);
                DateWindow::new(jan_first, as_of)
            }
            ReturnWindow::Quarter => DateWindow::trailing_days(as_of, QUARTER_DAYS),
            ReturnWindow::Year => DateWindow::trailing_days(as_of, YEAR_DAYS),
        }
    }
}

impl fmt::Display for ReturnWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return over `bars` (ascending by date): last finite close over first
/// finite close, minus one.
///
/// `None` when there is no finite close, when the first close is zero, or
/// when the result is not finite.
pub fn window_return(bars: &[Bar]) -> Option<f64> {
    let first = bars.iter().map(|b| b.close).find(|c| c.is_finite())?;
    let last = bars.iter().rev().map(|b| b.close).find(|c| c.is_finite())?;
    if first == 0.0 {
        return None;
    }
    let r = last / first - 1.0;
    r.is_finite().then_some(r)
}
