//! Inclusive calendar-date windows.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window of `days` calendar days ending at `end` (inclusive).
    pub fn trailing_days(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}
