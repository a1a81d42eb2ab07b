//! Simple Moving Average (SMA).
//!
//! Mean of the trailing `period` closes.
//! Lookback: period - 1 (first value at index period-1).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        sma_of_series(&closes, self.period)
    }
}

/// SMA over an arbitrary series. A window holding a non-finite value is absent.
///
/// Each window is summed from scratch so that a value never depends on
/// rounding carried over from earlier windows.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().all(|v| v.is_finite()) {
            result[i] = Some(window.iter().sum::<f64>() / period as f64);
        }
    }
    result
}
