//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2/(period+1).
//! Seed: EMA[0] = close[0]. No warm-up window, so every row has a value.
//! Lookback: 0.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// EMA over an arbitrary series, seeded with the first finite value.
///
/// Leading non-finite values are absent. Once seeded, a non-finite value
/// taints that row and every row after it.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev: Option<f64> = None;

    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            if prev.is_some() {
                return result;
            }
            continue;
        }
        let ema = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        result[i] = Some(ema);
        prev = Some(ema);
    }
    result
}
