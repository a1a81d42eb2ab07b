//! Average True Range (ATR), simple-mean form.
//!
//! True Range = max(high - low, |high - prev_close|, |low - prev_close|).
//! TR[0] is absent (no previous close).
//! ATR[i] = mean(TR[i-period+1..=i]) once `period` true ranges exist.
//! Lookback: period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let tr = true_range(bars);
        let n = bars.len();
        let mut result = vec![None; n];
        if n <= self.period {
            return result;
        }
        for i in self.period..n {
            let window = &tr[(i + 1 - self.period)..=i];
            let mut sum = 0.0;
            let mut complete = true;
            for v in window {
                match v {
                    Some(x) => sum += x,
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if complete {
                result[i] = Some(sum / self.period as f64);
            }
        }
        result
    }
}

/// True range per bar. Absent for the first bar and wherever an input is
/// non-finite.
pub fn true_range(bars: &[Bar]) -> Vec<Option<f64>> {
    let mut tr = vec![None; bars.len()];
    for i in 1..bars.len() {
        let (high, low, prev_close) = (bars[i].high, bars[i].low, bars[i - 1].close);
        if !(high.is_finite() && low.is_finite() && prev_close.is_finite()) {
            continue;
        }
        let range = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        tr[i] = Some(range);
    }
    tr
}
