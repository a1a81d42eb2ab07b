//! Relative Strength Index (RSI), simple-average form.
//!
//! Over the trailing `period` day-over-day close changes:
//! avg_gain = mean(max(change, 0)), avg_loss = mean(max(-change, 0)),
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! When avg_loss is 0 (including a flat window) RSI is 100.
//! Lookback: period (the first change needs a previous close).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        compute_rsi(&closes, self.period)
    }
}

/// RSI over a close series. A window touching a non-finite close is absent.
pub fn compute_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut result = vec![None; n];
    if period == 0 || n <= period {
        return result;
    }

    for i in period..n {
        let window = &closes[(i - period)..=i];
        if !window.iter().all(|c| c.is_finite()) {
            continue;
        }
        let (mut gain, mut loss) = (0.0, 0.0);
        for pair in window.windows(2) {
            let change = pair[1] - pair[0];
            if change > 0.0 {
                gain += change;
            } else {
                loss -= change;
            }
        }
        let avg_gain = gain / period as f64;
        let avg_loss = loss / period as f64;

        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
        result[i] = Some(rsi.clamp(0.0, 100.0));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn first_value_on_bar_after_lookback() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i % 3) as f64).collect();
        let result = compute_rsi(&closes, 14);
        assert!(result[..14].iter().all(Option::is_none));
        assert!(result[14].is_some());
    }

    #[test]
    fn all_gains_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = compute_rsi(&closes, 14);
        for v in result.iter().skip(14) {
            assert_eq!(*v, Some(100.0));
        }
    }

    #[test]
    fn flat_window_is_100() {
        let result = compute_rsi(&[42.0; 16], 14);
        assert_eq!(result[15], Some(100.0));
    }

    #[test]
    fn all_losses_is_zero() {
        let closes: Vec<f64> = (0..16).map(|i| 100.0 - i as f64).collect();
        let result = compute_rsi(&closes, 14);
        assert_approx(result[14].unwrap(), 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn balanced_changes_are_50() {
        // Alternating +1 / -1: avg_gain == avg_loss.
        let closes: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let result = compute_rsi(&closes, 14);
        assert_approx(result[14].unwrap(), 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn void_close_blanks_dependent_rows() {
        let mut bars = make_bars(&(0..20).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        bars[16].close = f64::NAN;
        let result = Rsi::new(14).compute(&bars);
        assert!(result[15].is_some());
        assert!(result[16..].iter().all(Option::is_none));
    }
}
