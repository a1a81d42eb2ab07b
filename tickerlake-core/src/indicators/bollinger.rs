//! Bollinger Bands: SMA +/- k sample standard deviations of the close.
//!
//! - Middle: SMA(close, period)
//! - Upper: middle + mult * stddev
//! - Lower: middle - mult * stddev
//!
//! stddev divides by N - 1. With period 1 the deviation is undefined, so
//! only the middle band has values.
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{label}_{period}_{multiplier}"),
        }
    }

    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Upper)
    }

    pub fn middle(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Middle)
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Lower)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let bands = bollinger_bands(&closes, self.period, self.multiplier);
        bands
            .into_iter()
            .map(|b| {
                b.and_then(|(upper, middle, lower)| match self.band {
                    BollingerBand::Upper => upper,
                    BollingerBand::Middle => Some(middle),
                    BollingerBand::Lower => lower,
                })
            })
            .collect()
    }
}

/// Per row: (upper, middle, lower). Upper and lower are `None` when the
/// sample deviation is undefined.
pub fn bollinger_bands(
    closes: &[f64],
    period: usize,
    multiplier: f64,
) -> Vec<Option<(Option<f64>, f64, Option<f64>)>> {
    let n = closes.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &closes[(i + 1 - period)..=i];
        if !window.iter().all(|c| c.is_finite()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / period as f64;
        if period < 2 {
            result[i] = Some((None, mean, None));
            continue;
        }
        let variance = window
            .iter()
            .map(|c| {
                let diff = c - mean;
                diff * diff
            })
            .sum::<f64>()
            / (period - 1) as f64;
        let stddev = variance.sqrt();
        result[i] = Some((
            Some(mean + multiplier * stddev),
            mean,
            Some(mean - multiplier * stddev),
        ));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn middle_is_sma() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let result = Bollinger::middle(3, 2.0).compute(&bars);
        assert!(result[0].is_none());
        assert!(result[1].is_none());
        assert_approx(result[2].unwrap(), 11.0, DEFAULT_EPSILON);
        assert_approx(result[3].unwrap(), 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bands_use_sample_deviation() {
        // Window [10, 11, 12]: mean 11, sample variance (1+0+1)/2 = 1.
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let upper = Bollinger::upper(3, 2.0).compute(&bars);
        let lower = Bollinger::lower(3, 2.0).compute(&bars);
        assert_approx(upper[2].unwrap(), 13.0, DEFAULT_EPSILON);
        assert_approx(lower[2].unwrap(), 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bands_are_symmetric() {
        let closes = [10.0, 12.0, 11.0, 15.0, 13.0, 14.0];
        for row in bollinger_bands(&closes, 4, 2.0).into_iter().flatten() {
            let (upper, middle, lower) = row;
            let (upper, lower) = (upper.unwrap(), lower.unwrap());
            assert_approx(upper - middle, middle - lower, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn constant_series_collapses_bands() {
        let bars = make_bars(&[50.0; 25]);
        let upper = Bollinger::upper(20, 2.0).compute(&bars);
        let lower = Bollinger::lower(20, 2.0).compute(&bars);
        assert_approx(upper[24].unwrap(), 50.0, DEFAULT_EPSILON);
        assert_approx(lower[24].unwrap(), 50.0, DEFAULT_EPSILON);
    }

    #[test]
    fn period_one_has_only_middle() {
        let bars = make_bars(&[10.0, 20.0]);
        assert_eq!(Bollinger::middle(1, 2.0).compute(&bars), vec![Some(10.0), Some(20.0)]);
        assert!(Bollinger::upper(1, 2.0).compute(&bars).iter().all(Option::is_none));
    }

    #[test]
    fn void_close_blanks_window() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0]);
        bars[1].close = f64::INFINITY;
        let result = Bollinger::middle(2, 2.0).compute(&bars);
        assert!(result[1].is_none());
        assert!(result[2].is_none());
        assert_approx(result[3].unwrap(), 12.5, DEFAULT_EPSILON);
    }
}
