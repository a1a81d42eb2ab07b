//! MACD: difference of two EMAs, its signal line and histogram.
//!
//! - Line: EMA(close, fast) - EMA(close, slow)
//! - Signal: EMA(line, signal)
//! - Histogram: line - signal
//!
//! All three EMAs are seeded from their first observation, so with finite
//! closes every row has a value. Lookback: 0.

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Bar;

/// Which MACD series to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdLine {
    Line,
    Signal,
    Histogram,
}

/// The three MACD series computed together.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

pub fn macd_series(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = ema_of_series(closes, fast);
    let slow_ema = ema_of_series(closes, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let as_f64: Vec<f64> = line.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
    let signal_line = ema_of_series(&as_f64, signal);

    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| Some((*l)? - (*s)?))
        .collect();

    MacdSeries {
        line,
        signal: signal_line,
        histogram,
    }
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    output: MacdLine,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, output: MacdLine) -> Self {
        assert!(fast >= 1 && slow >= 1 && signal >= 1, "MACD periods must be >= 1");
        let suffix = match output {
            MacdLine::Line => "",
            MacdLine::Signal => "_signal",
            MacdLine::Histogram => "_histogram",
        };
        Self {
            fast,
            slow,
            signal,
            output,
            name: format!("macd{suffix}_{fast}_{slow}_{signal}"),
        }
    }

    /// The conventional 12/26/9 configuration.
    pub fn standard(output: MacdLine) -> Self {
        Self::new(12, 26, 9, output)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let series = macd_series(&closes, self.fast, self.slow, self.signal);
        match self.output {
            MacdLine::Line => series.line,
            MacdLine::Signal => series.signal,
            MacdLine::Histogram => series.histogram,
        }
    }
}
