//! Content digests for bar inputs and indicator outputs.
//!
//! Digests hash the exact bit patterns of every value, so two runs agree only
//! when their outputs are bit-identical. Absent values hash to a distinct tag
//! so `None` never collides with any float.

use crate::domain::{Bar, IndicatorRow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex-encoded BLAKE3 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(pub String);

impl Digest {
    fn from_hasher(hasher: blake3::Hasher) -> Self {
        Self(hasher.finalize().to_hex().to_string())
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn write_opt(hasher: &mut blake3::Hasher, value: Option<f64>) {
    match value {
        Some(v) => {
            hasher.update(&[1]);
            hasher.update(&v.to_bits().to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

fn write_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

/// Digest of indicator rows in the given order.
pub fn rows_digest(rows: &[IndicatorRow]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    for row in rows {
        write_str(&mut hasher, &row.ticker);
        write_str(&mut hasher, &row.date.to_string());
        for value in row.values() {
            write_opt(&mut hasher, value);
        }
        write_str(&mut hasher, &row.derived_from);
    }
    Digest::from_hasher(hasher)
}

/// Digest of a bar series in the given order.
pub fn bars_digest(bars: &[Bar]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        write_str(&mut hasher, &bar.ticker);
        write_str(&mut hasher, &bar.date.to_string());
        for v in [bar.open, bar.high, bar.low, bar.close] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
        hasher.update(&bar.volume.to_le_bytes());
        write_str(&mut hasher, &bar.source);
    }
    Digest::from_hasher(hasher)
}
