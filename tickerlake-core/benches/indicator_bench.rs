//! Criterion benchmarks for the indicator hot paths.
//!
//! Benchmarks:
//! 1. Full indicator row computation over growing series
//! 2. Individual indicators (SMA200, RSI14, ATR14) over one long series
//! 3. Row digest

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tickerlake_core::domain::Bar;
use tickerlake_core::fingerprint::rows_digest;
use tickerlake_core::indicators::{compute_indicator_rows, Atr, Indicator, Rsi, Sma};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Bar {
                ticker: "BENCH".into(),
                date: base_date + chrono::Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000 + (i as i64 % 500_000),
                source: "bench".into(),
            }
        })
        .collect()
}

// ── 1. Full rows ─────────────────────────────────────────────────────

fn bench_indicator_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_rows");
    for n in [250usize, 500, 2_500] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| compute_indicator_rows("BENCH", "bench", black_box(bars)))
        });
    }
    group.finish();
}

// ── 2. Single indicators ─────────────────────────────────────────────

fn bench_single_indicators(c: &mut Criterion) {
    let bars = make_bars(2_500);
    let indicators: Vec<Box<dyn Indicator>> =
        vec![Box::new(Sma::new(200)), Box::new(Rsi::new(14)), Box::new(Atr::new(14))];

    let mut group = c.benchmark_group("single_indicator");
    for indicator in &indicators {
        group.bench_function(indicator.name(), |b| b.iter(|| indicator.compute(black_box(&bars))));
    }
    group.finish();
}

// ── 3. Digest ────────────────────────────────────────────────────────

fn bench_digest(c: &mut Criterion) {
    let rows = compute_indicator_rows("BENCH", "bench", &make_bars(2_500));
    c.bench_function("rows_digest_2500", |b| b.iter(|| rows_digest(black_box(&rows))));
}

criterion_group!(benches, bench_indicator_rows, bench_single_indicators, bench_digest);
criterion_main!(benches);
