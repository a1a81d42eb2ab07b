//! Property tests for indicator invariants.
//!
//! Uses proptest to verify:
//! 1. SMA absence: absent exactly when fewer than n bars exist, else the mean
//! 2. RSI bounds: always in [0, 100], and 100 when no change is negative
//! 3. Idempotence: recomputing yields bit-identical rows, stored or not
//! 4. No look-ahead: truncating the series never changes earlier rows

use chrono::NaiveDate;
use proptest::prelude::*;
use tickerlake_core::domain::{Bar, DateWindow, SourceChain};
use tickerlake_core::fingerprint::rows_digest;
use tickerlake_core::indicators::rsi::compute_rsi;
use tickerlake_core::indicators::sma::sma_of_series;
use tickerlake_core::indicators::{compute_indicator_rows, IndicatorEngine};
use tickerlake_core::store::Store;

fn bars_from_closes(ticker: &str, source: &str, closes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            ticker: ticker.into(),
            date: base + chrono::Duration::days(i as i64),
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 10_000,
            source: source.into(),
        })
        .collect()
}

fn whole_range() -> DateWindow {
    DateWindow::new(
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
    )
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0), 1..max_len)
}

fn arb_rising_closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0..5.0_f64, 15..60).prop_map(|steps| {
        let mut price = 50.0;
        steps
            .into_iter()
            .map(|s| {
                price += s;
                price
            })
            .collect()
    })
}

// ── 1. SMA absence ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn sma_absent_exactly_during_warmup(closes in arb_closes(80), period in 1usize..30) {
        let sma = sma_of_series(&closes, period);
        prop_assert_eq!(sma.len(), closes.len());
        for (i, value) in sma.iter().enumerate() {
            if i + 1 < period {
                prop_assert!(value.is_none());
            } else {
                let window = &closes[i + 1 - period..=i];
                let mean = window.iter().sum::<f64>() / period as f64;
                let v = value.expect("window is full");
                prop_assert!((v - mean).abs() < 1e-9);
            }
        }
    }
}

// ── 2. RSI bounds ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_is_bounded(closes in arb_closes(120)) {
        for v in compute_rsi(&closes, 14).into_iter().flatten() {
            prop_assert!((0.0..=100.0).contains(&v), "rsi out of range: {}", v);
        }
    }

    #[test]
    fn rsi_is_100_without_losses(closes in arb_rising_closes()) {
        for v in compute_rsi(&closes, 14).into_iter().flatten() {
            prop_assert_eq!(v, 100.0);
        }
    }
}

// ── 3. Idempotence ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn recompute_is_bit_identical(closes in arb_closes(260)) {
        let bars = bars_from_closes("ACME", "p1", &closes);
        let first = compute_indicator_rows("ACME", "p1", &bars);
        let second = compute_indicator_rows("ACME", "p1", &bars);
        prop_assert_eq!(rows_digest(&first), rows_digest(&second));
    }

    // ── 4. No look-ahead ─────────────────────────────────────────────

    #[test]
    fn truncation_does_not_change_earlier_rows(closes in arb_closes(120), cut in 1usize..120) {
        let bars = bars_from_closes("ACME", "p1", &closes);
        let cut = cut.min(bars.len());
        let full = compute_indicator_rows("ACME", "p1", &bars);
        let truncated = compute_indicator_rows("ACME", "p1", &bars[..cut]);
        prop_assert_eq!(rows_digest(&full[..cut]), rows_digest(&truncated));
    }
}

#[test]
fn stored_rows_survive_a_second_run_unchanged() {
    let store = Store::open_in_memory().unwrap();
    let closes: Vec<f64> = (0..240).map(|i| 100.0 + (i as f64 * 0.21).cos() * 7.5).collect();
    store.upsert_bars("ACME", &bars_from_closes("ACME", "p1", &closes)).unwrap();

    let engine = IndicatorEngine::new(SourceChain::new(["p1"]), 500);
    let first_run = engine.recompute(&store, "ACME", whole_range()).unwrap().unwrap();
    let first = store.indicator_rows("ACME", whole_range()).unwrap();
    let second_run = engine.recompute(&store, "ACME", whole_range()).unwrap().unwrap();
    let second = store.indicator_rows("ACME", whole_range()).unwrap();

    assert_eq!(first_run.output_digest, second_run.output_digest);
    assert_eq!(rows_digest(&first), rows_digest(&second));
    assert_eq!(rows_digest(&first), first_run.output_digest);
}

// ── Scenario ─────────────────────────────────────────────────────────

#[test]
fn acme_sma20_scenario() {
    let store = Store::open_in_memory().unwrap();
    let closes: Vec<f64> = (0..25).map(|i| 10.0 + i as f64).collect();
    store.replace_bars("ACME", "p1", &bars_from_closes("ACME", "p1", &closes)).unwrap();

    let engine = IndicatorEngine::new(SourceChain::new(["p1"]), 500);
    let run = engine.recompute(&store, "ACME", whole_range()).unwrap().unwrap();
    assert_eq!(run.rows_written, 25);

    let rows = store.indicator_rows("ACME", whole_range()).unwrap();
    assert_eq!(rows.len(), 25);
    assert!(rows[..19].iter().all(|r| r.sma_20.is_none()));
    let first_twenty_mean = closes[..20].iter().sum::<f64>() / 20.0;
    assert!((rows[19].sma_20.unwrap() - first_twenty_mean).abs() < 1e-12);
    assert!(rows.iter().all(|r| r.derived_from == "p1"));
}
