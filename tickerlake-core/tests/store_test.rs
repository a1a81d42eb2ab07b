//! Conflation store integration tests.
//!
//! Covers:
//! 1. Key uniqueness under arbitrary upsert sequences
//! 2. News insert-if-absent
//! 3. Legacy table migration and explicit cleanup
//! 4. Deduplication of pre-constraint databases, and its idempotence
//! 5. Fundamentals merge across endpoints

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use rusqlite::{params, Connection};
use tickerlake_core::domain::{Bar, FundamentalPeriod, NewsItem, Quote};
use tickerlake_core::store::{LegacyCopy, SourceSelector, Store, StoreError};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn bar(d: u32, close: f64, source: &str) -> Bar {
    Bar {
        ticker: "ACME".into(),
        date: day(d),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1_000,
        source: source.into(),
    }
}

fn news(url: &str, content: &str) -> NewsItem {
    NewsItem {
        ticker: "ACME".into(),
        title: "ACME ships".into(),
        source_name: "Wire".into(),
        url: url.into(),
        published_at: "2024-01-02T10:00:00Z".into(),
        content: content.into(),
    }
}

// ── 1. Uniqueness ────────────────────────────────────────────────────

proptest! {
    /// After any sequence of upserts, (ticker, date, source) is unique and
    /// the last write for a key wins.
    #[test]
    fn bar_keys_stay_unique(
        writes in prop::collection::vec((1u32..6, 0usize..3, 1.0..100.0_f64), 1..40)
    ) {
        let store = Store::open_in_memory().unwrap();
        let sources = ["p1", "p2", "p3"];
        let mut expected = std::collections::BTreeMap::new();
        for (d, s, close) in &writes {
            store.upsert_bars("acme", &[bar(*d, *close, sources[*s])]).unwrap();
            expected.insert((day(*d), sources[*s].to_string()), *close);
        }

        let stored = store.latest_bars("ACME", &SourceSelector::Any, 1_000).unwrap();
        prop_assert_eq!(stored.len(), expected.len());
        for b in &stored {
            prop_assert_eq!(expected.get(&(b.date, b.source.clone())), Some(&b.close));
        }
    }
}

#[test]
fn same_date_from_two_sources_is_kept_twice() {
    let store = Store::open_in_memory().unwrap();
    store.upsert_bars("ACME", &[bar(2, 10.0, "p1"), bar(2, 10.5, "p2")]).unwrap();
    let all = store.latest_bars("ACME", &SourceSelector::Any, 10).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(store.bar_sources("ACME").unwrap(), vec!["p1".to_string(), "p2".to_string()]);
}

// ── 2. News ──────────────────────────────────────────────────────────

#[test]
fn second_insert_of_same_url_is_a_no_op() {
    let store = Store::open_in_memory().unwrap();
    assert_eq!(store.upsert_news(&[news("http://x/1", "original")]).unwrap(), 1);
    assert_eq!(store.upsert_news(&[news("http://x/1", "rewritten")]).unwrap(), 0);

    let items = store.recent_news("ACME", 10).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].content, "original");
}

#[test]
fn url_is_global_across_tickers() {
    let store = Store::open_in_memory().unwrap();
    store.upsert_news(&[news("http://x/1", "original")]).unwrap();
    let mut other = news("http://x/1", "other ticker");
    other.ticker = "OTHER".into();
    assert_eq!(store.upsert_news(&[other]).unwrap(), 0);
    assert!(store.recent_news("OTHER", 10).unwrap().is_empty());
}

// ── 3. Legacy migration ──────────────────────────────────────────────

fn legacy_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE alphavantage_daily (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT, date TEXT, open REAL, high REAL, low REAL, close REAL, volume INTEGER
        );
        CREATE TABLE ticker_info (
            symbol TEXT, sector TEXT, subsector TEXT, pais TEXT, fundacion TEXT,
            anos_en_bolsa TEXT, tipo TEXT, resena TEXT
        );",
    )
    .unwrap();
    conn.execute(
        "INSERT INTO alphavantage_daily (ticker, date, open, high, low, close, volume)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params!["aapl ", "2024-01-02", 187.15, 188.44, 183.89, 185.64, 82_488_700_i64],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO ticker_info (symbol, sector, subsector, pais, fundacion, anos_en_bolsa, tipo, resena)
         VALUES ('AAPL', 'Technology', 'Hardware', 'USA', '1976', '44', 'Stock', 'Designs phones and computers')",
        [],
    )
    .unwrap();
    conn
}

#[test]
fn alphavantage_daily_migrates_with_source_tag() {
    let store = Store::from_connection(legacy_connection()).unwrap();
    let report = store.migrate_legacy().unwrap();
    assert_eq!(report.failures(), 0);
    assert!(report
        .tables
        .iter()
        .any(|(name, outcome)| *name == "alphavantage_daily" && *outcome == LegacyCopy::Copied { rows: 1 }));

    let bars = store
        .latest_bars("AAPL", &SourceSelector::Only("alphavantage".into()), 10)
        .unwrap();
    assert_eq!(bars.len(), 1);
    let b = &bars[0];
    assert_eq!(b.ticker, "AAPL");
    assert_eq!(b.date, day(2));
    assert_eq!((b.open, b.high, b.low, b.close), (187.15, 188.44, 183.89, 185.64));
    assert_eq!(b.volume, 82_488_700);

    let profile = store.latest_profile("AAPL").unwrap().unwrap();
    assert_eq!(profile.source, "manual");
    assert_eq!(profile.country, "USA");
    assert_eq!(profile.profile_type, "Stock");
    assert_eq!(profile.subsector, "Hardware");
    assert_eq!(profile.founded, "1976");
    assert_eq!(profile.years_public, "44");
    assert_eq!(profile.description, "Designs phones and computers");

    // Legacy tables survive until the explicit cleanup step.
    let counts = store.table_counts().unwrap();
    assert!(counts.iter().any(|(t, n)| *t == "alphavantage_daily" && *n == 1));
}

#[test]
fn migration_is_repeatable_and_cleanup_is_explicit() {
    let store = Store::from_connection(legacy_connection()).unwrap();
    store.migrate_legacy().unwrap();
    let again = store.migrate_legacy().unwrap();
    assert_eq!(again.copied(), 0);

    let dropped = store.drop_legacy_tables().unwrap();
    assert_eq!(dropped, vec!["alphavantage_daily", "ticker_info"]);
    assert!(store.drop_legacy_tables().unwrap().is_empty());
    assert!(store.migrate_legacy().unwrap().tables.is_empty());

    // Migrated rows stay.
    assert_eq!(store.latest_bars("AAPL", &SourceSelector::Any, 10).unwrap().len(), 1);
}

/// Legacy per-provider tables other than Alpha Vantage, as older writers
/// left them: ISO timestamps and time-suffixed bar dates.
fn provider_legacy_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE polygon_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT, date TEXT, open REAL, high REAL, low REAL, close REAL, volume INTEGER
        );
        CREATE TABLE finhub_quotes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT, current_price REAL, change REAL, percent_change REAL,
            high REAL, low REAL, open REAL, previous_close REAL, timestamp TEXT
        );
        CREATE TABLE fmp_profiles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT, company_name TEXT, industry TEXT, sector TEXT, market_cap REAL,
            employees INTEGER, description TEXT, ceo TEXT, website TEXT, exchange TEXT, ipo_date TEXT
        );
        INSERT INTO polygon_data (ticker, date, open, high, low, close, volume) VALUES
            ('msft', '2024-01-03 00:00:00', 370.0, 373.5, 368.2, 371.1, 23000000),
            ('msft', '2024-01-04', 371.0, 374.0, 369.0, 372.9, 21000000);
        INSERT INTO finhub_quotes
            (ticker, current_price, change, percent_change, high, low, open, previous_close, timestamp)
        VALUES ('MSFT', 372.9, 1.8, 0.485, 374.0, 369.0, 371.0, 371.1, '2024-01-05T14:30:00');
        INSERT INTO fmp_profiles
            (ticker, company_name, industry, sector, market_cap, employees, description, ceo, website, exchange, ipo_date)
        VALUES ('MSFT', 'Microsoft Corporation', 'Software', 'Technology', 2.8e12, 221000,
                'Develops software', 'Satya Nadella', 'https://www.microsoft.com', 'NASDAQ', '1986-03-13');",
    )
    .unwrap();
    conn
}

fn quoted_at() -> NaiveDateTime {
    day(5).and_hms_opt(14, 30, 0).unwrap()
}

fn count(store: &Store, table: &str) -> i64 {
    store
        .table_counts()
        .unwrap()
        .into_iter()
        .find(|(t, _)| *t == table)
        .map(|(_, n)| n)
        .unwrap()
}

#[test]
fn provider_tables_migrate_every_field_with_source_tags() {
    let store = Store::from_connection(provider_legacy_connection()).unwrap();
    let report = store.migrate_legacy().unwrap();
    assert_eq!(report.failures(), 0);
    assert_eq!(
        report.tables,
        vec![
            ("polygon_data", LegacyCopy::Copied { rows: 2 }),
            ("finhub_quotes", LegacyCopy::Copied { rows: 1 }),
            ("fmp_profiles", LegacyCopy::Copied { rows: 1 }),
        ]
    );

    let bars = store
        .latest_bars("MSFT", &SourceSelector::Only("polygon".into()), 10)
        .unwrap();
    assert_eq!(bars.len(), 2);
    assert!(bars.iter().all(|b| b.source == "polygon" && b.ticker == "MSFT"));
    let first = bars.iter().find(|b| b.date == day(3)).unwrap();
    assert_eq!((first.open, first.high, first.low, first.close), (370.0, 373.5, 368.2, 371.1));
    assert_eq!(first.volume, 23_000_000);

    let quote = store.latest_quote("MSFT").unwrap().unwrap();
    assert_eq!(quote.source, "finhub");
    assert_eq!(quote.quoted_at, quoted_at());
    assert_eq!((quote.current, quote.change, quote.percent_change), (372.9, 1.8, 0.485));
    assert_eq!((quote.high, quote.low, quote.open, quote.previous_close), (374.0, 369.0, 371.0, 371.1));

    let profile = store.latest_profile("MSFT").unwrap().unwrap();
    assert_eq!(profile.source, "fmp");
    assert_eq!(profile.company_name, "Microsoft Corporation");
    assert_eq!(profile.industry, "Software");
    assert_eq!(profile.sector, "Technology");
    assert_eq!(profile.market_cap, 2.8e12);
    assert_eq!(profile.employees, 221_000);
    assert_eq!(profile.description, "Develops software");
    assert_eq!(profile.ceo, "Satya Nadella");
    assert_eq!(profile.website, "https://www.microsoft.com");
    assert_eq!(profile.exchange, "NASDAQ");
    assert_eq!(profile.ipo_date, "1986-03-13");

    let dropped = store.drop_legacy_tables().unwrap();
    assert_eq!(dropped, vec!["polygon_data", "finhub_quotes", "fmp_profiles"]);
}

#[test]
fn migrated_keys_collide_with_later_upserts() {
    let store = Store::from_connection(provider_legacy_connection()).unwrap();
    store.migrate_legacy().unwrap();

    // Same day as the time-suffixed legacy row: replaces it, no second row.
    let mut fresh = bar(3, 380.0, "polygon");
    fresh.ticker = "MSFT".into();
    store.upsert_bars("MSFT", &[fresh]).unwrap();
    let bars = store
        .latest_bars("MSFT", &SourceSelector::Only("polygon".into()), 10)
        .unwrap();
    assert_eq!(bars.len(), 2);
    assert_eq!(bars.iter().find(|b| b.date == day(3)).unwrap().close, 380.0);

    let quote = Quote {
        ticker: "MSFT".into(),
        quoted_at: quoted_at(),
        current: 373.4,
        change: 2.3,
        percent_change: 0.62,
        high: 374.0,
        low: 369.0,
        open: 371.0,
        previous_close: 371.1,
        source: "finhub".into(),
    };
    store.upsert_quotes(&[quote]).unwrap();
    assert_eq!(count(&store, "market_quotes"), 1);
    assert_eq!(store.latest_quote("MSFT").unwrap().unwrap().current, 373.4);
}

// ── 4. Deduplication ─────────────────────────────────────────────────

/// A database written before uniqueness keys existed.
fn unconstrained_connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE stock_daily_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker TEXT NOT NULL, date TEXT NOT NULL,
            open REAL, high REAL, low REAL, close REAL, volume INTEGER,
            source TEXT NOT NULL,
            timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        INSERT INTO stock_daily_data (ticker, date, open, high, low, close, volume, source) VALUES
            ('ACME', '2024-01-02', 1, 1, 1, 10, 5, 'p1'),
            ('ACME', '2024-01-02', 1, 1, 1, 99, 5, 'p1'),
            ('ACME', '2024-01-02', 1, 1, 1, 98, 5, 'p1'),
            ('ACME', '2024-01-03', 1, 1, 1, 11, 5, 'p1');",
    )
    .unwrap();
    conn
}

#[test]
fn duplicates_block_upserts_until_dedupe() {
    let store = Store::from_connection(unconstrained_connection()).unwrap();
    let err = store.upsert_bars("ACME", &[bar(4, 12.0, "p1")]).unwrap_err();
    assert!(matches!(err, StoreError::Conflict { table: "stock_daily_data", .. }));
    assert!(!err.is_fatal());

    let report = store.deduplicate().unwrap();
    assert_eq!(report.total(), 2);

    // The lowest-id row of the group survives.
    let bars = store.latest_bars("ACME", &SourceSelector::Only("p1".into()), 10).unwrap();
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].close, 10.0);

    store.upsert_bars("ACME", &[bar(4, 12.0, "p1")]).unwrap();
}

#[test]
fn dedupe_folds_time_suffixed_dates_into_the_day() {
    let conn = unconstrained_connection();
    conn.execute(
        "INSERT INTO stock_daily_data (ticker, date, open, high, low, close, volume, source)
         VALUES ('ACME', '2024-01-03 00:00:00', 1, 1, 1, 77, 5, 'p1'),
                ('ACME', '2024-01-05T00:00:00', 1, 1, 1, 13, 5, 'p1')",
        [],
    )
    .unwrap();
    let store = Store::from_connection(conn).unwrap();

    let report = store.deduplicate().unwrap();
    // Two extra 01-02 rows plus the suffixed 01-03 twin.
    assert_eq!(report.total(), 3);

    let bars = store.latest_bars("ACME", &SourceSelector::Only("p1".into()), 10).unwrap();
    assert_eq!(bars.len(), 3);
    assert_eq!(bars.iter().find(|b| b.date == day(3)).unwrap().close, 11.0);

    // The surviving suffixed row now carries the bare day and takes upserts.
    store.upsert_bars("ACME", &[bar(5, 14.0, "p1")]).unwrap();
    assert_eq!(count(&store, "stock_daily_data"), 3);
    assert_eq!(store.deduplicate().unwrap().total(), 0);
}

#[test]
fn dedupe_is_idempotent() {
    let store = Store::from_connection(unconstrained_connection()).unwrap();
    assert!(store.deduplicate().unwrap().total() > 0);
    assert_eq!(store.deduplicate().unwrap().total(), 0);
}

// ── 5. Fundamentals ──────────────────────────────────────────────────

#[test]
fn fundamentals_merge_across_endpoints() {
    let store = Store::open_in_memory().unwrap();
    let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    let ratios = FundamentalPeriod {
        ticker: "acme".into(),
        period: "FY".into(),
        period_end_date: end,
        pe_ratio: Some(21.5),
        roe: Some(0.3),
        data_source: "fmp".into(),
        ..FundamentalPeriod::default()
    };
    let income = FundamentalPeriod {
        ticker: "ACME".into(),
        period: "FY".into(),
        period_end_date: end,
        revenue: Some(1.0e9),
        eps: Some(4.2),
        data_source: "fmp".into(),
        ..FundamentalPeriod::default()
    };
    store.upsert_fundamentals(&[ratios]).unwrap();
    store.upsert_fundamentals(&[income]).unwrap();

    let periods = store.fundamentals("ACME", 4).unwrap();
    assert_eq!(periods.len(), 1);
    let p = &periods[0];
    assert_eq!(p.pe_ratio, Some(21.5));
    assert_eq!(p.roe, Some(0.3));
    assert_eq!(p.revenue, Some(1.0e9));
    assert_eq!(p.eps, Some(4.2));
    assert_eq!(p.net_income, None);
}
