//! Schema migrations and uniqueness keys.
//!
//! Canonical tables are created without inline `UNIQUE` constraints. Keys are
//! named unique indexes created afterwards, so a database written before the
//! keys existed still opens; its duplicates are reported and removed by
//! `deduplicate()`, which then creates the missing indexes.

use rusqlite::Connection;
use tracing::{info, warn};

use super::error::Result;

/// A uniqueness key on a canonical table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UniqueKey {
    pub table: &'static str,
    pub index: &'static str,
    pub columns: &'static [&'static str],
}

impl UniqueKey {
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            self.index,
            self.table,
            self.columns.join(", ")
        )
    }
}

pub(crate) const UNIQUE_KEYS: [UniqueKey; 6] = [
    UniqueKey {
        table: "stock_daily_data",
        index: "ux_stock_daily_data_key",
        columns: &["ticker", "date", "source"],
    },
    UniqueKey {
        table: "market_quotes",
        index: "ux_market_quotes_key",
        columns: &["ticker", "timestamp", "source"],
    },
    UniqueKey {
        table: "company_profiles",
        index: "ux_company_profiles_key",
        columns: &["ticker", "source"],
    },
    UniqueKey {
        table: "news_articles",
        index: "ux_news_articles_url",
        columns: &["url"],
    },
    UniqueKey {
        table: "fundamental_data",
        index: "ux_fundamental_data_key",
        columns: &["ticker", "period", "period_end_date"],
    },
    UniqueKey {
        table: "technical_indicators",
        index: "ux_technical_indicators_key",
        columns: &["ticker", "date"],
    },
];

/// Canonical tables in key order.
pub const CANONICAL_TABLES: [&str; 6] = [
    "stock_daily_data",
    "market_quotes",
    "company_profiles",
    "news_articles",
    "fundamental_data",
    "technical_indicators",
];

/// Run all schema migrations, then try to create every unique index.
///
/// Returns the tables whose unique index could not be created.
pub fn run_migrations(conn: &Connection) -> Result<Vec<&'static str>> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_stock_daily_data", CREATE_STOCK_DAILY_DATA)?;
    run_migration(conn, "002_market_quotes", CREATE_MARKET_QUOTES)?;
    run_migration(conn, "003_company_profiles", CREATE_COMPANY_PROFILES)?;
    run_migration(conn, "004_news_articles", CREATE_NEWS_ARTICLES)?;
    run_migration(conn, "005_fundamental_data", CREATE_FUNDAMENTAL_DATA)?;
    run_migration(conn, "006_technical_indicators", CREATE_TECHNICAL_INDICATORS)?;
    run_migration(conn, "007_lookup_indexes", CREATE_LOOKUP_INDEXES)?;

    // Tables that predate these migrations may lack newer columns.
    add_column_if_missing(conn, "company_profiles", "subsector", "TEXT")?;
    add_column_if_missing(conn, "technical_indicators", "derived_from", "TEXT")?;

    let failed = ensure_unique_indexes(conn);
    info!("database migrations completed");
    Ok(failed)
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        info!(migration = name, "running migration");
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO schema_migrations (name) VALUES (?1)", [name])?;
    }

    Ok(())
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [table],
        |row| row.get(0),
    )?)
}

fn add_column_if_missing(conn: &Connection, table: &str, column: &str, decl: &str) -> Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<_>>()?;
    if !columns.iter().any(|c| c == column) {
        info!(table, column, "adding column");
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"), [])?;
    }
    Ok(())
}

/// Create every unique index that does not exist yet. Tables holding
/// duplicates keep working for reads; their upserts fail until deduplicated.
pub(crate) fn ensure_unique_indexes(conn: &Connection) -> Vec<&'static str> {
    let mut failed = Vec::new();
    for key in UNIQUE_KEYS {
        if let Err(e) = conn.execute(&key.create_sql(), []) {
            warn!(table = key.table, index = key.index, error = %e, "unique index not created; run dedupe");
            failed.push(key.table);
        }
    }
    failed
}

const CREATE_STOCK_DAILY_DATA: &str = r#"
CREATE TABLE IF NOT EXISTS stock_daily_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL,
    date TEXT NOT NULL,
    open REAL,
    high REAL,
    low REAL,
    close REAL,
    volume INTEGER,
    source TEXT NOT NULL,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

const CREATE_MARKET_QUOTES: &str = r#"
CREATE TABLE IF NOT EXISTS market_quotes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL,
    current_price REAL,
    change REAL,
    percent_change REAL,
    high REAL,
    low REAL,
    open REAL,
    previous_close REAL,
    source TEXT NOT NULL,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

const CREATE_COMPANY_PROFILES: &str = r#"
CREATE TABLE IF NOT EXISTS company_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL,
    company_name TEXT,
    industry TEXT,
    sector TEXT,
    subsector TEXT,
    market_cap REAL,
    employees INTEGER,
    description TEXT,
    ceo TEXT,
    website TEXT,
    exchange TEXT,
    ipo_date TEXT,
    country TEXT,
    founded TEXT,
    years_public TEXT,
    type TEXT,
    source TEXT NOT NULL,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

const CREATE_NEWS_ARTICLES: &str = r#"
CREATE TABLE IF NOT EXISTS news_articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL,
    title TEXT,
    source TEXT,
    url TEXT,
    published_at TEXT,
    content TEXT,
    sentiment REAL,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

const CREATE_FUNDAMENTAL_DATA: &str = r#"
CREATE TABLE IF NOT EXISTS fundamental_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL,
    period TEXT NOT NULL,
    period_end_date TEXT NOT NULL,
    revenue REAL,
    net_income REAL,
    eps REAL,
    pe_ratio REAL,
    pb_ratio REAL,
    dividend_yield REAL,
    debt_to_equity REAL,
    roa REAL,
    roe REAL,
    gross_margin REAL,
    operating_margin REAL,
    net_margin REAL,
    free_cash_flow REAL,
    data_source TEXT,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

const CREATE_TECHNICAL_INDICATORS: &str = r#"
CREATE TABLE IF NOT EXISTS technical_indicators (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL,
    date TEXT NOT NULL,
    sma_20 REAL,
    sma_50 REAL,
    sma_200 REAL,
    ema_12 REAL,
    ema_26 REAL,
    macd REAL,
    macd_signal REAL,
    macd_histogram REAL,
    rsi_14 REAL,
    bollinger_upper REAL,
    bollinger_middle REAL,
    bollinger_lower REAL,
    atr_14 REAL,
    derived_from TEXT,
    timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

const CREATE_LOOKUP_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS ix_stock_daily_data_series ON stock_daily_data (ticker, source, date);
CREATE INDEX IF NOT EXISTS ix_market_quotes_ticker ON market_quotes (ticker, timestamp);
CREATE INDEX IF NOT EXISTS ix_news_articles_ticker ON news_articles (ticker, published_at);
"#;
