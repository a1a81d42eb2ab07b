//! Maintenance: deduplication, legacy-table migration and cleanup.

use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use super::error::Result;
use super::migrations::{ensure_unique_indexes, table_exists, CANONICAL_TABLES, UNIQUE_KEYS};

/// A superseded table whose rows are copied forward into a canonical table.
#[derive(Debug, Clone, Copy)]
pub struct LegacyTable {
    pub name: &'static str,
    pub target: &'static str,
    /// Synthetic source tag written on the copied rows.
    pub source: &'static str,
    copy_sql: &'static str,
}

/// Bar dates are cut to the day and quote timestamps take the space-separated
/// form, so copied keys match the text the store binds on later upserts.
pub const LEGACY_TABLES: [LegacyTable; 5] = [
    LegacyTable {
        name: "alphavantage_daily",
        target: "stock_daily_data",
        source: "alphavantage",
        copy_sql: "INSERT OR IGNORE INTO stock_daily_data (ticker, date, open, high, low, close, volume, source)
                   SELECT UPPER(TRIM(ticker)), substr(TRIM(date), 1, 10), open, high, low, close, volume, 'alphavantage'
                   FROM alphavantage_daily",
    },
    LegacyTable {
        name: "polygon_data",
        target: "stock_daily_data",
        source: "polygon",
        copy_sql: "INSERT OR IGNORE INTO stock_daily_data (ticker, date, open, high, low, close, volume, source)
                   SELECT UPPER(TRIM(ticker)), substr(TRIM(date), 1, 10), open, high, low, close, volume, 'polygon'
                   FROM polygon_data",
    },
    LegacyTable {
        name: "finhub_quotes",
        target: "market_quotes",
        source: "finhub",
        copy_sql: "INSERT OR IGNORE INTO market_quotes
                       (ticker, current_price, change, percent_change, high, low, open, previous_close, source, timestamp)
                   SELECT UPPER(TRIM(ticker)), current_price, change, percent_change, high, low, open, previous_close,
                          'finhub', replace(TRIM(timestamp), 'T', ' ')
                   FROM finhub_quotes",
    },
    LegacyTable {
        name: "fmp_profiles",
        target: "company_profiles",
        source: "fmp",
        copy_sql: "INSERT OR IGNORE INTO company_profiles
                       (ticker, company_name, industry, sector, market_cap, employees, description, ceo, website,
                        exchange, ipo_date, source)
                   SELECT UPPER(TRIM(ticker)), company_name, industry, sector, market_cap, employees, description,
                          ceo, website, exchange, ipo_date, 'fmp'
                   FROM fmp_profiles",
    },
    LegacyTable {
        name: "ticker_info",
        target: "company_profiles",
        source: "manual",
        copy_sql: "INSERT OR IGNORE INTO company_profiles
                       (ticker, sector, subsector, country, founded, years_public, type, description, source)
                   SELECT UPPER(TRIM(symbol)), sector, subsector, pais, fundacion, anos_en_bolsa, tipo, resena,
                          'manual'
                   FROM ticker_info",
    },
];

/// Rows removed per table by [`deduplicate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub removed: Vec<(&'static str, usize)>,
}

impl DedupReport {
    pub fn total(&self) -> usize {
        self.removed.iter().map(|(_, n)| n).sum()
    }
}

/// Outcome of copying one legacy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LegacyCopy {
    Copied { rows: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegacyMigrationReport {
    /// Only legacy tables that were present appear here.
    pub tables: Vec<(&'static str, LegacyCopy)>,
}

impl LegacyMigrationReport {
    pub fn copied(&self) -> usize {
        self.tables
            .iter()
            .map(|(_, c)| match c {
                LegacyCopy::Copied { rows } => *rows,
                LegacyCopy::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.tables
            .iter()
            .filter(|(_, c)| matches!(c, LegacyCopy::Failed { .. }))
            .count()
    }
}

/// Key columns holding a calendar day that older writers stored with a
/// time suffix.
const DAY_KEYS: [(&str, &str); 1] = [("stock_daily_data", "date")];

fn is_day_key(table: &str, column: &str) -> bool {
    DAY_KEYS.contains(&(table, column))
}

/// Keep the lowest-id row of every key group, then create the unique indexes.
///
/// Day keys group on their first ten characters, so `2024-01-02` and
/// `2024-01-02 00:00:00` are one group; survivors are rewritten to the bare
/// day. Runs inside the caller's transaction. Idempotent: once the indexes
/// exist no key group can hold more than one row.
pub(crate) fn deduplicate(conn: &Connection) -> Result<DedupReport> {
    let mut report = DedupReport::default();
    for key in UNIQUE_KEYS {
        if !table_exists(conn, key.table)? {
            continue;
        }
        let group = key
            .columns
            .iter()
            .map(|col| {
                if is_day_key(key.table, col) {
                    format!("substr(TRIM({col}), 1, 10)")
                } else {
                    col.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        let removed = conn.execute(
            &format!(
                "DELETE FROM {table} WHERE id NOT IN (SELECT MIN(id) FROM {table} GROUP BY {group})",
                table = key.table
            ),
            [],
        )?;
        if removed > 0 {
            info!(table = key.table, removed, "removed duplicate rows");
        }
        for col in key.columns.iter().filter(|col| is_day_key(key.table, col)) {
            let trimmed = conn.execute(
                &format!(
                    "UPDATE {table} SET {col} = substr(TRIM({col}), 1, 10) WHERE {col} <> substr(TRIM({col}), 1, 10)",
                    table = key.table
                ),
                [],
            )?;
            if trimmed > 0 {
                info!(table = key.table, column = *col, rows = trimmed, "trimmed time suffix from day keys");
            }
        }
        report.removed.push((key.table, removed));
        conn.execute(&key.create_sql(), [])?;
    }
    Ok(report)
}

/// Copy every present legacy table into its canonical table with
/// insert-if-absent semantics. Legacy tables are left in place.
///
/// Each table is copied independently; one failing copy is reported and
/// does not stop the others.
pub(crate) fn migrate_legacy(conn: &Connection) -> Result<LegacyMigrationReport> {
    let unindexed = ensure_unique_indexes(conn);
    let mut report = LegacyMigrationReport::default();

    for legacy in LEGACY_TABLES {
        if !table_exists(conn, legacy.name)? {
            continue;
        }
        let outcome = if unindexed.contains(&legacy.target) {
            LegacyCopy::Failed {
                reason: format!("{} holds duplicates; run dedupe first", legacy.target),
            }
        } else {
            match conn.execute(legacy.copy_sql, []) {
                Ok(rows) => {
                    info!(from = legacy.name, to = legacy.target, source = legacy.source, rows, "migrated legacy table");
                    LegacyCopy::Copied { rows }
                }
                Err(e) => {
                    warn!(from = legacy.name, error = %e, "legacy migration failed");
                    LegacyCopy::Failed { reason: e.to_string() }
                }
            }
        };
        report.tables.push((legacy.name, outcome));
    }
    Ok(report)
}

/// The explicit cleanup step: drop every legacy table that exists.
pub(crate) fn drop_legacy_tables(conn: &Connection) -> Result<Vec<&'static str>> {
    let mut dropped = Vec::new();
    for legacy in LEGACY_TABLES {
        if table_exists(conn, legacy.name)? {
            conn.execute(&format!("DROP TABLE IF EXISTS {}", legacy.name), [])?;
            info!(table = legacy.name, "dropped legacy table");
            dropped.push(legacy.name);
        }
    }
    Ok(dropped)
}

/// Row counts for canonical tables and any legacy tables still present.
pub(crate) fn table_counts(conn: &Connection) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::new();
    let legacy = LEGACY_TABLES.iter().map(|t| t.name);
    for table in CANONICAL_TABLES.into_iter().chain(legacy) {
        if !table_exists(conn, table)? {
            continue;
        }
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        counts.push((table, n));
    }
    Ok(counts)
}
