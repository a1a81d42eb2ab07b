//! TickerLake Core: canonical records, provider normalization, the conflation
//! store, technical indicators and trailing returns.
//!
//! - Domain types (bars, quotes, profiles, news, fundamentals, indicator rows)
//! - Record Normalizer turning provider payloads into canonical records
//! - SQLite conflation store with source-tagged upserts and legacy migration
//! - Indicator Engine computing one indicator row per (ticker, date)
//! - Returns Calculator with per-window source fallback

pub mod data;
pub mod domain;
pub mod fingerprint;
pub mod indicators;
pub mod returns;
pub mod store;
