//! TickerLake Runner: per-ticker ingestion pipeline and batch jobs.
//!
//! This crate builds on `tickerlake-core` to provide:
//! - TOML pipeline configuration
//! - Payload sources (JSON directory, in-memory, ticker-universe profiles)
//! - The sequential ingestion pipeline with cooperative cancellation
//! - Batch indicator recompute, optionally on the rayon pool

pub mod batch;
pub mod config;
pub mod payloads;
pub mod pipeline;
pub mod progress;

pub use batch::{BatchRecompute, RecomputeSummary, TickerRecompute};
pub use config::{ConfigError, IndicatorConfig, IngestConfig, PipelineConfig, StoreConfig};
pub use payloads::{JsonDirSource, MemorySource, PayloadSource, UniverseSource};
pub use pipeline::{
    BatchSummary, EntityOutcome, IndicatorOutcome, Pipeline, PipelineError, TickerReport,
};
pub use progress::{LogProgress, NoProgress, PipelineProgress};
