//! Provider payloads and the Record Normalizer

pub mod lenient;
pub mod normalize;
pub mod payloads;
pub mod provider;
pub mod universe;
mod yahoo;

pub use normalize::{Normalized, Normalizer, DEFAULT_FUNDAMENTAL_PERIODS, DEFAULT_NEWS_LIMIT};
pub use provider::{NormalizeError, Provider};
pub use universe::{TickerUniverse, UniverseError, DEFAULT_TICKERS};
