//! Domain types for tickerlake

pub mod bar;
pub mod indicator_row;
pub mod records;
pub mod source;
pub mod ticker;
pub mod window;

pub use bar::Bar;
pub use indicator_row::IndicatorRow;
pub use records::{EntityKind, FundamentalPeriod, NewsItem, Profile, Quote, Record, RecordBatch};
pub use source::{tags, SourceChain};
pub use ticker::{canonical_or_empty, normalize_ticker};
pub use window::DateWindow;
