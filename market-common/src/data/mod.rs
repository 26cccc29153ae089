pub mod cache;
pub mod repository;
pub mod types;

pub use cache::{SeriesCache, SeriesKey};
pub use repository::BarRepository;
pub use types::{DataError, DataResult, DbStats, EventStatus, PriceBar, Timeframe};
