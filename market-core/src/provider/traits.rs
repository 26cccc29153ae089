// market-core/src/provider/traits.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use market_common::data::{PriceBar, Timeframe};

use super::errors::ProviderError;

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Ascending, de-duplicated bars from `start` to the latest available.
    async fn fetch_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<PriceBar>, ProviderError>;
}
