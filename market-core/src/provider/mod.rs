// market-core/src/provider/mod.rs

pub mod errors;
pub mod traits;
pub mod utils;
pub mod yahoo;

pub use errors::ProviderError;
pub use traits::PriceProvider;
pub use utils::validate_symbol;
pub use yahoo::YahooChartProvider;
