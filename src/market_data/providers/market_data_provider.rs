use async_trait::async_trait;
use chrono::NaiveDate;

use crate::market_data::market_data_errors::MarketDataError;
use crate::market_data::market_data_model::DataSource;
use crate::transactions::Market;

use super::models::{ProviderPrice, ProviderRate};

/// Contract for historical price providers. Both lookups resolve to the
/// nearest trading day on or before the requested point.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn source(&self) -> DataSource;

    /// Closing price on the last trading day of `year`.
    async fn year_end_price(
        &self,
        ticker: &str,
        market: Market,
        year: i32,
    ) -> Result<ProviderPrice, MarketDataError>;

    /// Closing price on the nearest trading day on or before `date`.
    async fn price_on_date(
        &self,
        ticker: &str,
        market: Market,
        date: NaiveDate,
    ) -> Result<ProviderPrice, MarketDataError>;
}

/// Contract for historical exchange-rate providers.
#[async_trait]
pub trait FxProvider: Send + Sync {
    fn source(&self) -> DataSource;

    async fn rate_on_date(
        &self,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<ProviderRate, MarketDataError>;
}
