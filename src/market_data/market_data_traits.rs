use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::Result;
use crate::transactions::Market;

use super::market_data_model::{
    DataType, HistoricalExchangeRate, HistoricalYearEndData, Resolution,
};

/// Lazily-populated historical market-data cache: look up, fetch from a
/// provider on miss, persist, and report unresolvable inputs as values.
#[async_trait]
pub trait MarketDataServiceTrait: Send + Sync {
    async fn get_or_fetch_year_end_price(
        &self,
        ticker: &str,
        market: Market,
        year: i32,
    ) -> Result<Resolution>;

    async fn get_or_fetch_year_end_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        year: i32,
    ) -> Result<Resolution>;

    async fn get_or_fetch_rate_on_date(
        &self,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Resolution>;

    /// Manual entry is only permitted while no cache row exists for the key.
    async fn save_manual_year_end_price(
        &self,
        ticker: &str,
        year: i32,
        value: Decimal,
        currency: &str,
        actual_date: NaiveDate,
    ) -> Result<HistoricalYearEndData>;

    async fn save_manual_year_end_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        year: i32,
        rate: Decimal,
        actual_date: NaiveDate,
    ) -> Result<HistoricalYearEndData>;

    async fn save_manual_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        requested_date: NaiveDate,
        rate: Decimal,
        actual_date: NaiveDate,
    ) -> Result<HistoricalExchangeRate>;
}

/// Append-only store for year-end entries. The uniqueness constraint on
/// (data_type, ticker, year) is the sole arbitration for concurrent
/// population.
pub trait YearEndDataRepositoryTrait: Send + Sync {
    fn get(&self, data_type: DataType, ticker: &str, year: i32)
        -> Result<Option<HistoricalYearEndData>>;
    fn exists(&self, data_type: DataType, ticker: &str, year: i32) -> Result<bool>;
    /// Insert, or return the row another writer won the race with.
    fn insert_or_get(&self, entry: HistoricalYearEndData) -> Result<HistoricalYearEndData>;
    /// Strict insert for the manual path; a duplicate key is a business-rule
    /// error.
    fn insert(&self, entry: HistoricalYearEndData) -> Result<HistoricalYearEndData>;
}

/// Append-only store for transaction-date exchange rates, keyed by
/// (currency_pair, requested_date).
pub trait ExchangeRateCacheRepositoryTrait: Send + Sync {
    fn get(&self, currency_pair: &str, requested_date: NaiveDate)
        -> Result<Option<HistoricalExchangeRate>>;
    fn exists(&self, currency_pair: &str, requested_date: NaiveDate) -> Result<bool>;
    fn insert_or_get(&self, entry: HistoricalExchangeRate) -> Result<HistoricalExchangeRate>;
    fn insert(&self, entry: HistoricalExchangeRate) -> Result<HistoricalExchangeRate>;
}
