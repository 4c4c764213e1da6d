use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::warn;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::errors::Result;
use crate::transactions::Market;

use super::market_data_errors::MarketDataError;
use super::market_data_model::{
    DataSource, DataType, HistoricalExchangeRate, HistoricalYearEndData, Resolution,
    ResolvedValue,
};
use super::market_data_traits::{
    ExchangeRateCacheRepositoryTrait, MarketDataServiceTrait, YearEndDataRepositoryTrait,
};
use super::providers::ProviderRegistry;

/// Lazily-populated, append-only cache over the external providers.
///
/// Lookup order is cache, then the provider selected for the instrument's
/// market, then persist. Provider failures of any kind surface as
/// `Resolution::Unresolved`; only store failures are hard errors. The
/// provider fetch and the cache write happen in the same task, so a
/// cancelled calculation leaves no partial writes.
pub struct MarketDataService {
    year_end_repository: Arc<dyn YearEndDataRepositoryTrait>,
    rate_cache_repository: Arc<dyn ExchangeRateCacheRepositoryTrait>,
    registry: Arc<ProviderRegistry>,
}

impl MarketDataService {
    pub fn new(
        year_end_repository: Arc<dyn YearEndDataRepositoryTrait>,
        rate_cache_repository: Arc<dyn ExchangeRateCacheRepositoryTrait>,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            year_end_repository,
            rate_cache_repository,
            registry,
        }
    }

    fn year_end_date(year: i32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(|| {
            MarketDataError::InvalidData(format!("Invalid year: {}", year)).into()
        })
    }

    fn resolved_from_entry(entry: HistoricalYearEndData, from_cache: bool) -> Resolution {
        Resolution::Resolved(ResolvedValue {
            value: entry.value,
            actual_date: entry.actual_date,
            source: entry.source,
            from_cache,
        })
    }
}

#[async_trait]
impl MarketDataServiceTrait for MarketDataService {
    async fn get_or_fetch_year_end_price(
        &self,
        ticker: &str,
        market: Market,
        year: i32,
    ) -> Result<Resolution> {
        let ticker = ticker.to_uppercase();

        if let Some(entry) = self
            .year_end_repository
            .get(DataType::StockPrice, &ticker, year)?
        {
            return Ok(Self::resolved_from_entry(entry, true));
        }

        let provider = self.registry.price_provider(market);
        let price = match provider.year_end_price(&ticker, market, year).await {
            Ok(price) => price,
            Err(e) if e.is_unresolved() => {
                warn!(
                    "Year-end price for {}/{} unresolved via {:?}: {}",
                    ticker,
                    year,
                    provider.source(),
                    e
                );
                return Ok(Resolution::Unresolved);
            }
            Err(e) => return Err(e.into()),
        };

        let entry = HistoricalYearEndData {
            id: HistoricalYearEndData::make_id(DataType::StockPrice, &ticker, year),
            data_type: DataType::StockPrice,
            ticker: ticker.clone(),
            year,
            value: price.price,
            currency: price.currency,
            actual_date: price.actual_date,
            source: provider.source(),
            fetched_at: Utc::now().naive_utc(),
        };

        let stored = self.year_end_repository.insert_or_get(entry)?;
        Ok(Self::resolved_from_entry(stored, false))
    }

    async fn get_or_fetch_year_end_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        year: i32,
    ) -> Result<Resolution> {
        let pair = HistoricalExchangeRate::make_pair(from_currency, to_currency);

        if let Some(entry) = self
            .year_end_repository
            .get(DataType::ExchangeRate, &pair, year)?
        {
            if entry.value <= Decimal::ZERO {
                warn!(
                    "Cached year-end rate {} for {} is not positive, treating as absent",
                    entry.value, pair
                );
                return Ok(Resolution::Unresolved);
            }
            return Ok(Self::resolved_from_entry(entry, true));
        }

        let year_end = Self::year_end_date(year)?;
        let provider = self.registry.fx_provider();
        let rate = match provider
            .rate_on_date(from_currency, to_currency, year_end)
            .await
        {
            Ok(rate) => rate,
            Err(e) if e.is_unresolved() => {
                warn!(
                    "Year-end rate for {}/{} unresolved via {:?}: {}",
                    pair,
                    year,
                    provider.source(),
                    e
                );
                return Ok(Resolution::Unresolved);
            }
            Err(e) => return Err(e.into()),
        };

        let entry = HistoricalYearEndData {
            id: HistoricalYearEndData::make_id(DataType::ExchangeRate, &pair, year),
            data_type: DataType::ExchangeRate,
            ticker: pair.clone(),
            year,
            value: rate.rate,
            currency: to_currency.to_uppercase(),
            actual_date: rate.actual_date,
            source: provider.source(),
            fetched_at: Utc::now().naive_utc(),
        };

        let stored = self.year_end_repository.insert_or_get(entry)?;
        Ok(Self::resolved_from_entry(stored, false))
    }

    async fn get_or_fetch_rate_on_date(
        &self,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<Resolution> {
        let pair = HistoricalExchangeRate::make_pair(from_currency, to_currency);

        if let Some(entry) = self.rate_cache_repository.get(&pair, date)? {
            if entry.rate <= Decimal::ZERO {
                warn!(
                    "Cached rate {} for {} on {} is not positive, treating as absent",
                    entry.rate, pair, date
                );
                return Ok(Resolution::Unresolved);
            }
            return Ok(Resolution::Resolved(ResolvedValue {
                value: entry.rate,
                actual_date: entry.actual_date,
                source: entry.source,
                from_cache: true,
            }));
        }

        let provider = self.registry.fx_provider();
        let rate = match provider.rate_on_date(from_currency, to_currency, date).await {
            Ok(rate) => rate,
            Err(e) if e.is_unresolved() => {
                warn!(
                    "Rate for {} on {} unresolved via {:?}: {}",
                    pair,
                    date,
                    provider.source(),
                    e
                );
                return Ok(Resolution::Unresolved);
            }
            Err(e) => return Err(e.into()),
        };

        let entry = HistoricalExchangeRate {
            id: HistoricalExchangeRate::make_id(&pair, date),
            currency_pair: pair,
            requested_date: date,
            rate: rate.rate,
            actual_date: rate.actual_date,
            source: provider.source(),
            fetched_at: Utc::now().naive_utc(),
        };

        let stored = self.rate_cache_repository.insert_or_get(entry)?;
        Ok(Resolution::Resolved(ResolvedValue {
            value: stored.rate,
            actual_date: stored.actual_date,
            source: stored.source,
            from_cache: false,
        }))
    }

    async fn save_manual_year_end_price(
        &self,
        ticker: &str,
        year: i32,
        value: Decimal,
        currency: &str,
        actual_date: NaiveDate,
    ) -> Result<HistoricalYearEndData> {
        let ticker = ticker.to_uppercase();

        if value <= Decimal::ZERO {
            return Err(MarketDataError::InvalidData(format!(
                "Manual price must be positive, got {}",
                value
            ))
            .into());
        }

        // Immutability guard; the unique constraint backs this up under
        // concurrency.
        if self
            .year_end_repository
            .exists(DataType::StockPrice, &ticker, year)?
        {
            return Err(MarketDataError::AlreadyExists(format!(
                "Year-end price for {} in {} already cached",
                ticker, year
            ))
            .into());
        }

        let entry = HistoricalYearEndData {
            id: HistoricalYearEndData::make_id(DataType::StockPrice, &ticker, year),
            data_type: DataType::StockPrice,
            ticker,
            year,
            value,
            currency: currency.to_uppercase(),
            actual_date,
            source: DataSource::Manual,
            fetched_at: Utc::now().naive_utc(),
        };

        self.year_end_repository.insert(entry)
    }

    async fn save_manual_year_end_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        year: i32,
        rate: Decimal,
        actual_date: NaiveDate,
    ) -> Result<HistoricalYearEndData> {
        let pair = HistoricalExchangeRate::make_pair(from_currency, to_currency);

        if rate <= Decimal::ZERO {
            return Err(MarketDataError::InvalidData(format!(
                "Manual rate must be positive, got {}",
                rate
            ))
            .into());
        }

        if self
            .year_end_repository
            .exists(DataType::ExchangeRate, &pair, year)?
        {
            return Err(MarketDataError::AlreadyExists(format!(
                "Year-end rate for {} in {} already cached",
                pair, year
            ))
            .into());
        }

        let entry = HistoricalYearEndData {
            id: HistoricalYearEndData::make_id(DataType::ExchangeRate, &pair, year),
            data_type: DataType::ExchangeRate,
            ticker: pair,
            year,
            value: rate,
            currency: to_currency.to_uppercase(),
            actual_date,
            source: DataSource::Manual,
            fetched_at: Utc::now().naive_utc(),
        };

        self.year_end_repository.insert(entry)
    }

    async fn save_manual_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        requested_date: NaiveDate,
        rate: Decimal,
        actual_date: NaiveDate,
    ) -> Result<HistoricalExchangeRate> {
        let pair = HistoricalExchangeRate::make_pair(from_currency, to_currency);

        if rate <= Decimal::ZERO {
            return Err(MarketDataError::InvalidData(format!(
                "Manual rate must be positive, got {}",
                rate
            ))
            .into());
        }

        if self.rate_cache_repository.exists(&pair, requested_date)? {
            return Err(MarketDataError::AlreadyExists(format!(
                "Rate for {} on {} already cached",
                pair, requested_date
            ))
            .into());
        }

        let entry = HistoricalExchangeRate {
            id: HistoricalExchangeRate::make_id(&pair, requested_date),
            currency_pair: pair,
            requested_date,
            rate,
            actual_date,
            source: DataSource::Manual,
            fetched_at: Utc::now().naive_utc(),
        };

        self.rate_cache_repository.insert(entry)
    }
}
