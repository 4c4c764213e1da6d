use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use log::debug;
use rust_decimal::Decimal;
use std::time::{Duration as StdDuration, SystemTime};

use yahoo_finance_api as yahoo;

use crate::market_data::market_data_constants::TRADING_DAY_LOOKBACK_DAYS;
use crate::market_data::market_data_errors::MarketDataError;
use crate::market_data::market_data_model::DataSource;
use crate::transactions::Market;

use super::market_data_provider::PriceProvider;
use super::models::ProviderPrice;

/// Yahoo Finance covers the Euronext listings Stooq does not.
pub struct YahooProvider {
    provider: yahoo::YahooConnector,
}

impl YahooProvider {
    pub fn new() -> Result<Self, MarketDataError> {
        let provider = yahoo::YahooConnector::new()?;
        Ok(YahooProvider { provider })
    }

    fn to_system_time(date: NaiveDate) -> SystemTime {
        let timestamp = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
            .max(0);
        SystemTime::UNIX_EPOCH + StdDuration::from_secs(timestamp as u64)
    }

    async fn close_on_or_before(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<(NaiveDate, Decimal), MarketDataError> {
        let from = date - Duration::days(TRADING_DAY_LOOKBACK_DAYS);
        // Window end is exclusive of the following day's session
        let to = date + Duration::days(1);

        debug!("Fetching Yahoo history for {} around {}", symbol, date);
        let response = self
            .provider
            .get_quote_history(
                symbol,
                Self::to_system_time(from).into(),
                Self::to_system_time(to).into(),
            )
            .await?;

        let quote = response
            .quotes()?
            .into_iter()
            .filter_map(|q| {
                let quote_date = Utc
                    .timestamp_opt(q.timestamp as i64, 0)
                    .single()?
                    .date_naive();
                if quote_date > date {
                    return None;
                }
                let close = Decimal::from_f64_retain(q.close)?;
                Some((quote_date, close))
            })
            .last()
            .ok_or_else(|| MarketDataError::NotFound(symbol.to_string()))?;

        Ok(quote)
    }
}

#[async_trait]
impl PriceProvider for YahooProvider {
    fn source(&self) -> DataSource {
        DataSource::Yahoo
    }

    async fn year_end_price(
        &self,
        ticker: &str,
        market: Market,
        year: i32,
    ) -> Result<ProviderPrice, MarketDataError> {
        let year_end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(|| {
            MarketDataError::InvalidData(format!("Invalid year: {}", year))
        })?;
        self.price_on_date(ticker, market, year_end).await
    }

    async fn price_on_date(
        &self,
        ticker: &str,
        market: Market,
        date: NaiveDate,
    ) -> Result<ProviderPrice, MarketDataError> {
        let (actual_date, close) = self.close_on_or_before(ticker, date).await?;
        Ok(ProviderPrice {
            price: close,
            actual_date,
            currency: market.currency().to_string(),
        })
    }
}
