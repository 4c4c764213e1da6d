use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::market_data::market_data_constants::TRADING_DAY_LOOKBACK_DAYS;
use crate::market_data::market_data_errors::MarketDataError;
use crate::market_data::market_data_model::DataSource;
use crate::transactions::Market;

use super::market_data_provider::{FxProvider, PriceProvider};
use super::models::{ProviderPrice, ProviderRate};

const STOOQ_BASE_URL: &str = "https://stooq.com";

/// Stooq serves daily bars as CSV (`Date,Open,High,Low,Close,Volume`) and
/// covers US/UK listings plus most currency crosses. It does not cover
/// Euronext.
pub struct StooqProvider {
    client: reqwest::Client,
    base_url: String,
}

impl StooqProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: STOOQ_BASE_URL.to_string(),
        }
    }

    fn stooq_symbol(ticker: &str, market: Market) -> String {
        let lower = ticker.to_lowercase();
        match market {
            Market::Us => format!("{}.us", lower),
            // UK tickers arrive as "VOD.L"; Stooq wants "vod.uk"
            Market::Uk => format!("{}.uk", lower.trim_end_matches(".l")),
            _ => lower,
        }
    }

    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, Decimal)>, MarketDataError> {
        let url = format!(
            "{}/q/d/l/?s={}&d1={}&d2={}&i=d",
            self.base_url,
            urlencoding::encode(symbol),
            from.format("%Y%m%d"),
            to.format("%Y%m%d"),
        );

        debug!("Fetching Stooq daily bars: {}", url);
        let body = self.client.get(&url).send().await?.text().await?;

        if body.contains("Exceeded the daily hits limit") {
            return Err(MarketDataError::RateLimitExceeded);
        }
        if body.trim().is_empty() || body.starts_with("No data") {
            return Err(MarketDataError::NotFound(symbol.to_string()));
        }

        let mut bars = Vec::new();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(body.as_bytes());

        for record in reader.records() {
            let record =
                record.map_err(|e| MarketDataError::ParsingError(e.to_string()))?;
            let (Some(date_field), Some(close_field)) = (record.get(0), record.get(4)) else {
                continue;
            };
            if close_field == "N/D" {
                continue;
            }
            let Ok(date) = NaiveDate::parse_from_str(date_field, "%Y-%m-%d") else {
                continue;
            };
            let Ok(close) = Decimal::from_str(close_field) else {
                continue;
            };
            bars.push((date, close));
        }

        if bars.is_empty() {
            return Err(MarketDataError::NotFound(symbol.to_string()));
        }

        bars.sort_by_key(|(date, _)| *date);
        Ok(bars)
    }

    async fn last_bar_on_or_before(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<(NaiveDate, Decimal), MarketDataError> {
        let from = date - Duration::days(TRADING_DAY_LOOKBACK_DAYS);
        let bars = self.fetch_daily_bars(symbol, from, date).await?;
        bars.into_iter()
            .filter(|(bar_date, _)| *bar_date <= date)
            .last()
            .ok_or_else(|| MarketDataError::NotFound(symbol.to_string()))
    }
}

#[async_trait]
impl PriceProvider for StooqProvider {
    fn source(&self) -> DataSource {
        DataSource::Stooq
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
        let symbol = Self::stooq_symbol(ticker, market);
        let (actual_date, close) = self.last_bar_on_or_before(&symbol, date).await?;
        Ok(ProviderPrice {
            price: close,
            actual_date,
            currency: market.currency().to_string(),
        })
    }
}

#[async_trait]
impl FxProvider for StooqProvider {
    fn source(&self) -> DataSource {
        DataSource::Stooq
    }

    async fn rate_on_date(
        &self,
        from_currency: &str,
        to_currency: &str,
        date: NaiveDate,
    ) -> Result<ProviderRate, MarketDataError> {
        let symbol = format!(
            "{}{}",
            from_currency.to_lowercase(),
            to_currency.to_lowercase()
        );
        let (actual_date, rate) = self.last_bar_on_or_before(&symbol, date).await?;
        Ok(ProviderRate { rate, actual_date })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_shaping_per_market() {
        assert_eq!(StooqProvider::stooq_symbol("AAPL", Market::Us), "aapl.us");
        assert_eq!(StooqProvider::stooq_symbol("VOD.L", Market::Uk), "vod.uk");
    }
}
