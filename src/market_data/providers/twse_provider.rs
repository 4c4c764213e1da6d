use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

use crate::market_data::market_data_errors::MarketDataError;
use crate::market_data::market_data_model::DataSource;
use crate::transactions::Market;

use super::market_data_provider::PriceProvider;
use super::models::ProviderPrice;

const TWSE_BASE_URL: &str = "https://www.twse.com.tw";

/// Taiwan Stock Exchange daily-report endpoint. One request returns a full
/// month of daily bars, with dates in ROC-calendar form ("112/12/29").
pub struct TwseProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TwseStockDayResponse {
    stat: String,
    #[serde(default)]
    data: Vec<Vec<String>>,
}

impl TwseProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: TWSE_BASE_URL.to_string(),
        }
    }

    fn parse_roc_date(raw: &str) -> Option<NaiveDate> {
        let mut parts = raw.split('/');
        let roc_year: i32 = parts.next()?.trim().parse().ok()?;
        let month: u32 = parts.next()?.trim().parse().ok()?;
        let day: u32 = parts.next()?.trim().parse().ok()?;
        NaiveDate::from_ymd_opt(roc_year + 1911, month, day)
    }

    fn parse_close(raw: &str) -> Option<Decimal> {
        let cleaned = raw.replace(',', "");
        if cleaned == "--" {
            return None;
        }
        Decimal::from_str(&cleaned).ok()
    }

    /// Daily closes for the month containing `date`, ascending.
    async fn fetch_month(
        &self,
        stock_no: &str,
        date: NaiveDate,
    ) -> Result<Vec<(NaiveDate, Decimal)>, MarketDataError> {
        let month_start = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
            .ok_or_else(|| MarketDataError::InvalidData(format!("Invalid date: {}", date)))?;
        let url = format!(
            "{}/exchangeReport/STOCK_DAY?response=json&date={}&stockNo={}",
            self.base_url,
            month_start.format("%Y%m%d"),
            urlencoding::encode(stock_no),
        );

        debug!("Fetching TWSE month: {}", url);
        let body = self.client.get(&url).send().await?.text().await?;
        let response: TwseStockDayResponse = serde_json::from_str(&body)
            .map_err(|e| MarketDataError::ParsingError(format!("TWSE response: {}", e)))?;

        if response.stat != "OK" {
            return Err(MarketDataError::NotFound(format!(
                "TWSE has no data for {} in {}",
                stock_no,
                month_start.format("%Y-%m")
            )));
        }

        let mut bars: Vec<(NaiveDate, Decimal)> = response
            .data
            .iter()
            .filter_map(|row| {
                let date = Self::parse_roc_date(row.first()?)?;
                let close = Self::parse_close(row.get(6)?)?;
                Some((date, close))
            })
            .collect();

        bars.sort_by_key(|(date, _)| *date);
        Ok(bars)
    }

    /// Nearest trading day on or before `date`, looking back one extra
    /// month when the requested month has no earlier session.
    async fn close_on_or_before(
        &self,
        stock_no: &str,
        date: NaiveDate,
    ) -> Result<(NaiveDate, Decimal), MarketDataError> {
        let current_month = self.fetch_month(stock_no, date).await;
        if let Ok(bars) = current_month {
            if let Some(bar) = bars.into_iter().filter(|(d, _)| *d <= date).last() {
                return Ok(bar);
            }
        }

        let previous_month = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| MarketDataError::InvalidData(format!("Invalid date: {}", date)))?;
        let bars = self.fetch_month(stock_no, previous_month).await?;
        bars.into_iter()
            .filter(|(d, _)| *d <= date)
            .last()
            .ok_or_else(|| MarketDataError::NotFound(stock_no.to_string()))
    }
}

#[async_trait]
impl PriceProvider for TwseProvider {
    fn source(&self) -> DataSource {
        DataSource::Twse
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
        _market: Market,
        date: NaiveDate,
    ) -> Result<ProviderPrice, MarketDataError> {
        let (actual_date, close) = self.close_on_or_before(ticker, date).await?;
        Ok(ProviderPrice {
            price: close,
            actual_date,
            currency: Market::Tw.currency().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn roc_dates_convert_to_gregorian() {
        assert_eq!(
            TwseProvider::parse_roc_date("112/12/29"),
            NaiveDate::from_ymd_opt(2023, 12, 29)
        );
        assert_eq!(TwseProvider::parse_roc_date("garbage"), None);
    }

    #[test]
    fn closes_strip_thousands_separators() {
        assert_eq!(TwseProvider::parse_close("1,085.00"), Some(dec!(1085.00)));
        assert_eq!(TwseProvider::parse_close("--"), None);
    }
}
