use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::market_data_constants::{
    DATA_SOURCE_MANUAL, DATA_SOURCE_STOOQ, DATA_SOURCE_TWSE, DATA_SOURCE_YAHOO,
    DATA_TYPE_EXCHANGE_RATE, DATA_TYPE_STOCK_PRICE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Stooq,
    Twse,
    Yahoo,
    Manual,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Stooq => DATA_SOURCE_STOOQ,
            DataSource::Twse => DATA_SOURCE_TWSE,
            DataSource::Yahoo => DATA_SOURCE_YAHOO,
            DataSource::Manual => DATA_SOURCE_MANUAL,
        }
    }
}

impl From<&str> for DataSource {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            DATA_SOURCE_STOOQ => DataSource::Stooq,
            DATA_SOURCE_TWSE => DataSource::Twse,
            DATA_SOURCE_YAHOO => DataSource::Yahoo,
            _ => DataSource::Manual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    StockPrice,
    ExchangeRate,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::StockPrice => DATA_TYPE_STOCK_PRICE,
            DataType::ExchangeRate => DATA_TYPE_EXCHANGE_RATE,
        }
    }
}

impl From<&str> for DataType {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            DATA_TYPE_EXCHANGE_RATE => DataType::ExchangeRate,
            _ => DataType::StockPrice,
        }
    }
}

/// Year-end cache entry: one immutable row per (data type, ticker, year).
/// `actual_date` records the trading day the value really belongs to, so
/// staleness relative to Dec 31 is explicit to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalYearEndData {
    pub id: String,
    pub data_type: DataType,
    pub ticker: String,
    pub year: i32,
    pub value: Decimal,
    pub currency: String,
    pub actual_date: NaiveDate,
    pub source: DataSource,
    pub fetched_at: NaiveDateTime,
}

impl HistoricalYearEndData {
    pub fn make_id(data_type: DataType, ticker: &str, year: i32) -> String {
        format!("{}_{}_{}", data_type.as_str(), ticker.to_uppercase(), year)
    }
}

/// Transaction-date exchange-rate cache entry, keyed by the exact
/// requested date rather than a year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalExchangeRate {
    pub id: String,
    pub currency_pair: String,
    pub requested_date: NaiveDate,
    pub rate: Decimal,
    pub actual_date: NaiveDate,
    pub source: DataSource,
    pub fetched_at: NaiveDateTime,
}

impl HistoricalExchangeRate {
    pub fn make_pair(from_currency: &str, to_currency: &str) -> String {
        format!(
            "{}/{}",
            from_currency.to_uppercase(),
            to_currency.to_uppercase()
        )
    }

    pub fn make_id(currency_pair: &str, requested_date: NaiveDate) -> String {
        format!("{}_{}", currency_pair, requested_date.format("%Y%m%d"))
    }
}

/// A successfully resolved price or rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedValue {
    pub value: Decimal,
    pub actual_date: NaiveDate,
    pub source: DataSource,
    pub from_cache: bool,
}

/// Outcome of a cache lookup. `Unresolved` is a value, not an error:
/// callers accumulate it into their missing-input lists and keep going.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "value")]
pub enum Resolution {
    Resolved(ResolvedValue),
    Unresolved,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&ResolvedValue> {
        match self {
            Resolution::Resolved(v) => Some(v),
            Resolution::Unresolved => None,
        }
    }

    pub fn into_resolved(self) -> Option<ResolvedValue> {
        match self {
            Resolution::Resolved(v) => Some(v),
            Resolution::Unresolved => None,
        }
    }
}

/// Database model for year-end cache entries
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::historical_year_end_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HistoricalYearEndDataDB {
    pub id: String,
    pub data_type: String,
    pub ticker: String,
    pub year: i32,
    pub value: String,
    pub currency: String,
    pub actual_date: NaiveDate,
    pub source: String,
    pub fetched_at: NaiveDateTime,
}

impl From<HistoricalYearEndDataDB> for HistoricalYearEndData {
    fn from(db: HistoricalYearEndDataDB) -> Self {
        HistoricalYearEndData {
            id: db.id,
            data_type: DataType::from(db.data_type.as_str()),
            ticker: db.ticker,
            year: db.year,
            value: Decimal::from_str(&db.value).unwrap_or_default(),
            currency: db.currency,
            actual_date: db.actual_date,
            source: DataSource::from(db.source.as_str()),
            fetched_at: db.fetched_at,
        }
    }
}

impl From<HistoricalYearEndData> for HistoricalYearEndDataDB {
    fn from(domain: HistoricalYearEndData) -> Self {
        Self {
            id: domain.id,
            data_type: domain.data_type.as_str().to_string(),
            ticker: domain.ticker.to_uppercase(),
            year: domain.year,
            value: domain.value.to_string(),
            currency: domain.currency,
            actual_date: domain.actual_date,
            source: domain.source.as_str().to_string(),
            fetched_at: domain.fetched_at,
        }
    }
}

/// Database model for transaction-date exchange rates
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::historical_exchange_rate_cache)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HistoricalExchangeRateDB {
    pub id: String,
    pub currency_pair: String,
    pub requested_date: NaiveDate,
    pub rate: String,
    pub actual_date: NaiveDate,
    pub source: String,
    pub fetched_at: NaiveDateTime,
}

impl From<HistoricalExchangeRateDB> for HistoricalExchangeRate {
    fn from(db: HistoricalExchangeRateDB) -> Self {
        HistoricalExchangeRate {
            id: db.id,
            currency_pair: db.currency_pair,
            requested_date: db.requested_date,
            rate: Decimal::from_str(&db.rate).unwrap_or_default(),
            actual_date: db.actual_date,
            source: DataSource::from(db.source.as_str()),
            fetched_at: db.fetched_at,
        }
    }
}

impl From<HistoricalExchangeRate> for HistoricalExchangeRateDB {
    fn from(domain: HistoricalExchangeRate) -> Self {
        Self {
            id: domain.id,
            currency_pair: domain.currency_pair,
            requested_date: domain.requested_date,
            rate: domain.rate.to_string(),
            actual_date: domain.actual_date,
            source: domain.source.as_str().to_string(),
            fetched_at: domain.fetched_at,
        }
    }
}
