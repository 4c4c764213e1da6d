use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::schema::{historical_exchange_rate_cache, historical_year_end_data};

use super::market_data_errors::MarketDataError;
use super::market_data_model::{
    DataType, HistoricalExchangeRate, HistoricalExchangeRateDB, HistoricalYearEndData,
    HistoricalYearEndDataDB,
};
use super::market_data_traits::{ExchangeRateCacheRepositoryTrait, YearEndDataRepositoryTrait};

pub struct YearEndDataRepository {
    pool: Arc<DbPool>,
}

impl YearEndDataRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl YearEndDataRepositoryTrait for YearEndDataRepository {
    fn get(
        &self,
        data_type: DataType,
        ticker: &str,
        year: i32,
    ) -> Result<Option<HistoricalYearEndData>> {
        let mut conn = get_connection(&self.pool)
            .map_err(MarketDataError::DatabaseConnectionError)?;

        let row = historical_year_end_data::table
            .filter(historical_year_end_data::data_type.eq(data_type.as_str()))
            .filter(historical_year_end_data::ticker.eq(ticker.to_uppercase()))
            .filter(historical_year_end_data::year.eq(year))
            .first::<HistoricalYearEndDataDB>(&mut conn)
            .optional()
            .map_err(MarketDataError::DatabaseError)?;

        Ok(row.map(HistoricalYearEndData::from))
    }

    fn exists(&self, data_type: DataType, ticker: &str, year: i32) -> Result<bool> {
        Ok(self.get(data_type, ticker, year)?.is_some())
    }

    fn insert_or_get(&self, entry: HistoricalYearEndData) -> Result<HistoricalYearEndData> {
        let mut conn = get_connection(&self.pool)
            .map_err(MarketDataError::DatabaseConnectionError)?;

        let row: HistoricalYearEndDataDB = entry.into();

        // Losing the insert race is fine: the re-select below returns the
        // row the winner persisted.
        diesel::insert_into(historical_year_end_data::table)
            .values(&row)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .map_err(MarketDataError::DatabaseError)?;

        let stored = historical_year_end_data::table
            .filter(historical_year_end_data::data_type.eq(&row.data_type))
            .filter(historical_year_end_data::ticker.eq(&row.ticker))
            .filter(historical_year_end_data::year.eq(row.year))
            .first::<HistoricalYearEndDataDB>(&mut conn)
            .map_err(MarketDataError::DatabaseError)?;

        Ok(stored.into())
    }

    fn insert(&self, entry: HistoricalYearEndData) -> Result<HistoricalYearEndData> {
        let mut conn = get_connection(&self.pool)
            .map_err(MarketDataError::DatabaseConnectionError)?;

        let row: HistoricalYearEndDataDB = entry.into();

        match diesel::insert_into(historical_year_end_data::table)
            .values(&row)
            .execute(&mut conn)
        {
            Ok(_) => Ok(row.into()),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(MarketDataError::AlreadyExists(format!(
                    "{}/{}/{}",
                    row.data_type, row.ticker, row.year
                ))
                .into())
            }
            Err(e) => Err(MarketDataError::DatabaseError(e).into()),
        }
    }
}

pub struct ExchangeRateCacheRepository {
    pool: Arc<DbPool>,
}

impl ExchangeRateCacheRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl ExchangeRateCacheRepositoryTrait for ExchangeRateCacheRepository {
    fn get(
        &self,
        currency_pair: &str,
        requested_date: NaiveDate,
    ) -> Result<Option<HistoricalExchangeRate>> {
        let mut conn = get_connection(&self.pool)
            .map_err(MarketDataError::DatabaseConnectionError)?;

        let row = historical_exchange_rate_cache::table
            .filter(historical_exchange_rate_cache::currency_pair.eq(currency_pair))
            .filter(historical_exchange_rate_cache::requested_date.eq(requested_date))
            .first::<HistoricalExchangeRateDB>(&mut conn)
            .optional()
            .map_err(MarketDataError::DatabaseError)?;

        Ok(row.map(HistoricalExchangeRate::from))
    }

    fn exists(&self, currency_pair: &str, requested_date: NaiveDate) -> Result<bool> {
        Ok(self.get(currency_pair, requested_date)?.is_some())
    }

    fn insert_or_get(&self, entry: HistoricalExchangeRate) -> Result<HistoricalExchangeRate> {
        let mut conn = get_connection(&self.pool)
            .map_err(MarketDataError::DatabaseConnectionError)?;

        let row: HistoricalExchangeRateDB = entry.into();

        diesel::insert_into(historical_exchange_rate_cache::table)
            .values(&row)
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .map_err(MarketDataError::DatabaseError)?;

        let stored = historical_exchange_rate_cache::table
            .filter(historical_exchange_rate_cache::currency_pair.eq(&row.currency_pair))
            .filter(historical_exchange_rate_cache::requested_date.eq(row.requested_date))
            .first::<HistoricalExchangeRateDB>(&mut conn)
            .map_err(MarketDataError::DatabaseError)?;

        Ok(stored.into())
    }

    fn insert(&self, entry: HistoricalExchangeRate) -> Result<HistoricalExchangeRate> {
        let mut conn = get_connection(&self.pool)
            .map_err(MarketDataError::DatabaseConnectionError)?;

        let row: HistoricalExchangeRateDB = entry.into();

        match diesel::insert_into(historical_exchange_rate_cache::table)
            .values(&row)
            .execute(&mut conn)
        {
            Ok(_) => Ok(row.into()),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(MarketDataError::AlreadyExists(format!(
                    "{} on {}",
                    row.currency_pair, row.requested_date
                ))
                .into())
            }
            Err(e) => Err(MarketDataError::DatabaseError(e).into()),
        }
    }
}
