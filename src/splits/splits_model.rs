use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::transactions::Market;

use super::splits_errors::SplitError;

/// A registered stock split. Splits are global, not per user: every
/// computation touching the (symbol, market) pair reinterprets older
/// transactions through the split's ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSplit {
    pub id: String,
    pub symbol: String,
    pub market: Market,
    pub effective_date: NaiveDate,
    /// Share multiplier, e.g. 4 for a 1-to-4 split
    pub ratio: Decimal,
    pub created_at: NaiveDateTime,
}

/// Input model for registering a split
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStockSplit {
    pub symbol: String,
    pub market: Market,
    pub effective_date: NaiveDate,
    pub ratio: Decimal,
}

impl NewStockSplit {
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::Split(SplitError::InvalidData(
                "Symbol cannot be empty".to_string(),
            )));
        }
        if self.ratio <= Decimal::ZERO {
            return Err(Error::Split(SplitError::InvalidRatio(format!(
                "Ratio must be positive, got {}",
                self.ratio
            ))));
        }
        if self.ratio == Decimal::ONE {
            return Err(Error::Split(SplitError::InvalidRatio(
                "Ratio of 1 is a no-op".to_string(),
            )));
        }
        Ok(())
    }
}

/// Database model for stock splits
#[derive(Queryable, Identifiable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::stock_splits)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StockSplitDB {
    pub id: String,
    pub symbol: String,
    pub market: String,
    pub effective_date: NaiveDate,
    pub ratio: String,
    pub created_at: NaiveDateTime,
}

impl From<StockSplitDB> for StockSplit {
    fn from(db: StockSplitDB) -> Self {
        StockSplit {
            id: db.id,
            symbol: db.symbol,
            market: Market::from(db.market.as_str()),
            effective_date: db.effective_date,
            ratio: Decimal::from_str(&db.ratio).unwrap_or(Decimal::ONE),
            created_at: db.created_at,
        }
    }
}

impl From<StockSplit> for StockSplitDB {
    fn from(domain: StockSplit) -> Self {
        Self {
            id: domain.id,
            symbol: domain.symbol,
            market: domain.market.as_str().to_string(),
            effective_date: domain.effective_date,
            ratio: domain.ratio.to_string(),
            created_at: domain.created_at,
        }
    }
}
