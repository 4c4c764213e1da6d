use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::schema::stock_splits;
use crate::transactions::Market;

use super::splits_errors::SplitError;
use super::splits_model::{NewStockSplit, StockSplit, StockSplitDB};
use super::splits_traits::SplitRepositoryTrait;

pub struct SplitRepository {
    pool: Arc<DbPool>,
}

impl SplitRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SplitRepositoryTrait for SplitRepository {
    fn list_for_symbol(&self, symbol: &str, market: Market) -> Result<Vec<StockSplit>> {
        let mut conn =
            get_connection(&self.pool).map_err(|e| SplitError::DatabaseError(e.to_string()))?;

        let rows = stock_splits::table
            .filter(stock_splits::symbol.eq(symbol.to_uppercase()))
            .filter(stock_splits::market.eq(market.as_str()))
            .order(stock_splits::effective_date.asc())
            .load::<StockSplitDB>(&mut conn)
            .map_err(|e| SplitError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(StockSplit::from).collect())
    }

    async fn create(&self, new_split: NewStockSplit) -> Result<StockSplit> {
        new_split.validate()?;

        let row = StockSplitDB {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: new_split.symbol.to_uppercase(),
            market: new_split.market.as_str().to_string(),
            effective_date: new_split.effective_date,
            ratio: new_split.ratio.to_string(),
            created_at: chrono::Utc::now().naive_utc(),
        };

        let mut conn =
            get_connection(&self.pool).map_err(|e| SplitError::DatabaseError(e.to_string()))?;

        diesel::insert_into(stock_splits::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| SplitError::DatabaseError(e.to_string()))?;

        Ok(row.into())
    }
}
