use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::schema::stock_transactions;

use super::transactions_errors::TransactionError;
use super::transactions_model::{NewStockTransaction, StockTransaction, StockTransactionDB};
use super::transactions_traits::TransactionRepositoryTrait;

pub struct TransactionRepository {
    pool: Arc<DbPool>,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    fn get_by_id(&self, portfolio_id: &str, transaction_id: &str) -> Result<StockTransaction> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| TransactionError::DatabaseError(e.to_string()))?;

        let row = stock_transactions::table
            .filter(stock_transactions::id.eq(transaction_id))
            .filter(stock_transactions::portfolio_id.eq(portfolio_id))
            .filter(stock_transactions::is_deleted.eq(false))
            .first::<StockTransactionDB>(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => TransactionError::NotFound(format!(
                    "Transaction with id {} not found",
                    transaction_id
                )),
                _ => TransactionError::DatabaseError(e.to_string()),
            })?;

        Ok(row.into())
    }

    fn list_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<StockTransaction>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| TransactionError::DatabaseError(e.to_string()))?;

        let rows = stock_transactions::table
            .filter(stock_transactions::portfolio_id.eq(portfolio_id))
            .filter(stock_transactions::is_deleted.eq(false))
            .order((
                stock_transactions::transaction_date.asc(),
                stock_transactions::id.asc(),
            ))
            .load::<StockTransactionDB>(&mut conn)
            .map_err(|e| TransactionError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(StockTransaction::from).collect())
    }

    fn list_in_range(
        &self,
        portfolio_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StockTransaction>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| TransactionError::DatabaseError(e.to_string()))?;

        let rows = stock_transactions::table
            .filter(stock_transactions::portfolio_id.eq(portfolio_id))
            .filter(stock_transactions::is_deleted.eq(false))
            .filter(stock_transactions::transaction_date.ge(from))
            .filter(stock_transactions::transaction_date.le(to))
            .order((
                stock_transactions::transaction_date.asc(),
                stock_transactions::id.asc(),
            ))
            .load::<StockTransactionDB>(&mut conn)
            .map_err(|e| TransactionError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(StockTransaction::from).collect())
    }

    async fn create(&self, new_transaction: NewStockTransaction) -> Result<StockTransaction> {
        new_transaction.validate()?;

        let now = chrono::Utc::now().naive_utc();
        let market = new_transaction.market_or_inferred();
        let row = StockTransactionDB {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: new_transaction.portfolio_id,
            transaction_date: new_transaction.transaction_date,
            ticker: new_transaction.ticker.to_uppercase(),
            market: market.as_str().to_string(),
            transaction_type: new_transaction.transaction_type.as_str().to_string(),
            shares: new_transaction.shares.to_string(),
            price_per_share: new_transaction.price_per_share.to_string(),
            exchange_rate: new_transaction.exchange_rate.map(|r| r.to_string()),
            fees: new_transaction.fees.to_string(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        let mut conn = get_connection(&self.pool)
            .map_err(|e| TransactionError::DatabaseError(e.to_string()))?;

        diesel::insert_into(stock_transactions::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| TransactionError::DatabaseError(e.to_string()))?;

        Ok(row.into())
    }

    async fn soft_delete(&self, portfolio_id: &str, transaction_id: &str) -> Result<()> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| TransactionError::DatabaseError(e.to_string()))?;

        let affected = diesel::update(
            stock_transactions::table
                .filter(stock_transactions::id.eq(transaction_id))
                .filter(stock_transactions::portfolio_id.eq(portfolio_id)),
        )
        .set((
            stock_transactions::is_deleted.eq(true),
            stock_transactions::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .map_err(|e| TransactionError::DatabaseError(e.to_string()))?;

        if affected == 0 {
            return Err(TransactionError::NotFound(format!(
                "Transaction with id {} not found",
                transaction_id
            ))
            .into());
        }

        Ok(())
    }
}
