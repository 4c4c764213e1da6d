use async_trait::async_trait;
use chrono::NaiveDate;

use super::transactions_model::{NewStockTransaction, StockTransaction};
use crate::errors::Result;

/// Trait defining the contract for transaction repository operations.
///
/// All list queries exclude soft-deleted rows and are ordered by
/// transaction date ascending, ties broken by id, so downstream
/// calculations are deterministic.
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    fn get_by_id(&self, portfolio_id: &str, transaction_id: &str) -> Result<StockTransaction>;
    fn list_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<StockTransaction>>;
    fn list_in_range(
        &self,
        portfolio_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StockTransaction>>;
    async fn create(&self, new_transaction: NewStockTransaction) -> Result<StockTransaction>;
    async fn soft_delete(&self, portfolio_id: &str, transaction_id: &str) -> Result<()>;
}
