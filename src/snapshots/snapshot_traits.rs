use async_trait::async_trait;
use chrono::NaiveDate;

use super::snapshot_model::TransactionPortfolioSnapshot;
use crate::errors::Result;

/// Trait defining the contract for snapshot repository operations.
pub trait SnapshotRepositoryTrait: Send + Sync {
    fn get_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionPortfolioSnapshot>>;
    /// Ordered by date ascending, ties broken by transaction id.
    fn get_snapshots(
        &self,
        portfolio_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionPortfolioSnapshot>>;
    fn upsert(
        &self,
        snapshot: TransactionPortfolioSnapshot,
    ) -> Result<TransactionPortfolioSnapshot>;
    fn delete_by_transaction(&self, portfolio_id: &str, transaction_id: &str) -> Result<()>;
}

/// Trait defining the contract for the snapshot service.
#[async_trait]
pub trait SnapshotServiceTrait: Send + Sync {
    /// Recompute and overwrite the snapshot for a cash-flow transaction.
    async fn upsert(
        &self,
        portfolio_id: &str,
        transaction_id: &str,
    ) -> Result<TransactionPortfolioSnapshot>;
    async fn delete(&self, portfolio_id: &str, transaction_id: &str) -> Result<()>;
    /// Create snapshots for every cash-flow transaction in range lacking
    /// one. Returns how many were created.
    async fn backfill(&self, portfolio_id: &str, from: NaiveDate, to: NaiveDate) -> Result<usize>;
    fn get_snapshots(
        &self,
        portfolio_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionPortfolioSnapshot>>;
}
