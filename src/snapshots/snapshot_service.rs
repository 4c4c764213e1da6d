use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::debug;
use std::sync::Arc;

use crate::errors::Result;
use crate::portfolios::PortfolioRepositoryTrait;
use crate::splits::SplitServiceTrait;
use crate::transactions::{StockTransaction, TransactionRepositoryTrait};

use super::snapshot_errors::SnapshotError;
use super::snapshot_model::TransactionPortfolioSnapshot;
use super::snapshot_traits::{SnapshotRepositoryTrait, SnapshotServiceTrait};
use super::valuation::portfolio_value;

/// Maintains the before/after valuation rows that anchor TWR sub-periods.
/// All store access is sequential within one call.
pub struct SnapshotService {
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
    split_service: Arc<dyn SplitServiceTrait>,
}

impl SnapshotService {
    pub fn new(
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        snapshot_repository: Arc<dyn SnapshotRepositoryTrait>,
        split_service: Arc<dyn SplitServiceTrait>,
    ) -> Self {
        Self {
            portfolio_repository,
            transaction_repository,
            snapshot_repository,
            split_service,
        }
    }

    /// Recompute the snapshot values for one transaction against the full
    /// adjusted transaction stream.
    fn compute_snapshot(
        &self,
        portfolio_id: &str,
        transaction: &StockTransaction,
        adjusted_transactions: &[StockTransaction],
        home_currency: &str,
    ) -> TransactionPortfolioSnapshot {
        let before: Vec<StockTransaction> = adjusted_transactions
            .iter()
            .filter(|tx| tx.transaction_date < transaction.transaction_date)
            .cloned()
            .collect();

        let value_before = portfolio_value(&before, home_currency);

        let mut including: Vec<StockTransaction> = before;
        if let Some(adjusted_self) = adjusted_transactions
            .iter()
            .find(|tx| tx.id == transaction.id)
        {
            including.push(adjusted_self.clone());
        }
        let value_after = portfolio_value(&including, home_currency);

        TransactionPortfolioSnapshot {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: portfolio_id.to_string(),
            transaction_id: transaction.id.clone(),
            snapshot_date: transaction.transaction_date,
            value_before,
            value_after,
            calculated_at: Utc::now().naive_utc(),
        }
    }
}

#[async_trait]
impl SnapshotServiceTrait for SnapshotService {
    async fn upsert(
        &self,
        portfolio_id: &str,
        transaction_id: &str,
    ) -> Result<TransactionPortfolioSnapshot> {
        let portfolio = self.portfolio_repository.get_by_id(portfolio_id)?;
        let transaction = self
            .transaction_repository
            .get_by_id(portfolio_id, transaction_id)?;

        if !transaction.is_cash_flow() {
            return Err(SnapshotError::InvalidData(format!(
                "Transaction {} is not a cash-flow event",
                transaction_id
            ))
            .into());
        }

        let all = self.transaction_repository.list_for_portfolio(portfolio_id)?;
        let adjusted = self.split_service.apply_adjustments(all)?;

        let snapshot = self.compute_snapshot(
            portfolio_id,
            &transaction,
            &adjusted,
            &portfolio.home_currency,
        );

        self.snapshot_repository.upsert(snapshot)
    }

    async fn delete(&self, portfolio_id: &str, transaction_id: &str) -> Result<()> {
        self.snapshot_repository
            .delete_by_transaction(portfolio_id, transaction_id)
    }

    async fn backfill(&self, portfolio_id: &str, from: NaiveDate, to: NaiveDate) -> Result<usize> {
        let portfolio = self.portfolio_repository.get_by_id(portfolio_id)?;

        let in_range = self
            .transaction_repository
            .list_in_range(portfolio_id, from, to)?;

        let all = self.transaction_repository.list_for_portfolio(portfolio_id)?;
        let adjusted = self.split_service.apply_adjustments(all)?;

        let mut created = 0;
        for transaction in in_range.iter().filter(|tx| tx.is_cash_flow()) {
            if self
                .snapshot_repository
                .get_by_transaction(&transaction.id)?
                .is_some()
            {
                continue;
            }

            let snapshot = self.compute_snapshot(
                portfolio_id,
                transaction,
                &adjusted,
                &portfolio.home_currency,
            );
            self.snapshot_repository.upsert(snapshot)?;
            created += 1;
        }

        debug!(
            "Backfilled {} snapshots for portfolio {} between {} and {}",
            created, portfolio_id, from, to
        );
        Ok(created)
    }

    fn get_snapshots(
        &self,
        portfolio_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionPortfolioSnapshot>> {
        self.snapshot_repository.get_snapshots(portfolio_id, from, to)
    }
}
