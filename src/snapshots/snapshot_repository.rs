use chrono::NaiveDate;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::schema::transaction_portfolio_snapshots;

use super::snapshot_errors::SnapshotError;
use super::snapshot_model::{TransactionPortfolioSnapshot, TransactionPortfolioSnapshotDB};
use super::snapshot_traits::SnapshotRepositoryTrait;

pub struct SnapshotRepository {
    pool: Arc<DbPool>,
}

impl SnapshotRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl SnapshotRepositoryTrait for SnapshotRepository {
    fn get_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionPortfolioSnapshot>> {
        let mut conn =
            get_connection(&self.pool).map_err(|e| SnapshotError::DatabaseError(e.to_string()))?;

        let row = transaction_portfolio_snapshots::table
            .filter(transaction_portfolio_snapshots::transaction_id.eq(transaction_id))
            .first::<TransactionPortfolioSnapshotDB>(&mut conn)
            .optional()
            .map_err(|e| SnapshotError::DatabaseError(e.to_string()))?;

        Ok(row.map(TransactionPortfolioSnapshot::from))
    }

    fn get_snapshots(
        &self,
        portfolio_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionPortfolioSnapshot>> {
        let mut conn =
            get_connection(&self.pool).map_err(|e| SnapshotError::DatabaseError(e.to_string()))?;

        let rows = transaction_portfolio_snapshots::table
            .filter(transaction_portfolio_snapshots::portfolio_id.eq(portfolio_id))
            .filter(transaction_portfolio_snapshots::snapshot_date.ge(from))
            .filter(transaction_portfolio_snapshots::snapshot_date.le(to))
            .order((
                transaction_portfolio_snapshots::snapshot_date.asc(),
                transaction_portfolio_snapshots::transaction_id.asc(),
            ))
            .load::<TransactionPortfolioSnapshotDB>(&mut conn)
            .map_err(|e| SnapshotError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(TransactionPortfolioSnapshot::from)
            .collect())
    }

    fn upsert(
        &self,
        snapshot: TransactionPortfolioSnapshot,
    ) -> Result<TransactionPortfolioSnapshot> {
        let mut conn =
            get_connection(&self.pool).map_err(|e| SnapshotError::DatabaseError(e.to_string()))?;

        let row: TransactionPortfolioSnapshotDB = snapshot.into();

        diesel::insert_into(transaction_portfolio_snapshots::table)
            .values(&row)
            .on_conflict(transaction_portfolio_snapshots::transaction_id)
            .do_update()
            .set((
                transaction_portfolio_snapshots::snapshot_date.eq(&row.snapshot_date),
                transaction_portfolio_snapshots::value_before.eq(&row.value_before),
                transaction_portfolio_snapshots::value_after.eq(&row.value_after),
                transaction_portfolio_snapshots::calculated_at.eq(&row.calculated_at),
            ))
            .execute(&mut conn)
            .map_err(|e| SnapshotError::DatabaseError(e.to_string()))?;

        let stored = transaction_portfolio_snapshots::table
            .filter(transaction_portfolio_snapshots::transaction_id.eq(&row.transaction_id))
            .first::<TransactionPortfolioSnapshotDB>(&mut conn)
            .map_err(|e| SnapshotError::DatabaseError(e.to_string()))?;

        Ok(stored.into())
    }

    fn delete_by_transaction(&self, portfolio_id: &str, transaction_id: &str) -> Result<()> {
        let mut conn =
            get_connection(&self.pool).map_err(|e| SnapshotError::DatabaseError(e.to_string()))?;

        let affected = diesel::delete(
            transaction_portfolio_snapshots::table
                .filter(transaction_portfolio_snapshots::transaction_id.eq(transaction_id))
                .filter(transaction_portfolio_snapshots::portfolio_id.eq(portfolio_id)),
        )
        .execute(&mut conn)
        .map_err(|e| SnapshotError::DatabaseError(e.to_string()))?;

        if affected == 0 {
            return Err(SnapshotError::NotFound(format!(
                "Snapshot for transaction {} not found",
                transaction_id
            ))
            .into());
        }

        Ok(())
    }
}
