use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::DECIMAL_PRECISION;

/// Portfolio valuation captured immediately before and after a cash-flow
/// transaction, in home currency. One row per transaction; recomputed
/// whenever the transaction or anything valued before it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPortfolioSnapshot {
    pub id: String,
    pub portfolio_id: String,
    pub transaction_id: String,
    pub snapshot_date: NaiveDate,
    pub value_before: Decimal,
    pub value_after: Decimal,
    pub calculated_at: NaiveDateTime,
}

/// Database model for transaction snapshots
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::transaction_portfolio_snapshots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionPortfolioSnapshotDB {
    pub id: String,
    pub portfolio_id: String,
    pub transaction_id: String,
    pub snapshot_date: NaiveDate,
    pub value_before: String,
    pub value_after: String,
    pub calculated_at: NaiveDateTime,
}

impl From<TransactionPortfolioSnapshotDB> for TransactionPortfolioSnapshot {
    fn from(db: TransactionPortfolioSnapshotDB) -> Self {
        TransactionPortfolioSnapshot {
            id: db.id,
            portfolio_id: db.portfolio_id,
            transaction_id: db.transaction_id,
            snapshot_date: db.snapshot_date,
            value_before: Decimal::from_str(&db.value_before).unwrap_or_default(),
            value_after: Decimal::from_str(&db.value_after).unwrap_or_default(),
            calculated_at: db.calculated_at,
        }
    }
}

impl From<TransactionPortfolioSnapshot> for TransactionPortfolioSnapshotDB {
    fn from(domain: TransactionPortfolioSnapshot) -> Self {
        Self {
            id: domain.id,
            portfolio_id: domain.portfolio_id,
            transaction_id: domain.transaction_id,
            snapshot_date: domain.snapshot_date,
            value_before: domain.value_before.round_dp(DECIMAL_PRECISION).to_string(),
            value_after: domain.value_after.round_dp(DECIMAL_PRECISION).to_string(),
            calculated_at: domain.calculated_at,
        }
    }
}
