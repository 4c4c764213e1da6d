use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, RwLock};

use crate::errors::{Error, Result};
use crate::portfolios::{NewPortfolio, Portfolio, PortfolioRepositoryTrait, PortfolioUpdate};
use crate::snapshots::snapshot_errors::SnapshotError;
use crate::snapshots::snapshot_model::TransactionPortfolioSnapshot;
use crate::snapshots::snapshot_service::SnapshotService;
use crate::snapshots::snapshot_traits::{SnapshotRepositoryTrait, SnapshotServiceTrait};
use crate::splits::{NewStockSplit, SplitServiceTrait, StockSplit};
use crate::transactions::{
    FxRate, Market, NewStockTransaction, StockTransaction, TransactionError,
    TransactionRepositoryTrait, TransactionType,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct MockPortfolioRepository {
    portfolio: Portfolio,
}

impl MockPortfolioRepository {
    fn new(home_currency: &str) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            portfolio: Portfolio {
                id: "p1".to_string(),
                user_id: "u1".to_string(),
                name: "Main".to_string(),
                base_currency: home_currency.to_string(),
                home_currency: home_currency.to_string(),
                created_at: now,
                updated_at: now,
            },
        }
    }
}

#[async_trait]
impl PortfolioRepositoryTrait for MockPortfolioRepository {
    fn get_for_user(&self, _user_id: &str, _portfolio_id: &str) -> Result<Portfolio> {
        Ok(self.portfolio.clone())
    }
    fn get_by_id(&self, _portfolio_id: &str) -> Result<Portfolio> {
        Ok(self.portfolio.clone())
    }
    fn list_for_user(&self, _user_id: &str) -> Result<Vec<Portfolio>> {
        Ok(vec![self.portfolio.clone()])
    }
    async fn create(&self, _user_id: &str, _new_portfolio: NewPortfolio) -> Result<Portfolio> {
        unimplemented!()
    }
    async fn update(&self, _user_id: &str, _update: PortfolioUpdate) -> Result<Portfolio> {
        unimplemented!()
    }
}

#[derive(Default)]
struct MockTransactionRepository {
    transactions: RwLock<Vec<StockTransaction>>,
}

impl MockTransactionRepository {
    fn push(&self, tx: StockTransaction) {
        self.transactions.write().unwrap().push(tx);
    }

    fn sorted(&self) -> Vec<StockTransaction> {
        let mut txs: Vec<StockTransaction> = self
            .transactions
            .read()
            .unwrap()
            .iter()
            .filter(|tx| !tx.is_deleted)
            .cloned()
            .collect();
        txs.sort_by(|a, b| {
            a.transaction_date
                .cmp(&b.transaction_date)
                .then(a.id.cmp(&b.id))
        });
        txs
    }
}

#[async_trait]
impl TransactionRepositoryTrait for MockTransactionRepository {
    fn get_by_id(&self, _portfolio_id: &str, transaction_id: &str) -> Result<StockTransaction> {
        self.sorted()
            .into_iter()
            .find(|tx| tx.id == transaction_id)
            .ok_or_else(|| {
                TransactionError::NotFound(format!(
                    "Transaction with id {} not found",
                    transaction_id
                ))
                .into()
            })
    }
    fn list_for_portfolio(&self, _portfolio_id: &str) -> Result<Vec<StockTransaction>> {
        Ok(self.sorted())
    }
    fn list_in_range(
        &self,
        _portfolio_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<StockTransaction>> {
        Ok(self
            .sorted()
            .into_iter()
            .filter(|tx| tx.transaction_date >= from && tx.transaction_date <= to)
            .collect())
    }
    async fn create(&self, _new_transaction: NewStockTransaction) -> Result<StockTransaction> {
        unimplemented!()
    }
    async fn soft_delete(&self, _portfolio_id: &str, _transaction_id: &str) -> Result<()> {
        unimplemented!()
    }
}

#[derive(Default)]
struct MockSnapshotRepository {
    snapshots: RwLock<Vec<TransactionPortfolioSnapshot>>,
}

impl SnapshotRepositoryTrait for MockSnapshotRepository {
    fn get_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionPortfolioSnapshot>> {
        Ok(self
            .snapshots
            .read()
            .unwrap()
            .iter()
            .find(|s| s.transaction_id == transaction_id)
            .cloned())
    }

    fn get_snapshots(
        &self,
        portfolio_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TransactionPortfolioSnapshot>> {
        let mut rows: Vec<TransactionPortfolioSnapshot> = self
            .snapshots
            .read()
            .unwrap()
            .iter()
            .filter(|s| {
                s.portfolio_id == portfolio_id
                    && s.snapshot_date >= from
                    && s.snapshot_date <= to
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.snapshot_date
                .cmp(&b.snapshot_date)
                .then(a.transaction_id.cmp(&b.transaction_id))
        });
        Ok(rows)
    }

    fn upsert(
        &self,
        snapshot: TransactionPortfolioSnapshot,
    ) -> Result<TransactionPortfolioSnapshot> {
        let mut rows = self.snapshots.write().unwrap();
        rows.retain(|s| s.transaction_id != snapshot.transaction_id);
        rows.push(snapshot.clone());
        Ok(snapshot)
    }

    fn delete_by_transaction(&self, _portfolio_id: &str, transaction_id: &str) -> Result<()> {
        let mut rows = self.snapshots.write().unwrap();
        let before = rows.len();
        rows.retain(|s| s.transaction_id != transaction_id);
        if rows.len() == before {
            return Err(SnapshotError::NotFound(format!(
                "Snapshot for transaction {} not found",
                transaction_id
            ))
            .into());
        }
        Ok(())
    }
}

/// Split service stub that leaves the raw view untouched.
struct NoSplits;

#[async_trait]
impl SplitServiceTrait for NoSplits {
    async fn register_split(&self, _new_split: NewStockSplit) -> Result<StockSplit> {
        unimplemented!()
    }
    fn apply_adjustments(
        &self,
        transactions: Vec<StockTransaction>,
    ) -> Result<Vec<StockTransaction>> {
        Ok(transactions)
    }
}

fn buy(id: &str, tx_date: NaiveDate, shares: Decimal, price: Decimal) -> StockTransaction {
    StockTransaction {
        id: id.to_string(),
        portfolio_id: "p1".to_string(),
        transaction_date: tx_date,
        ticker: "2330".to_string(),
        market: Market::Tw,
        transaction_type: TransactionType::Buy,
        shares,
        price_per_share: price,
        exchange_rate: FxRate::Unresolved,
        fees: Decimal::ZERO,
        adjusted_shares: None,
        adjusted_price: None,
        split_ratio_applied: None,
        is_deleted: false,
        created_at: chrono::Utc::now().naive_utc(),
        updated_at: chrono::Utc::now().naive_utc(),
    }
}

struct Fixture {
    service: SnapshotService,
    transaction_repository: Arc<MockTransactionRepository>,
    snapshot_repository: Arc<MockSnapshotRepository>,
}

fn fixture() -> Fixture {
    let transaction_repository = Arc::new(MockTransactionRepository::default());
    let snapshot_repository = Arc::new(MockSnapshotRepository::default());
    let service = SnapshotService::new(
        Arc::new(MockPortfolioRepository::new("TWD")),
        transaction_repository.clone(),
        snapshot_repository.clone(),
        Arc::new(NoSplits),
    );
    Fixture {
        service,
        transaction_repository,
        snapshot_repository,
    }
}

#[tokio::test]
async fn upsert_captures_value_before_and_after() {
    let f = fixture();
    f.transaction_repository
        .push(buy("t1", date(2023, 1, 10), dec!(100), dec!(500)));
    f.transaction_repository
        .push(buy("t2", date(2023, 2, 10), dec!(50), dec!(520)));

    let snapshot = f.service.upsert("p1", "t2").await.unwrap();

    // Before: 100 shares at the last traded price of 500
    assert_eq!(snapshot.value_before, dec!(50000));
    // After: 150 shares at 520
    assert_eq!(snapshot.value_after, dec!(78000));
    assert_eq!(snapshot.snapshot_date, date(2023, 2, 10));
}

#[tokio::test]
async fn upsert_overwrites_the_existing_row() {
    let f = fixture();
    f.transaction_repository
        .push(buy("t1", date(2023, 1, 10), dec!(100), dec!(500)));

    let first = f.service.upsert("p1", "t1").await.unwrap();
    assert_eq!(first.value_before, Decimal::ZERO);
    assert_eq!(first.value_after, dec!(50000));

    // An earlier transaction appears; the recomputed row replaces the old one
    f.transaction_repository
        .push(buy("t0", date(2023, 1, 2), dec!(10), dec!(480)));
    let second = f.service.upsert("p1", "t1").await.unwrap();
    assert_eq!(second.value_before, dec!(4800));

    assert_eq!(f.snapshot_repository.snapshots.read().unwrap().len(), 1);
}

#[tokio::test]
async fn non_cash_flow_transactions_are_rejected() {
    let f = fixture();
    let mut adjustment = buy("t1", date(2023, 1, 10), dec!(1), dec!(0));
    adjustment.transaction_type = TransactionType::Split;
    f.transaction_repository.push(adjustment);

    let err = f.service.upsert("p1", "t1").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Snapshot(SnapshotError::InvalidData(_))
    ));
}

#[tokio::test]
async fn backfill_only_creates_missing_snapshots() {
    let f = fixture();
    f.transaction_repository
        .push(buy("t1", date(2023, 1, 10), dec!(100), dec!(500)));
    f.transaction_repository
        .push(buy("t2", date(2023, 2, 10), dec!(50), dec!(520)));

    let created = f
        .service
        .backfill("p1", date(2023, 1, 1), date(2023, 12, 31))
        .await
        .unwrap();
    assert_eq!(created, 2);

    let again = f
        .service
        .backfill("p1", date(2023, 1, 1), date(2023, 12, 31))
        .await
        .unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
async fn snapshots_are_ordered_with_id_tie_break() {
    let f = fixture();
    // Two cash flows on the same day
    f.transaction_repository
        .push(buy("t2", date(2023, 3, 1), dec!(10), dec!(100)));
    f.transaction_repository
        .push(buy("t1", date(2023, 3, 1), dec!(10), dec!(100)));
    f.service
        .backfill("p1", date(2023, 1, 1), date(2023, 12, 31))
        .await
        .unwrap();

    let snapshots = f
        .service
        .get_snapshots("p1", date(2023, 1, 1), date(2023, 12, 31))
        .unwrap();
    let ids: Vec<&str> = snapshots.iter().map(|s| s.transaction_id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2"]);
}

#[tokio::test]
async fn delete_removes_the_snapshot() {
    let f = fixture();
    f.transaction_repository
        .push(buy("t1", date(2023, 1, 10), dec!(100), dec!(500)));
    f.service.upsert("p1", "t1").await.unwrap();

    f.service.delete("p1", "t1").await.unwrap();
    let err = f.service.delete("p1", "t1").await.unwrap_err();
    assert!(matches!(err, Error::Snapshot(SnapshotError::NotFound(_))));
}
