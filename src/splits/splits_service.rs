use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::Result;
use crate::transactions::{Market, StockTransaction};

use super::splits_model::{NewStockSplit, StockSplit};
use super::splits_traits::{SplitRepositoryTrait, SplitServiceTrait};

pub struct SplitService {
    repository: Arc<dyn SplitRepositoryTrait>,
}

impl SplitService {
    pub fn new(repository: Arc<dyn SplitRepositoryTrait>) -> Self {
        Self { repository }
    }
}

/// Product of the ratios of every split that post-dates the transaction.
/// A split effective exactly on the transaction date counts: the
/// transaction is pre-split.
pub fn cumulative_ratio(transaction_date: chrono::NaiveDate, splits: &[StockSplit]) -> Decimal {
    splits
        .iter()
        .filter(|split| split.effective_date >= transaction_date)
        .fold(Decimal::ONE, |acc, split| acc * split.ratio)
}

/// Compute the split-adjusted view of a transaction from its raw fields.
/// Always starts from the raw shares/price, so re-applying with the same
/// split list is a no-op and `total_cost_source` is untouched.
pub fn adjust_transaction(
    transaction: &StockTransaction,
    splits: &[StockSplit],
) -> StockTransaction {
    let mut adjusted = transaction.clone();
    let ratio = cumulative_ratio(transaction.transaction_date, splits);

    if ratio == Decimal::ONE {
        adjusted.adjusted_shares = None;
        adjusted.adjusted_price = None;
        adjusted.split_ratio_applied = None;
    } else {
        adjusted.adjusted_shares = Some(transaction.shares * ratio);
        adjusted.adjusted_price = Some(transaction.price_per_share / ratio);
        adjusted.split_ratio_applied = Some(ratio);
    }

    adjusted
}

#[async_trait]
impl SplitServiceTrait for SplitService {
    async fn register_split(&self, new_split: NewStockSplit) -> Result<StockSplit> {
        self.repository.create(new_split).await
    }

    fn apply_adjustments(
        &self,
        transactions: Vec<StockTransaction>,
    ) -> Result<Vec<StockTransaction>> {
        // One split lookup per (ticker, market) pair
        let mut split_lists: HashMap<(String, Market), Vec<StockSplit>> = HashMap::new();
        for tx in &transactions {
            let key = (tx.ticker.to_uppercase(), tx.market);
            if !split_lists.contains_key(&key) {
                let splits = self.repository.list_for_symbol(&key.0, tx.market)?;
                split_lists.insert(key, splits);
            }
        }

        Ok(transactions
            .into_iter()
            .map(|tx| {
                let key = (tx.ticker.to_uppercase(), tx.market);
                let splits = split_lists.get(&key).map(Vec::as_slice).unwrap_or(&[]);
                adjust_transaction(&tx, splits)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::transactions::{FxRate, TransactionType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn split(effective: NaiveDate, ratio: Decimal) -> StockSplit {
        StockSplit {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: "AAPL".to_string(),
            market: Market::Us,
            effective_date: effective,
            ratio,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    fn buy(tx_date: NaiveDate, shares: Decimal, price: Decimal) -> StockTransaction {
        StockTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: "p1".to_string(),
            transaction_date: tx_date,
            ticker: "AAPL".to_string(),
            market: Market::Us,
            transaction_type: TransactionType::Buy,
            shares,
            price_per_share: price,
            exchange_rate: FxRate::Unresolved,
            fees: dec!(1),
            adjusted_shares: None,
            adjusted_price: None,
            split_ratio_applied: None,
            is_deleted: false,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn later_splits_compound() {
        let tx = buy(date(2019, 3, 1), dec!(10), dec!(400));
        let splits = vec![
            split(date(2020, 8, 31), dec!(4)),
            split(date(2022, 6, 6), dec!(2)),
        ];
        let adjusted = adjust_transaction(&tx, &splits);
        assert_eq!(adjusted.adjusted_shares, Some(dec!(80)));
        assert_eq!(adjusted.adjusted_price, Some(dec!(50)));
        assert_eq!(adjusted.split_ratio_applied, Some(dec!(8)));
        // Invested capital does not change
        assert_eq!(adjusted.total_cost_source(), tx.total_cost_source());
    }

    #[test]
    fn split_before_transaction_has_no_effect() {
        let tx = buy(date(2021, 1, 4), dec!(10), dec!(100));
        let splits = vec![split(date(2020, 8, 31), dec!(4))];
        let adjusted = adjust_transaction(&tx, &splits);
        assert_eq!(adjusted.adjusted_shares, None);
        assert_eq!(adjusted.split_ratio_applied, None);
    }

    #[test]
    fn split_on_transaction_date_counts_as_after() {
        let tx = buy(date(2020, 8, 31), dec!(10), dec!(100));
        let splits = vec![split(date(2020, 8, 31), dec!(4))];
        let adjusted = adjust_transaction(&tx, &splits);
        assert_eq!(adjusted.adjusted_shares, Some(dec!(40)));
        assert_eq!(adjusted.adjusted_price, Some(dec!(25)));
    }

    #[test]
    fn adjustment_is_idempotent() {
        let tx = buy(date(2019, 3, 1), dec!(10), dec!(400));
        let splits = vec![split(date(2020, 8, 31), dec!(4))];
        let once = adjust_transaction(&tx, &splits);
        let twice = adjust_transaction(&once, &splits);
        assert_eq!(once.adjusted_shares, twice.adjusted_shares);
        assert_eq!(once.adjusted_price, twice.adjusted_price);
        assert_eq!(once.split_ratio_applied, twice.split_ratio_applied);
    }

    #[test]
    fn ratio_validation() {
        let bad = NewStockSplit {
            symbol: "AAPL".to_string(),
            market: Market::Us,
            effective_date: date(2020, 8, 31),
            ratio: dec!(0),
        };
        assert!(bad.validate().is_err());

        let noop = NewStockSplit {
            ratio: dec!(1),
            ..bad.clone()
        };
        assert!(noop.validate().is_err());

        let reverse = NewStockSplit {
            ratio: dec!(0.25),
            ..bad
        };
        assert!(reverse.validate().is_ok());
    }
}
