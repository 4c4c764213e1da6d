use async_trait::async_trait;

use super::splits_model::{NewStockSplit, StockSplit};
use crate::errors::Result;
use crate::transactions::{Market, StockTransaction};

/// Trait defining the contract for split repository operations.
#[async_trait]
pub trait SplitRepositoryTrait: Send + Sync {
    /// Splits for a (symbol, market) pair, ordered by effective date ascending.
    fn list_for_symbol(&self, symbol: &str, market: Market) -> Result<Vec<StockSplit>>;
    async fn create(&self, new_split: NewStockSplit) -> Result<StockSplit>;
}

/// Trait defining the contract for split adjustment operations.
#[async_trait]
pub trait SplitServiceTrait: Send + Sync {
    async fn register_split(&self, new_split: NewStockSplit) -> Result<StockSplit>;
    /// Populate the derived adjusted view on every transaction.
    fn apply_adjustments(
        &self,
        transactions: Vec<StockTransaction>,
    ) -> Result<Vec<StockTransaction>>;
}
