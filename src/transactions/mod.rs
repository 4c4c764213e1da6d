pub(crate) mod transactions_errors;
pub(crate) mod transactions_model;
pub(crate) mod transactions_repository;
pub(crate) mod transactions_traits;

// Re-export the public interface
pub use transactions_errors::TransactionError;
pub use transactions_model::{
    FxRate, Market, NewStockTransaction, StockTransaction, StockTransactionDB, TransactionType,
};
pub use transactions_repository::TransactionRepository;
pub use transactions_traits::TransactionRepositoryTrait;
