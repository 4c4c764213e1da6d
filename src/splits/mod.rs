pub(crate) mod splits_errors;
pub(crate) mod splits_model;
pub(crate) mod splits_repository;
pub(crate) mod splits_service;
pub(crate) mod splits_traits;

// Re-export the public interface
pub use splits_errors::SplitError;
pub use splits_model::{NewStockSplit, StockSplit, StockSplitDB};
pub use splits_repository::SplitRepository;
pub use splits_service::{adjust_transaction, cumulative_ratio, SplitService};
pub use splits_traits::{SplitRepositoryTrait, SplitServiceTrait};
