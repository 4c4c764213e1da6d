pub(crate) mod snapshot_errors;
pub(crate) mod snapshot_model;
pub(crate) mod snapshot_repository;
pub(crate) mod snapshot_service;
pub(crate) mod snapshot_traits;
pub(crate) mod valuation;

#[cfg(test)]
mod snapshot_service_tests;

// Re-export the public interface
pub use snapshot_errors::SnapshotError;
pub use snapshot_model::{TransactionPortfolioSnapshot, TransactionPortfolioSnapshotDB};
pub use snapshot_repository::SnapshotRepository;
pub use snapshot_service::SnapshotService;
pub use snapshot_traits::{SnapshotRepositoryTrait, SnapshotServiceTrait};
pub use valuation::portfolio_value;
