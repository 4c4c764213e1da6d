pub(crate) mod portfolios_errors;
pub(crate) mod portfolios_model;
pub(crate) mod portfolios_repository;
pub(crate) mod portfolios_traits;

// Re-export the public interface
pub use portfolios_errors::PortfolioError;
pub use portfolios_model::{NewPortfolio, Portfolio, PortfolioDB, PortfolioUpdate};
pub use portfolios_repository::PortfolioRepository;
pub use portfolios_traits::{CurrentUserContext, PortfolioRepositoryTrait};
