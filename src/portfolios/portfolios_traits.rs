use async_trait::async_trait;

use super::portfolios_model::{NewPortfolio, Portfolio, PortfolioUpdate};
use crate::errors::Result;

/// Supplies the already-authenticated user id. The engine never
/// authenticates; it only scopes queries by this id.
pub trait CurrentUserContext: Send + Sync {
    fn user_id(&self) -> &str;
}

/// Trait defining the contract for portfolio repository operations.
#[async_trait]
pub trait PortfolioRepositoryTrait: Send + Sync {
    /// Ownership-scoped lookup; absent or foreign portfolios surface as NotFound.
    fn get_for_user(&self, user_id: &str, portfolio_id: &str) -> Result<Portfolio>;
    /// Internal lookup used by services that already validated ownership.
    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio>;
    fn list_for_user(&self, user_id: &str) -> Result<Vec<Portfolio>>;
    async fn create(&self, user_id: &str, new_portfolio: NewPortfolio) -> Result<Portfolio>;
    async fn update(&self, user_id: &str, update: PortfolioUpdate) -> Result<Portfolio>;
}
