use async_trait::async_trait;
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::errors::Result;
use crate::schema::portfolios;

use super::portfolios_errors::PortfolioError;
use super::portfolios_model::{NewPortfolio, Portfolio, PortfolioDB, PortfolioUpdate};
use super::portfolios_traits::PortfolioRepositoryTrait;

/// Repository for managing portfolio rows
pub struct PortfolioRepository {
    pool: Arc<DbPool>,
}

impl PortfolioRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PortfolioRepositoryTrait for PortfolioRepository {
    fn get_for_user(&self, user_id: &str, portfolio_id: &str) -> Result<Portfolio> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| PortfolioError::DatabaseError(e.to_string()))?;

        let portfolio = portfolios::table
            .filter(portfolios::id.eq(portfolio_id))
            .filter(portfolios::user_id.eq(user_id))
            .first::<PortfolioDB>(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => PortfolioError::NotFound(format!(
                    "Portfolio with id {} not found",
                    portfolio_id
                )),
                _ => PortfolioError::DatabaseError(e.to_string()),
            })?;

        Ok(portfolio.into())
    }

    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| PortfolioError::DatabaseError(e.to_string()))?;

        let portfolio = portfolios::table
            .find(portfolio_id)
            .first::<PortfolioDB>(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => PortfolioError::NotFound(format!(
                    "Portfolio with id {} not found",
                    portfolio_id
                )),
                _ => PortfolioError::DatabaseError(e.to_string()),
            })?;

        Ok(portfolio.into())
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<Portfolio>> {
        let mut conn = get_connection(&self.pool)
            .map_err(|e| PortfolioError::DatabaseError(e.to_string()))?;

        let rows = portfolios::table
            .filter(portfolios::user_id.eq(user_id))
            .order(portfolios::name.asc())
            .load::<PortfolioDB>(&mut conn)
            .map_err(|e| PortfolioError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Portfolio::from).collect())
    }

    async fn create(&self, user_id: &str, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        new_portfolio.validate()?;

        let now = chrono::Utc::now().naive_utc();
        let portfolio_db = PortfolioDB {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: new_portfolio.name,
            base_currency: new_portfolio.base_currency.to_uppercase(),
            home_currency: new_portfolio.home_currency.to_uppercase(),
            created_at: now,
            updated_at: now,
        };

        let mut conn = get_connection(&self.pool)
            .map_err(|e| PortfolioError::DatabaseError(e.to_string()))?;

        diesel::insert_into(portfolios::table)
            .values(&portfolio_db)
            .execute(&mut conn)
            .map_err(|e| PortfolioError::DatabaseError(e.to_string()))?;

        Ok(portfolio_db.into())
    }

    async fn update(&self, user_id: &str, update: PortfolioUpdate) -> Result<Portfolio> {
        update.validate()?;

        // Ownership check before touching the row
        let existing = self.get_for_user(user_id, &update.id)?;

        let mut conn = get_connection(&self.pool)
            .map_err(|e| PortfolioError::DatabaseError(e.to_string()))?;

        let now = chrono::Utc::now().naive_utc();
        diesel::update(portfolios::table.find(&existing.id))
            .set((
                portfolios::name.eq(&update.name),
                portfolios::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .map_err(|e| PortfolioError::DatabaseError(e.to_string()))?;

        self.get_by_id(&existing.id)
    }
}
