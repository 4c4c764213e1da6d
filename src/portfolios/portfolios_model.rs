use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result, ValidationError};

/// Domain model representing a portfolio. Identity is immutable; metadata
/// (name, currencies) may change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub base_currency: String,
    pub home_currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for creating a new portfolio
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolio {
    pub name: String,
    pub base_currency: String,
    pub home_currency: String,
}

fn validate_currency_code(code: &str) -> Result<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::Validation(ValidationError::InvalidInput(format!(
            "Invalid currency code: {}",
            code
        ))));
    }
    Ok(())
}

impl NewPortfolio {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Portfolio name cannot be empty".to_string(),
            )));
        }
        validate_currency_code(&self.base_currency)?;
        validate_currency_code(&self.home_currency)?;
        Ok(())
    }
}

/// Input model for updating portfolio metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    pub id: String,
    pub name: String,
}

impl PortfolioUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Portfolio name cannot be empty".to_string(),
            )));
        }
        Ok(())
    }
}

/// Database model for portfolios
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::portfolios)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PortfolioDB {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub base_currency: String,
    pub home_currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<PortfolioDB> for Portfolio {
    fn from(db: PortfolioDB) -> Self {
        Portfolio {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            base_currency: db.base_currency,
            home_currency: db.home_currency,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<Portfolio> for PortfolioDB {
    fn from(domain: Portfolio) -> Self {
        Self {
            id: domain.id,
            user_id: domain.user_id,
            name: domain.name,
            base_currency: domain.base_currency,
            home_currency: domain.home_currency,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}
