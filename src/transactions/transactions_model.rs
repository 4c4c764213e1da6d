use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{Error, Result, ValidationError};

/// Trading venues the engine understands. Provider selection and FX rules
/// dispatch on this tag instead of sniffing ticker strings at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    Tw,
    Us,
    Uk,
    Eu,
}

lazy_static! {
    // Taiwan listings are numeric codes, optionally with a single letter tail
    static ref TW_TICKER: Regex = Regex::new(r"^[0-9]{4,6}[A-Z]?$").unwrap();
}

const EURONEXT_SUFFIXES: [&str; 6] = [".PA", ".AS", ".BR", ".LS", ".MI", ".IR"];

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Tw => "TW",
            Market::Us => "US",
            Market::Uk => "UK",
            Market::Eu => "EU",
        }
    }

    /// Quote currency of the venue
    pub fn currency(&self) -> &'static str {
        match self {
            Market::Tw => "TWD",
            Market::Us => "USD",
            Market::Uk => "GBP",
            Market::Eu => "EUR",
        }
    }

    /// Instruments already priced in the portfolio home currency carry an
    /// implicit rate of 1 and never enter FX resolution.
    pub fn is_zero_fx(&self, home_currency: &str) -> bool {
        self.currency().eq_ignore_ascii_case(home_currency)
    }

    /// Classify a ticker by shape when no explicit market tag is available.
    pub fn from_ticker(ticker: &str) -> Market {
        let upper = ticker.to_uppercase();
        if TW_TICKER.is_match(&upper) {
            return Market::Tw;
        }
        if upper.ends_with(".L") {
            return Market::Uk;
        }
        if EURONEXT_SUFFIXES.iter().any(|s| upper.ends_with(s)) {
            return Market::Eu;
        }
        Market::Us
    }
}

impl From<&str> for Market {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "TW" => Market::Tw,
            "UK" => Market::Uk,
            "EU" => Market::Eu,
            _ => Market::Us,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Buy,
    Sell,
    Split,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "BUY",
            TransactionType::Sell => "SELL",
            TransactionType::Split => "SPLIT",
            TransactionType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl From<&str> for TransactionType {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "BUY" => TransactionType::Buy,
            "SELL" => TransactionType::Sell,
            "SPLIT" => TransactionType::Split,
            _ => TransactionType::Adjustment,
        }
    }
}

/// Exchange-rate field of a transaction. `Unresolved` is a first-class
/// marker meaning "must still be auto-filled from the transaction-date
/// cache", not merely an absent value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "rate")]
pub enum FxRate {
    Resolved(Decimal),
    Unresolved,
}

impl FxRate {
    /// A stored rate <= 0 is indistinguishable from "not configured" and is
    /// treated as absent.
    pub fn from_stored(raw: Option<Decimal>) -> Self {
        match raw {
            Some(rate) if rate > Decimal::ZERO => FxRate::Resolved(rate),
            _ => FxRate::Unresolved,
        }
    }

    pub fn resolved(&self) -> Option<Decimal> {
        match self {
            FxRate::Resolved(rate) => Some(*rate),
            FxRate::Unresolved => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, FxRate::Unresolved)
    }
}

/// Domain model representing a stock transaction.
///
/// The `adjusted_*` fields are a derived view produced by split
/// adjustment; they are never persisted and always recomputed from the
/// raw fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTransaction {
    pub id: String,
    pub portfolio_id: String,
    pub transaction_date: NaiveDate,
    pub ticker: String,
    pub market: Market,
    pub transaction_type: TransactionType,
    pub shares: Decimal,
    pub price_per_share: Decimal,
    pub exchange_rate: FxRate,
    pub fees: Decimal,
    pub adjusted_shares: Option<Decimal>,
    pub adjusted_price: Option<Decimal>,
    pub split_ratio_applied: Option<Decimal>,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl StockTransaction {
    /// Invested capital in the instrument's own currency. Split adjustment
    /// never changes this.
    pub fn total_cost_source(&self) -> Decimal {
        self.shares * self.price_per_share + self.fees
    }

    /// Invested capital in home currency; defined only once an exchange
    /// rate is known.
    pub fn total_cost_home(&self) -> Option<Decimal> {
        self.exchange_rate
            .resolved()
            .map(|rate| self.total_cost_source() * rate)
    }

    /// Share count after split adjustment, falling back to the raw count.
    pub fn effective_shares(&self) -> Decimal {
        self.adjusted_shares.unwrap_or(self.shares)
    }

    /// Per-share price after split adjustment, falling back to the raw price.
    pub fn effective_price(&self) -> Decimal {
        self.adjusted_price.unwrap_or(self.price_per_share)
    }

    /// Whether this transaction moves money across the portfolio boundary.
    pub fn is_cash_flow(&self) -> bool {
        matches!(
            self.transaction_type,
            TransactionType::Buy | TransactionType::Sell
        )
    }

    /// Signed external cash flow in source currency, portfolio perspective:
    /// money entering the portfolio is positive.
    pub fn cash_flow_source(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Buy => self.shares * self.price_per_share + self.fees,
            TransactionType::Sell => -(self.shares * self.price_per_share - self.fees),
            _ => Decimal::ZERO,
        }
    }
}

/// Input model for recording a new transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStockTransaction {
    pub portfolio_id: String,
    pub transaction_date: NaiveDate,
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<Market>,
    pub transaction_type: TransactionType,
    pub shares: Decimal,
    pub price_per_share: Decimal,
    pub exchange_rate: Option<Decimal>,
    pub fees: Decimal,
}

impl NewStockTransaction {
    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Ticker cannot be empty".to_string(),
            )));
        }
        if self.shares <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Shares must be positive".to_string(),
            )));
        }
        if self.price_per_share < Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Price per share cannot be negative".to_string(),
            )));
        }
        if self.fees < Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Fees cannot be negative".to_string(),
            )));
        }
        Ok(())
    }

    pub fn market_or_inferred(&self) -> Market {
        self.market.unwrap_or_else(|| Market::from_ticker(&self.ticker))
    }
}

/// Database model for stock transactions
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::stock_transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StockTransactionDB {
    pub id: String,
    pub portfolio_id: String,
    pub transaction_date: NaiveDate,
    pub ticker: String,
    pub market: String,
    pub transaction_type: String,
    pub shares: String,
    pub price_per_share: String,
    pub exchange_rate: Option<String>,
    pub fees: String,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<StockTransactionDB> for StockTransaction {
    fn from(db: StockTransactionDB) -> Self {
        let stored_rate = db
            .exchange_rate
            .as_deref()
            .and_then(|raw| Decimal::from_str(raw).ok());
        StockTransaction {
            id: db.id,
            portfolio_id: db.portfolio_id,
            transaction_date: db.transaction_date,
            ticker: db.ticker,
            market: Market::from(db.market.as_str()),
            transaction_type: TransactionType::from(db.transaction_type.as_str()),
            shares: Decimal::from_str(&db.shares).unwrap_or_default(),
            price_per_share: Decimal::from_str(&db.price_per_share).unwrap_or_default(),
            exchange_rate: FxRate::from_stored(stored_rate),
            fees: Decimal::from_str(&db.fees).unwrap_or_default(),
            adjusted_shares: None,
            adjusted_price: None,
            split_ratio_applied: None,
            is_deleted: db.is_deleted,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<StockTransaction> for StockTransactionDB {
    fn from(domain: StockTransaction) -> Self {
        Self {
            id: domain.id,
            portfolio_id: domain.portfolio_id,
            transaction_date: domain.transaction_date,
            ticker: domain.ticker,
            market: domain.market.as_str().to_string(),
            transaction_type: domain.transaction_type.as_str().to_string(),
            shares: domain.shares.to_string(),
            price_per_share: domain.price_per_share.to_string(),
            exchange_rate: domain.exchange_rate.resolved().map(|r| r.to_string()),
            fees: domain.fees.to_string(),
            is_deleted: domain.is_deleted,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn market_dispatch_by_ticker_shape() {
        assert_eq!(Market::from_ticker("2330"), Market::Tw);
        assert_eq!(Market::from_ticker("00878"), Market::Tw);
        assert_eq!(Market::from_ticker("VOD.L"), Market::Uk);
        assert_eq!(Market::from_ticker("AIR.PA"), Market::Eu);
        assert_eq!(Market::from_ticker("ASML.AS"), Market::Eu);
        assert_eq!(Market::from_ticker("AAPL"), Market::Us);
    }

    #[test]
    fn zero_fx_matches_home_currency() {
        assert!(Market::Tw.is_zero_fx("TWD"));
        assert!(Market::Tw.is_zero_fx("twd"));
        assert!(!Market::Us.is_zero_fx("TWD"));
    }

    #[test]
    fn stored_rate_at_or_below_zero_is_unresolved() {
        assert_eq!(
            FxRate::from_stored(Some(dec!(31.5))),
            FxRate::Resolved(dec!(31.5))
        );
        assert_eq!(FxRate::from_stored(Some(Decimal::ZERO)), FxRate::Unresolved);
        assert_eq!(FxRate::from_stored(Some(dec!(-1))), FxRate::Unresolved);
        assert_eq!(FxRate::from_stored(None), FxRate::Unresolved);
    }

    #[test]
    fn total_cost_uses_raw_fields() {
        let db = StockTransactionDB {
            id: "t1".to_string(),
            portfolio_id: "p1".to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2023, 5, 2).unwrap(),
            ticker: "AAPL".to_string(),
            market: "US".to_string(),
            transaction_type: "BUY".to_string(),
            shares: "10".to_string(),
            price_per_share: "150".to_string(),
            exchange_rate: Some("31.5".to_string()),
            fees: "5".to_string(),
            is_deleted: false,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: chrono::Utc::now().naive_utc(),
        };
        let tx = StockTransaction::from(db);
        assert_eq!(tx.total_cost_source(), dec!(1505));
        assert_eq!(tx.total_cost_home(), Some(dec!(47407.5)));
        assert_eq!(tx.cash_flow_source(), dec!(1505));
    }
}
