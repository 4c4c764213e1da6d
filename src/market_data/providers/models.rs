use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single historical price as returned by a provider. `actual_date` is
/// the trading day the price belongs to, which may precede the requested
/// date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPrice {
    pub price: Decimal,
    pub actual_date: NaiveDate,
    pub currency: String,
}

/// A single historical exchange rate as returned by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRate {
    pub rate: Decimal,
    pub actual_date: NaiveDate,
}
