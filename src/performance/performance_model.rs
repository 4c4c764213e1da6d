use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Price types reported in missing-input entries
pub const PRICE_TYPE_YEAR_START: &str = "YearStart";
pub const PRICE_TYPE_YEAR_END: &str = "YearEnd";
pub const PRICE_TYPE_EXCHANGE_RATE: &str = "ExchangeRate";

/// A signed external cash flow; positive means money entered the
/// portfolio. The time component is deliberately absent: weighting is
/// date-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnCashFlow {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// Valuation pair around a cash-flow event, the TWR analogue of a cash
/// flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnValuationSnapshot {
    pub date: NaiveDate,
    pub value_before: Decimal,
    pub value_after: Decimal,
}

/// An input the engine could not resolve. Calculations carry on without
/// it; the caller supplies a manual value and retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingPrice {
    pub ticker: String,
    pub price_type: String,
    pub date: NaiveDate,
}

/// Accumulates missing inputs, deduplicated case-insensitively on
/// (ticker, price type) plus the date.
#[derive(Debug, Default)]
pub struct MissingPriceCollector {
    entries: Vec<MissingPrice>,
    seen: HashSet<(String, String, NaiveDate)>,
}

impl MissingPriceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ticker: &str, price_type: &str, date: NaiveDate) {
        let key = (
            ticker.to_uppercase(),
            price_type.to_uppercase(),
            date,
        );
        if self.seen.insert(key) {
            self.entries.push(MissingPrice {
                ticker: ticker.to_string(),
                price_type: price_type.to_string(),
                date,
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_vec(self) -> Vec<MissingPrice> {
        self.entries
    }
}

/// Year performance of a single portfolio. `is_complete` is false when
/// any required input was unresolved; the returns are then computed from
/// the resolvable subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPerformance {
    pub portfolio_id: String,
    pub year: i32,
    pub currency: String,
    pub start_value: Decimal,
    pub end_value: Decimal,
    pub net_cash_flow: Decimal,
    pub modified_dietz_return: Option<Decimal>,
    pub time_weighted_return: Option<Decimal>,
    pub is_complete: bool,
    pub missing_prices: Vec<MissingPrice>,
}

/// Combined performance across every portfolio of a user that shares the
/// given home currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatePerformance {
    pub user_id: String,
    pub year: i32,
    pub currency: String,
    pub portfolio_ids: Vec<String>,
    pub start_value: Decimal,
    pub end_value: Decimal,
    pub modified_dietz_return: Option<Decimal>,
    pub time_weighted_return: Option<Decimal>,
    pub is_complete: bool,
    pub missing_prices: Vec<MissingPrice>,
}

/// A transaction whose exchange-rate auto-fill failed; its cash flow was
/// excluded from the XIRR series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingExchangeRate {
    pub transaction_id: String,
    pub currency_pair: String,
    pub date: NaiveDate,
}

/// XIRR over a date range, investor perspective (purchases negative).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XirrResult {
    pub portfolio_id: String,
    pub rate: Option<Decimal>,
    pub flows_used: usize,
    pub missing_exchange_rates: Vec<MissingExchangeRate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn missing_prices_dedup_case_insensitively() {
        let mut collector = MissingPriceCollector::new();
        collector.push("AAPL", "YearEnd", date(2023, 12, 31));
        collector.push("aapl", "yearend", date(2023, 12, 31));
        collector.push("AAPL", "YearEnd", date(2022, 12, 31));

        let entries = collector.into_vec();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ticker, "AAPL");
        assert_eq!(entries[0].date, date(2023, 12, 31));
        assert_eq!(entries[1].date, date(2022, 12, 31));
    }
}
