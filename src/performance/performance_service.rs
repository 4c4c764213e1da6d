use async_trait::async_trait;
use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{Error, Result, ValidationError};
use crate::market_data::{HistoricalExchangeRate, MarketDataServiceTrait, Resolution};
use crate::portfolios::{CurrentUserContext, Portfolio, PortfolioRepositoryTrait};
use crate::snapshots::{portfolio_value, SnapshotServiceTrait};
use crate::splits::SplitServiceTrait;
use crate::transactions::{
    Market, StockTransaction, TransactionRepositoryTrait, TransactionType,
};

use super::performance_model::{
    AggregatePerformance, MissingExchangeRate, MissingPriceCollector, PortfolioPerformance,
    ReturnCashFlow, ReturnValuationSnapshot, XirrResult, PRICE_TYPE_EXCHANGE_RATE,
    PRICE_TYPE_YEAR_END, PRICE_TYPE_YEAR_START,
};
use super::returns_calculator;

#[async_trait]
pub trait PerformanceServiceTrait: Send + Sync {
    /// Year performance for one portfolio. Unresolved inputs never fail the
    /// calculation; they are reported in the result's missing list.
    async fn calculate_year_performance(
        &self,
        user: &dyn CurrentUserContext,
        portfolio_id: &str,
        year: i32,
    ) -> Result<PortfolioPerformance>;

    /// Combined performance across the user's portfolios sharing
    /// `home_currency`, with the missing lists unioned under the same
    /// deduplication rule.
    async fn calculate_aggregate_performance(
        &self,
        user: &dyn CurrentUserContext,
        year: i32,
        home_currency: &str,
    ) -> Result<AggregatePerformance>;

    /// XIRR over a date range. Transactions whose exchange rate cannot be
    /// auto-filled are excluded from the series and reported.
    async fn calculate_xirr(
        &self,
        user: &dyn CurrentUserContext,
        portfolio_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<XirrResult>;
}

/// Assembles transactions, split adjustment, cache resolution, and
/// snapshots into the return calculations. All repository and cache
/// access happens sequentially within a single call; the shared store
/// handle is never used concurrently.
pub struct PerformanceService {
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    split_service: Arc<dyn SplitServiceTrait>,
    snapshot_service: Arc<dyn SnapshotServiceTrait>,
    market_data_service: Arc<dyn MarketDataServiceTrait>,
}

struct YearInputs {
    start_value: Decimal,
    end_value: Decimal,
    flows: Vec<ReturnCashFlow>,
    snapshots: Vec<ReturnValuationSnapshot>,
}

fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year, 12, 31);
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(Error::Validation(ValidationError::InvalidDateRange(
            format!("Invalid year: {}", year),
        ))),
    }
}

/// Net split-adjusted share counts per (ticker, market) over the
/// transactions selected by `include`, sorted by ticker for deterministic
/// resolution order.
fn holdings_where<F>(
    transactions: &[StockTransaction],
    include: F,
) -> Vec<((String, Market), Decimal)>
where
    F: Fn(&StockTransaction) -> bool,
{
    let mut holdings: HashMap<(String, Market), Decimal> = HashMap::new();
    for tx in transactions.iter().filter(|tx| include(tx)) {
        let delta = match tx.transaction_type {
            TransactionType::Buy | TransactionType::Adjustment => tx.effective_shares(),
            TransactionType::Sell => -tx.effective_shares(),
            TransactionType::Split => Decimal::ZERO,
        };
        *holdings
            .entry((tx.ticker.to_uppercase(), tx.market))
            .or_default() += delta;
    }

    let mut entries: Vec<((String, Market), Decimal)> = holdings
        .into_iter()
        .filter(|(_, shares)| !shares.is_zero())
        .collect();
    entries.sort_by(|a, b| a.0 .0.cmp(&b.0 .0));
    entries
}

/// Merge per-portfolio snapshot series into one aggregate series. Between
/// its own events a portfolio holds at its last value-after, so the
/// aggregate boundary values at an event add the other portfolios'
/// current values.
fn merge_snapshot_series(
    start_values: &[Decimal],
    series: &[Vec<ReturnValuationSnapshot>],
) -> Vec<ReturnValuationSnapshot> {
    let mut current: Vec<Decimal> = start_values.to_vec();

    let mut events: Vec<(NaiveDate, usize, &ReturnValuationSnapshot)> = series
        .iter()
        .enumerate()
        .flat_map(|(index, snapshots)| snapshots.iter().map(move |s| (s.date, index, s)))
        .collect();
    events.sort_by(|a, b| a.0.cmp(&b.0));

    let mut merged = Vec::with_capacity(events.len());
    for (date, index, snapshot) in events {
        let others: Decimal = current
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, value)| *value)
            .sum();
        merged.push(ReturnValuationSnapshot {
            date,
            value_before: snapshot.value_before + others,
            value_after: snapshot.value_after + others,
        });
        current[index] = snapshot.value_after;
    }
    merged
}

impl PerformanceService {
    pub fn new(
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        split_service: Arc<dyn SplitServiceTrait>,
        snapshot_service: Arc<dyn SnapshotServiceTrait>,
        market_data_service: Arc<dyn MarketDataServiceTrait>,
    ) -> Self {
        Self {
            portfolio_repository,
            transaction_repository,
            split_service,
            snapshot_service,
            market_data_service,
        }
    }

    /// Value a holdings set at the year-end prices of `price_year`,
    /// converted to home currency. Unresolved inputs go to `missing` and
    /// their positions are skipped.
    async fn value_holdings(
        &self,
        portfolio: &Portfolio,
        holdings: &[((String, Market), Decimal)],
        price_year: i32,
        price_type: &str,
        missing: &mut MissingPriceCollector,
    ) -> Result<Decimal> {
        let price_date = NaiveDate::from_ymd_opt(price_year, 12, 31).ok_or_else(|| {
            Error::Validation(ValidationError::InvalidDateRange(format!(
                "Invalid year: {}",
                price_year
            )))
        })?;

        let mut total = Decimal::ZERO;
        for ((ticker, market), shares) in holdings {
            let price = match self
                .market_data_service
                .get_or_fetch_year_end_price(ticker, *market, price_year)
                .await?
            {
                Resolution::Resolved(resolved) => resolved.value,
                Resolution::Unresolved => {
                    missing.push(ticker, price_type, price_date);
                    continue;
                }
            };

            let rate = if market.is_zero_fx(&portfolio.home_currency) {
                Decimal::ONE
            } else {
                match self
                    .market_data_service
                    .get_or_fetch_year_end_rate(
                        market.currency(),
                        &portfolio.home_currency,
                        price_year,
                    )
                    .await?
                {
                    Resolution::Resolved(resolved) => resolved.value,
                    Resolution::Unresolved => {
                        let pair = HistoricalExchangeRate::make_pair(
                            market.currency(),
                            &portfolio.home_currency,
                        );
                        missing.push(&pair, PRICE_TYPE_EXCHANGE_RATE, price_date);
                        continue;
                    }
                }
            };

            total += *shares * price * rate;
        }

        Ok(total)
    }

    /// Rate converting a transaction's source amount to home currency:
    /// implicit 1 for zero-FX markets, then the stored rate, then the
    /// transaction-date cache. `None` when even auto-fill fails.
    async fn transaction_home_rate(
        &self,
        portfolio: &Portfolio,
        transaction: &StockTransaction,
    ) -> Result<Option<Decimal>> {
        if transaction.market.is_zero_fx(&portfolio.home_currency) {
            return Ok(Some(Decimal::ONE));
        }
        if let Some(rate) = transaction.exchange_rate.resolved() {
            return Ok(Some(rate));
        }

        match self
            .market_data_service
            .get_or_fetch_rate_on_date(
                transaction.market.currency(),
                &portfolio.home_currency,
                transaction.transaction_date,
            )
            .await?
        {
            Resolution::Resolved(resolved) => Ok(Some(resolved.value)),
            Resolution::Unresolved => Ok(None),
        }
    }

    async fn assemble_year_inputs(
        &self,
        portfolio: &Portfolio,
        year: i32,
        missing: &mut MissingPriceCollector,
    ) -> Result<YearInputs> {
        let (period_start, period_end) = year_bounds(year)?;

        let all = self
            .transaction_repository
            .list_for_portfolio(&portfolio.id)?;
        let adjusted = self.split_service.apply_adjustments(all)?;

        let opening = holdings_where(&adjusted, |tx| tx.transaction_date < period_start);
        let closing = holdings_where(&adjusted, |tx| tx.transaction_date <= period_end);

        let start_value = self
            .value_holdings(portfolio, &opening, year - 1, PRICE_TYPE_YEAR_START, missing)
            .await?;
        let end_value = self
            .value_holdings(portfolio, &closing, year, PRICE_TYPE_YEAR_END, missing)
            .await?;

        let mut flows = Vec::new();
        for tx in adjusted.iter().filter(|tx| {
            tx.is_cash_flow()
                && tx.transaction_date >= period_start
                && tx.transaction_date <= period_end
        }) {
            match self.transaction_home_rate(portfolio, tx).await? {
                Some(rate) => flows.push(ReturnCashFlow {
                    date: tx.transaction_date,
                    amount: tx.cash_flow_source() * rate,
                }),
                None => {
                    let pair = HistoricalExchangeRate::make_pair(
                        tx.market.currency(),
                        &portfolio.home_currency,
                    );
                    missing.push(&pair, PRICE_TYPE_EXCHANGE_RATE, tx.transaction_date);
                }
            }
        }

        let snapshots = self
            .snapshot_service
            .get_snapshots(&portfolio.id, period_start, period_end)?
            .into_iter()
            .map(|s| ReturnValuationSnapshot {
                date: s.snapshot_date,
                value_before: s.value_before,
                value_after: s.value_after,
            })
            .collect();

        Ok(YearInputs {
            start_value,
            end_value,
            flows,
            snapshots,
        })
    }

    fn returns_from_inputs(
        portfolio_id: &str,
        year: i32,
        inputs: &YearInputs,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> (Option<Decimal>, Option<Decimal>) {
        let dietz = returns_calculator::modified_dietz(
            inputs.start_value,
            inputs.end_value,
            &inputs.flows,
            period_start,
            period_end,
        );

        let twr = if inputs.snapshots.is_empty() && !inputs.flows.is_empty() {
            warn!(
                "Portfolio {} has cash flows but no snapshots in {}; TWR unavailable",
                portfolio_id, year
            );
            None
        } else {
            returns_calculator::time_weighted(
                inputs.start_value,
                inputs.end_value,
                &inputs.snapshots,
            )
        };

        (dietz, twr)
    }
}

#[async_trait]
impl PerformanceServiceTrait for PerformanceService {
    async fn calculate_year_performance(
        &self,
        user: &dyn CurrentUserContext,
        portfolio_id: &str,
        year: i32,
    ) -> Result<PortfolioPerformance> {
        let portfolio = self
            .portfolio_repository
            .get_for_user(user.user_id(), portfolio_id)?;
        let (period_start, period_end) = year_bounds(year)?;

        let mut missing = MissingPriceCollector::new();
        let inputs = self
            .assemble_year_inputs(&portfolio, year, &mut missing)
            .await?;

        let (dietz, twr) =
            Self::returns_from_inputs(portfolio_id, year, &inputs, period_start, period_end);
        let net_cash_flow: Decimal = inputs.flows.iter().map(|f| f.amount).sum();

        Ok(PortfolioPerformance {
            portfolio_id: portfolio.id,
            year,
            currency: portfolio.home_currency,
            start_value: inputs.start_value,
            end_value: inputs.end_value,
            net_cash_flow,
            modified_dietz_return: dietz,
            time_weighted_return: twr,
            is_complete: missing.is_empty(),
            missing_prices: missing.into_vec(),
        })
    }

    async fn calculate_aggregate_performance(
        &self,
        user: &dyn CurrentUserContext,
        year: i32,
        home_currency: &str,
    ) -> Result<AggregatePerformance> {
        let (period_start, period_end) = year_bounds(year)?;

        let portfolios: Vec<Portfolio> = self
            .portfolio_repository
            .list_for_user(user.user_id())?
            .into_iter()
            .filter(|p| p.home_currency.eq_ignore_ascii_case(home_currency))
            .collect();

        if portfolios.is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "No portfolios with home currency {}",
                home_currency
            ))));
        }

        let mut missing = MissingPriceCollector::new();
        let mut start_values = Vec::with_capacity(portfolios.len());
        let mut end_value = Decimal::ZERO;
        let mut flows: Vec<ReturnCashFlow> = Vec::new();
        let mut series: Vec<Vec<ReturnValuationSnapshot>> = Vec::with_capacity(portfolios.len());

        // One portfolio at a time; the shared store handle must not see
        // concurrent use.
        for portfolio in &portfolios {
            let inputs = self
                .assemble_year_inputs(portfolio, year, &mut missing)
                .await?;
            start_values.push(inputs.start_value);
            end_value += inputs.end_value;
            flows.extend(inputs.flows);
            series.push(inputs.snapshots);
        }

        let start_value: Decimal = start_values.iter().copied().sum();
        flows.sort_by_key(|flow| flow.date);
        let merged_snapshots = merge_snapshot_series(&start_values, &series);

        let dietz = returns_calculator::modified_dietz(
            start_value,
            end_value,
            &flows,
            period_start,
            period_end,
        );
        let twr = if merged_snapshots.is_empty() && !flows.is_empty() {
            warn!(
                "Aggregate for user {} has cash flows but no snapshots in {}; TWR unavailable",
                user.user_id(),
                year
            );
            None
        } else {
            returns_calculator::time_weighted(start_value, end_value, &merged_snapshots)
        };

        Ok(AggregatePerformance {
            user_id: user.user_id().to_string(),
            year,
            currency: home_currency.to_uppercase(),
            portfolio_ids: portfolios.iter().map(|p| p.id.clone()).collect(),
            start_value,
            end_value,
            modified_dietz_return: dietz,
            time_weighted_return: twr,
            is_complete: missing.is_empty(),
            missing_prices: missing.into_vec(),
        })
    }

    async fn calculate_xirr(
        &self,
        user: &dyn CurrentUserContext,
        portfolio_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<XirrResult> {
        let portfolio = self
            .portfolio_repository
            .get_for_user(user.user_id(), portfolio_id)?;

        if from >= to {
            return Err(Error::Validation(ValidationError::InvalidDateRange(
                format!("{} is not before {}", from, to),
            )));
        }

        let in_range = self
            .transaction_repository
            .list_in_range(portfolio_id, from, to)?;

        let mut flows: Vec<ReturnCashFlow> = Vec::new();
        let mut missing_exchange_rates: Vec<MissingExchangeRate> = Vec::new();

        for tx in in_range.iter().filter(|tx| tx.is_cash_flow()) {
            match self.transaction_home_rate(&portfolio, tx).await? {
                Some(rate) => {
                    // Investor perspective: money put in is negative
                    flows.push(ReturnCashFlow {
                        date: tx.transaction_date,
                        amount: -tx.cash_flow_source() * rate,
                    });
                }
                None => {
                    missing_exchange_rates.push(MissingExchangeRate {
                        transaction_id: tx.id.clone(),
                        currency_pair: HistoricalExchangeRate::make_pair(
                            tx.market.currency(),
                            &portfolio.home_currency,
                        ),
                        date: tx.transaction_date,
                    });
                }
            }
        }

        let flows_used = flows.len();

        let all = self
            .transaction_repository
            .list_for_portfolio(portfolio_id)?;
        let adjusted = self.split_service.apply_adjustments(all)?;
        let through: Vec<StockTransaction> = adjusted
            .into_iter()
            .filter(|tx| tx.transaction_date <= to)
            .collect();
        let end_value = portfolio_value(&through, &portfolio.home_currency);
        if end_value > Decimal::ZERO {
            flows.push(ReturnCashFlow {
                date: to,
                amount: end_value,
            });
        }

        Ok(XirrResult {
            portfolio_id: portfolio.id,
            rate: returns_calculator::xirr(&flows),
            flows_used,
            missing_exchange_rates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn merged_series_adds_the_other_portfolios_current_values() {
        let start_values = [dec!(1000), dec!(500)];
        let series = vec![
            vec![ReturnValuationSnapshot {
                date: date(2023, 6, 1),
                value_before: dec!(1100),
                value_after: dec!(1600),
            }],
            vec![ReturnValuationSnapshot {
                date: date(2023, 9, 1),
                value_before: dec!(550),
                value_after: dec!(800),
            }],
        ];

        let merged = merge_snapshot_series(&start_values, &series);
        assert_eq!(merged.len(), 2);
        // First event: portfolio 1 still sits at its 500 start
        assert_eq!(merged[0].value_before, dec!(1600));
        assert_eq!(merged[0].value_after, dec!(2100));
        // Second event: portfolio 0 now holds at 1600
        assert_eq!(merged[1].value_before, dec!(2150));
        assert_eq!(merged[1].value_after, dec!(2400));
    }

    #[test]
    fn holdings_ignore_positions_that_net_to_zero() {
        use crate::transactions::FxRate;

        let base = StockTransaction {
            id: "t1".to_string(),
            portfolio_id: "p1".to_string(),
            transaction_date: date(2023, 1, 10),
            ticker: "2330".to_string(),
            market: Market::Tw,
            transaction_type: TransactionType::Buy,
            shares: dec!(100),
            price_per_share: dec!(500),
            exchange_rate: FxRate::Unresolved,
            fees: Decimal::ZERO,
            adjusted_shares: None,
            adjusted_price: None,
            split_ratio_applied: None,
            is_deleted: false,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: chrono::Utc::now().naive_utc(),
        };
        let mut sell = base.clone();
        sell.id = "t2".to_string();
        sell.transaction_date = date(2023, 3, 1);
        sell.transaction_type = TransactionType::Sell;

        let holdings = holdings_where(&[base, sell], |_| true);
        assert!(holdings.is_empty());
    }
}
