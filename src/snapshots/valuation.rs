use log::warn;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::transactions::{Market, StockTransaction, TransactionType};

#[derive(Debug, Default)]
struct HoldingState {
    shares: Decimal,
    last_price: Decimal,
    last_rate: Option<Decimal>,
}

/// Value a portfolio from its transaction stream alone, in home currency.
///
/// Each ticker is valued at its last traded price on or before the
/// boundary, using split-adjusted shares and prices, converted with the
/// most recent known exchange rate for that ticker (implicit 1 for
/// instruments already priced in home currency). No market data is
/// consulted, so the result is deterministic for a given transaction set.
pub fn portfolio_value(transactions: &[StockTransaction], home_currency: &str) -> Decimal {
    let mut holdings: HashMap<(String, Market), HoldingState> = HashMap::new();

    for tx in transactions {
        let key = (tx.ticker.to_uppercase(), tx.market);
        let state = holdings.entry(key).or_default();

        match tx.transaction_type {
            TransactionType::Buy => {
                state.shares += tx.effective_shares();
                state.last_price = tx.effective_price();
            }
            TransactionType::Sell => {
                state.shares -= tx.effective_shares();
                state.last_price = tx.effective_price();
            }
            // Adjustment rows move share counts without a cash flow
            TransactionType::Adjustment => {
                state.shares += tx.effective_shares();
                if tx.effective_price() > Decimal::ZERO {
                    state.last_price = tx.effective_price();
                }
            }
            // Split rows are superseded by the split registry's derived view
            TransactionType::Split => {}
        }

        if tx.market.is_zero_fx(home_currency) {
            state.last_rate = Some(Decimal::ONE);
        } else if let Some(rate) = tx.exchange_rate.resolved() {
            state.last_rate = Some(rate);
        }
    }

    holdings
        .into_iter()
        .filter(|(_, state)| !state.shares.is_zero())
        .map(|((ticker, _), state)| {
            let rate = state.last_rate.unwrap_or_else(|| {
                warn!(
                    "No exchange rate observed for {} while valuing portfolio, assuming 1",
                    ticker
                );
                Decimal::ONE
            });
            state.shares * state.last_price * rate
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::transactions::FxRate;

    fn tx(
        tx_type: TransactionType,
        ticker: &str,
        market: Market,
        shares: Decimal,
        price: Decimal,
        rate: FxRate,
    ) -> StockTransaction {
        StockTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: "p1".to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2023, 5, 2).unwrap(),
            ticker: ticker.to_string(),
            market,
            transaction_type: tx_type,
            shares,
            price_per_share: price,
            exchange_rate: rate,
            fees: Decimal::ZERO,
            adjusted_shares: None,
            adjusted_price: None,
            split_ratio_applied: None,
            is_deleted: false,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn values_holdings_at_last_traded_price() {
        let transactions = vec![
            tx(
                TransactionType::Buy,
                "2330",
                Market::Tw,
                dec!(100),
                dec!(500),
                FxRate::Unresolved,
            ),
            tx(
                TransactionType::Buy,
                "2330",
                Market::Tw,
                dec!(100),
                dec!(550),
                FxRate::Unresolved,
            ),
        ];
        // 200 shares at the latest price of 550, TWD is home
        assert_eq!(portfolio_value(&transactions, "TWD"), dec!(110000));
    }

    #[test]
    fn converts_foreign_holdings_with_last_known_rate() {
        let transactions = vec![tx(
            TransactionType::Buy,
            "AAPL",
            Market::Us,
            dec!(10),
            dec!(150),
            FxRate::Resolved(dec!(31)),
        )];
        assert_eq!(portfolio_value(&transactions, "TWD"), dec!(46500));
    }

    #[test]
    fn sells_reduce_the_position() {
        let transactions = vec![
            tx(
                TransactionType::Buy,
                "2330",
                Market::Tw,
                dec!(100),
                dec!(500),
                FxRate::Unresolved,
            ),
            tx(
                TransactionType::Sell,
                "2330",
                Market::Tw,
                dec!(100),
                dec!(600),
                FxRate::Unresolved,
            ),
        ];
        assert_eq!(portfolio_value(&transactions, "TWD"), Decimal::ZERO);
    }
}
