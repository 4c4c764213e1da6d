use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

use crate::constants::DAYS_PER_YEAR;

use super::performance_model::{ReturnCashFlow, ReturnValuationSnapshot};

const XIRR_MAX_ITERATIONS: usize = 50;
const XIRR_BISECTION_ITERATIONS: usize = 200;
const XIRR_TOLERANCE: Decimal = dec!(0.0000001);

/// Modified Dietz money-weighted return over a period.
///
/// `R = (End - Start - sum(CF)) / (Start + sum(CF_i * W_i))` with
/// `W_i = (TotalDays - DaysSinceStart_i) / TotalDays`. Flows are signed
/// from the portfolio's perspective (inflow positive) and weighted by
/// date only. Returns `None` when the period is empty or the denominator
/// is not positive.
pub fn modified_dietz(
    start_value: Decimal,
    end_value: Decimal,
    cash_flows: &[ReturnCashFlow],
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Option<Decimal> {
    let total_days = (period_end - period_start).num_days();
    if total_days <= 0 {
        return None;
    }
    let total = Decimal::from(total_days);

    let mut net_flow = Decimal::ZERO;
    let mut weighted_flow = Decimal::ZERO;
    for flow in cash_flows {
        net_flow += flow.amount;
        let since = (flow.date - period_start).num_days().clamp(0, total_days);
        let weight = (total - Decimal::from(since)) / total;
        weighted_flow += flow.amount * weight;
    }

    let denominator = start_value + weighted_flow;
    if denominator <= Decimal::ZERO {
        return None;
    }

    Some((end_value - start_value - net_flow) / denominator)
}

/// Return of a single sub-period; undefined when it starts at or below
/// zero.
fn sub_period_return(period_start: Decimal, period_end: Decimal) -> Option<Decimal> {
    if period_start <= Decimal::ZERO {
        return None;
    }
    Some((period_end - period_start) / period_start)
}

/// Simple single-period return, the degenerate TWR with no snapshots.
pub fn simple_return(start_value: Decimal, end_value: Decimal) -> Option<Decimal> {
    sub_period_return(start_value, end_value)
}

/// Time-weighted return chained across the valuation snapshots.
///
/// Sub-period 0 runs from the start value to the first snapshot's
/// value-before; each subsequent one from value-after to the next
/// value-before; the last from the final value-after to the end value.
/// Any sub-period starting at or below zero makes the whole result
/// `None`. Snapshots must already be ordered by date.
pub fn time_weighted(
    start_value: Decimal,
    end_value: Decimal,
    snapshots: &[ReturnValuationSnapshot],
) -> Option<Decimal> {
    if snapshots.is_empty() {
        return simple_return(start_value, end_value);
    }

    let mut factor = Decimal::ONE;
    let mut period_start = start_value;

    for snapshot in snapshots {
        let sub_return = sub_period_return(period_start, snapshot.value_before)?;
        factor *= Decimal::ONE + sub_return;
        period_start = snapshot.value_after;
    }

    let last_return = sub_period_return(period_start, end_value)?;
    factor *= Decimal::ONE + last_return;

    Some(factor - Decimal::ONE)
}

fn npv(rate: Decimal, flows: &[(Decimal, Decimal)]) -> Option<Decimal> {
    let base = Decimal::ONE + rate;
    if base <= Decimal::ZERO {
        return None;
    }
    let mut total = Decimal::ZERO;
    for (amount, years) in flows {
        let discount = base.checked_powd(*years)?;
        if discount.is_zero() {
            return None;
        }
        total += amount / discount;
    }
    Some(total)
}

fn npv_derivative(rate: Decimal, flows: &[(Decimal, Decimal)]) -> Option<Decimal> {
    let base = Decimal::ONE + rate;
    if base <= Decimal::ZERO {
        return None;
    }
    let mut total = Decimal::ZERO;
    for (amount, years) in flows {
        let discount = base.checked_powd(*years + Decimal::ONE)?;
        if discount.is_zero() {
            return None;
        }
        total -= *years * amount / discount;
    }
    Some(total)
}

/// Internal rate of return for irregularly dated flows, investor
/// perspective. Newton-Raphson from a 10% guess, falling back to
/// bisection when the iteration leaves the defined region or fails to
/// converge. `None` when the series has fewer than two flows or no sign
/// change.
pub fn xirr(cash_flows: &[ReturnCashFlow]) -> Option<Decimal> {
    if cash_flows.len() < 2 {
        return None;
    }
    let has_inflow = cash_flows.iter().any(|f| f.amount > Decimal::ZERO);
    let has_outflow = cash_flows.iter().any(|f| f.amount < Decimal::ZERO);
    if !has_inflow || !has_outflow {
        return None;
    }

    let first_date = cash_flows.iter().map(|f| f.date).min()?;
    let flows: Vec<(Decimal, Decimal)> = cash_flows
        .iter()
        .map(|f| {
            let years =
                Decimal::from((f.date - first_date).num_days()) / Decimal::from(DAYS_PER_YEAR);
            (f.amount, years)
        })
        .collect();

    // Newton-Raphson
    let mut rate = dec!(0.1);
    for _ in 0..XIRR_MAX_ITERATIONS {
        let Some(value) = npv(rate, &flows) else { break };
        if value.abs() < XIRR_TOLERANCE {
            return Some(rate);
        }
        let Some(derivative) = npv_derivative(rate, &flows) else {
            break;
        };
        if derivative.abs() < XIRR_TOLERANCE {
            break;
        }
        let next = rate - value / derivative;
        if (next - rate).abs() < XIRR_TOLERANCE {
            return Some(next);
        }
        rate = next;
    }

    // Bisection fallback over a wide bracket
    let mut low = dec!(-0.99);
    let mut high = dec!(10);
    let mut npv_low = npv(low, &flows)?;
    let npv_high = npv(high, &flows)?;
    if (npv_low > Decimal::ZERO) == (npv_high > Decimal::ZERO) {
        return None;
    }

    for _ in 0..XIRR_BISECTION_ITERATIONS {
        let mid = (low + high) / dec!(2);
        let npv_mid = npv(mid, &flows)?;
        if npv_mid.abs() < XIRR_TOLERANCE || (high - low).abs() < XIRR_TOLERANCE {
            return Some(mid);
        }
        if (npv_mid > Decimal::ZERO) == (npv_low > Decimal::ZERO) {
            low = mid;
            npv_low = npv_mid;
        } else {
            high = mid;
        }
    }

    Some((low + high) / dec!(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn flow(d: NaiveDate, amount: Decimal) -> ReturnCashFlow {
        ReturnCashFlow { date: d, amount }
    }

    #[test]
    fn dietz_with_midpoint_flow_matches_half_weight_form() {
        let period_start = date(2023, 1, 1);
        let period_end = date(2023, 12, 31);
        let midpoint = date(2023, 7, 2); // day 182 of 364

        let start = dec!(10000);
        let end = dec!(11500);
        let cash_flow = dec!(1000);

        let result = modified_dietz(
            start,
            end,
            &[flow(midpoint, cash_flow)],
            period_start,
            period_end,
        )
        .unwrap();

        let expected = (end - start - cash_flow) / (start + cash_flow * dec!(0.5));
        assert!((result - expected).abs() < dec!(0.0000001));
    }

    #[test]
    fn dietz_day_one_deposit_scenario() {
        // $0 start, $1,000 deposited on day 1 of a 365-day year, $1,100 end
        let period_start = date(2023, 1, 1);
        let period_end = date(2024, 1, 1);

        let result = modified_dietz(
            Decimal::ZERO,
            dec!(1100),
            &[flow(date(2023, 1, 2), dec!(1000))],
            period_start,
            period_end,
        )
        .unwrap();

        let expected = dec!(100) / (dec!(1000) * dec!(364) / dec!(365));
        assert!((result - expected).abs() < dec!(0.0000001));
        // ~10.03%
        assert!((result - dec!(0.1003)).abs() < dec!(0.0001));
    }

    #[test]
    fn dietz_is_undefined_for_non_positive_denominator() {
        let result = modified_dietz(
            Decimal::ZERO,
            dec!(100),
            &[],
            date(2023, 1, 1),
            date(2023, 12, 31),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn dietz_rejects_empty_period() {
        let result = modified_dietz(
            dec!(100),
            dec!(110),
            &[],
            date(2023, 1, 1),
            date(2023, 1, 1),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn twr_without_snapshots_is_the_simple_return() {
        let result = time_weighted(dec!(1000), dec!(1250), &[]).unwrap();
        assert_eq!(result, dec!(0.25));
    }

    #[test]
    fn twr_chain_with_one_sub_period_matches_the_simple_return() {
        // A snapshot whose before and after are equal carries no flow, so
        // chaining around it must reproduce the plain (end-start)/start
        let snapshots = vec![ReturnValuationSnapshot {
            date: date(2023, 6, 1),
            value_before: dec!(1100),
            value_after: dec!(1100),
        }];
        let chained = time_weighted(dec!(1000), dec!(1210), &snapshots).unwrap();
        let simple = simple_return(dec!(1000), dec!(1210)).unwrap();
        assert!((chained - simple).abs() < dec!(0.0000001));
    }

    #[test]
    fn twr_chains_across_a_deposit() {
        // 1000 grows to 1100, a 500 deposit lands, 1600 grows to 1760
        let snapshots = vec![ReturnValuationSnapshot {
            date: date(2023, 6, 1),
            value_before: dec!(1100),
            value_after: dec!(1600),
        }];
        let result = time_weighted(dec!(1000), dec!(1760), &snapshots).unwrap();
        // (1.1 * 1.1) - 1, the deposit itself contributes no return
        assert!((result - dec!(0.21)).abs() < dec!(0.0000001));
    }

    #[test]
    fn twr_propagates_undefined_sub_periods() {
        let snapshots = vec![ReturnValuationSnapshot {
            date: date(2023, 6, 1),
            value_before: dec!(1100),
            value_after: Decimal::ZERO,
        }];
        assert_eq!(time_weighted(dec!(1000), dec!(1210), &snapshots), None);
        assert_eq!(time_weighted(Decimal::ZERO, dec!(1210), &[]), None);
    }

    #[test]
    fn xirr_recovers_a_known_annual_rate() {
        let flows = vec![
            flow(date(2023, 1, 1), dec!(-1000)),
            flow(date(2024, 1, 1), dec!(1100)),
        ];
        let rate = xirr(&flows).unwrap();
        assert!((rate - dec!(0.1)).abs() < dec!(0.0001));
    }

    #[test]
    fn xirr_handles_multiple_purchases() {
        let flows = vec![
            flow(date(2022, 1, 1), dec!(-1000)),
            flow(date(2022, 7, 1), dec!(-1000)),
            flow(date(2023, 1, 1), dec!(2200)),
        ];
        let rate = xirr(&flows).unwrap();
        // Both tranches gain; the rate lands between the one-year return of
        // the first tranche and the annualized return of the second
        assert!(rate > dec!(0.1) && rate < dec!(0.25));
    }

    #[test]
    fn xirr_requires_a_sign_change() {
        let flows = vec![
            flow(date(2023, 1, 1), dec!(1000)),
            flow(date(2024, 1, 1), dec!(1100)),
        ];
        assert_eq!(xirr(&flows), None);
        assert_eq!(xirr(&flows[..1]), None);
    }
}
