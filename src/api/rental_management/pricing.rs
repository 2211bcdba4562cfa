//! Rental quotes.
//!
//! A quote snapshots the listing's prices at request time so later price
//! edits never change an existing rental.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;

use crate::api::equipment_management::models::Equipment;

pub const DAYS_PER_WEEK: i64 = 7;
pub const DAYS_PER_MONTH: i64 = 30;
/// Longest rental a single request may book.
pub const MAX_RENTAL_DAYS: i64 = 365;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DateError {
    #[error("Start date can't be in the past")]
    StartInPast,
    #[error("End date must be on or after the start date")]
    EndBeforeStart,
    #[error("Rentals can't be longer than 365 days")]
    TooLong,
}

/// Inclusive day count of a rental starting no earlier than `today`.
pub fn rental_days(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<i64, DateError> {
    if start < today {
        return Err(DateError::StartInPast);
    }
    if end < start {
        return Err(DateError::EndBeforeStart);
    }
    let days = (end - start).num_days() + 1;
    if days > MAX_RENTAL_DAYS {
        return Err(DateError::TooLong);
    }
    Ok(days)
}

/// Inclusive date ranges share at least one day.
pub fn overlaps(start: NaiveDate, end: NaiveDate, other_start: NaiveDate, other_end: NaiveDate) -> bool {
    start <= other_end && other_start <= end
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rates {
    pub daily: Decimal,
    pub weekly: Option<Decimal>,
    pub monthly: Option<Decimal>,
}

impl From<&Equipment> for Rates {
    fn from(item: &Equipment) -> Self {
        Rates {
            daily: item.daily_rate,
            weekly: item.weekly_rate,
            monthly: item.monthly_rate,
        }
    }
}

fn blocks_to_cover(days: i64, block: i64) -> i64 {
    (days.max(0) + block - 1) / block
}

/// Cheapest price for `days` days using whole months, weeks and single
/// days. A month or week may cover more days than remain when that is
/// cheaper than paying the days.
pub fn rental_cost(rates: &Rates, days: i64) -> Decimal {
    let max_months = match rates.monthly {
        Some(_) => blocks_to_cover(days, DAYS_PER_MONTH),
        None => 0,
    };

    let mut best: Option<Decimal> = None;
    for months in 0..=max_months {
        let after_months = (days - months * DAYS_PER_MONTH).max(0);

        // Cost is linear in weeks on each side of after_months / 7, so the
        // minimum sits at no weeks, the floor or the ceiling.
        let week_counts = match rates.weekly {
            Some(_) => [
                0,
                after_months / DAYS_PER_WEEK,
                blocks_to_cover(after_months, DAYS_PER_WEEK),
            ],
            None => [0; 3],
        };

        for weeks in week_counts {
            let single_days = (after_months - weeks * DAYS_PER_WEEK).max(0);
            let cost = rates.monthly.unwrap_or_default() * Decimal::from(months)
                + rates.weekly.unwrap_or_default() * Decimal::from(weeks)
                + rates.daily * Decimal::from(single_days);

            if best.map_or(true, |best| cost < best) {
                best = Some(cost);
            }
        }
    }

    best.unwrap_or_default()
}

/// `percent` of `subtotal`, rounded half away from zero to cents.
pub fn service_fee(subtotal: Decimal, percent: Decimal) -> Decimal {
    (subtotal * percent / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub daily_rate: Decimal,
    pub total_days: i32,
    pub subtotal: Decimal,
    pub security_deposit: Decimal,
    pub delivery_fee: Decimal,
    pub service_fee: Decimal,
    pub total_amount: Decimal,
}

pub fn quote(item: &Equipment, days: i64, delivery: bool, service_fee_percent: Decimal) -> Quote {
    let subtotal = rental_cost(&Rates::from(item), days);
    let delivery_fee = if delivery {
        item.delivery_fee
    } else {
        Decimal::ZERO
    };
    let fee = service_fee(subtotal, service_fee_percent);

    Quote {
        daily_rate: item.daily_rate,
        total_days: i32::try_from(days).unwrap_or(i32::MAX),
        subtotal,
        security_deposit: item.security_deposit,
        delivery_fee,
        service_fee: fee,
        total_amount: subtotal + item.security_deposit + delivery_fee + fee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::equipment_management::models::tests::listing;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn console_rates() -> Rates {
        Rates {
            daily: dec!(15.00),
            weekly: Some(dec!(80.00)),
            monthly: Some(dec!(250.00)),
        }
    }

    #[test]
    fn days_are_counted_inclusively() {
        assert_eq!(rental_days(day(1), day(1), day(1)), Ok(1));
        assert_eq!(rental_days(day(1), day(3), day(1)), Ok(3));
        assert_eq!(rental_days(day(10), day(20), day(2)), Ok(11));
    }

    #[test]
    fn invalid_ranges_are_refused() {
        assert_eq!(rental_days(day(1), day(5), day(2)), Err(DateError::StartInPast));
        assert_eq!(rental_days(day(5), day(4), day(1)), Err(DateError::EndBeforeStart));
    }

    #[test]
    fn rentals_are_capped_at_a_year() {
        let start = day(1);
        let last_allowed = start + chrono::Duration::days(MAX_RENTAL_DAYS - 1);
        assert_eq!(rental_days(start, last_allowed, start), Ok(MAX_RENTAL_DAYS));
        assert_eq!(
            rental_days(start, last_allowed + chrono::Duration::days(1), start),
            Err(DateError::TooLong)
        );
        assert_eq!(
            rental_days(start, NaiveDate::from_ymd_opt(2124, 6, 1).unwrap(), start),
            Err(DateError::TooLong)
        );
    }

    /// Tries every month and week count.
    fn exhaustive_cost(rates: &Rates, days: i64) -> Decimal {
        let mut best: Option<Decimal> = None;
        for months in 0..=blocks_to_cover(days, DAYS_PER_MONTH) {
            if months > 0 && rates.monthly.is_none() {
                break;
            }
            let after_months = (days - months * DAYS_PER_MONTH).max(0);
            for weeks in 0..=blocks_to_cover(after_months, DAYS_PER_WEEK) {
                if weeks > 0 && rates.weekly.is_none() {
                    break;
                }
                let single_days = (after_months - weeks * DAYS_PER_WEEK).max(0);
                let cost = rates.monthly.unwrap_or_default() * Decimal::from(months)
                    + rates.weekly.unwrap_or_default() * Decimal::from(weeks)
                    + rates.daily * Decimal::from(single_days);
                if best.map_or(true, |best| cost < best) {
                    best = Some(cost);
                }
            }
        }
        best.unwrap_or_default()
    }

    #[test]
    fn week_shortcut_matches_every_combination() {
        let rate_sets = [
            console_rates(),
            Rates {
                daily: dec!(10),
                weekly: Some(dec!(100)),
                monthly: Some(dec!(200)),
            },
            Rates {
                daily: dec!(20),
                weekly: Some(dec!(45)),
                monthly: Some(dec!(900)),
            },
            Rates {
                daily: dec!(12.50),
                weekly: Some(dec!(60)),
                monthly: None,
            },
            Rates {
                daily: dec!(7),
                weekly: None,
                monthly: Some(dec!(150)),
            },
        ];
        for rates in &rate_sets {
            for days in 1..=120 {
                assert_eq!(
                    rental_cost(rates, days),
                    exhaustive_cost(rates, days),
                    "{:?} for {} days",
                    rates,
                    days
                );
            }
        }
    }

    #[test]
    fn a_full_year_is_twelve_months_and_spare_days() {
        assert_eq!(rental_cost(&console_rates(), MAX_RENTAL_DAYS), dec!(3075.00));
    }

    #[test]
    fn daily_rate_alone_for_short_rentals() {
        assert_eq!(rental_cost(&console_rates(), 3), dec!(45.00));
    }

    #[test]
    fn weeks_and_months_apply_when_cheaper() {
        let rates = console_rates();
        assert_eq!(rental_cost(&rates, 7), dec!(80.00));
        assert_eq!(rental_cost(&rates, 10), dec!(125.00));
        assert_eq!(rental_cost(&rates, 30), dec!(250.00));
        assert_eq!(rental_cost(&rates, 35), dec!(325.00));
    }

    #[test]
    fn a_whole_week_beats_six_expensive_days() {
        assert_eq!(rental_cost(&console_rates(), 6), dec!(80.00));
    }

    #[test]
    fn missing_rates_fall_back_to_daily() {
        let rates = Rates {
            daily: dec!(9.99),
            weekly: None,
            monthly: None,
        };
        assert_eq!(rental_cost(&rates, 14), dec!(139.86));
    }

    #[test]
    fn overpriced_weekly_rate_is_ignored() {
        let rates = Rates {
            daily: dec!(10),
            weekly: Some(dec!(100)),
            monthly: None,
        };
        assert_eq!(rental_cost(&rates, 7), dec!(70));
    }

    #[test]
    fn service_fee_rounds_to_cents() {
        assert_eq!(service_fee(dec!(45.00), dec!(10)), dec!(4.50));
        assert_eq!(service_fee(dec!(33.33), dec!(10)), dec!(3.33));
        assert_eq!(service_fee(dec!(12.25), dec!(10)), dec!(1.23));
        assert_eq!(service_fee(dec!(100), dec!(0)), dec!(0));
    }

    #[test]
    fn quote_totals_add_up() {
        let item = listing(1, "active");
        let with_delivery = quote(&item, 3, true, dec!(10));

        assert_eq!(with_delivery.daily_rate, dec!(15.00));
        assert_eq!(with_delivery.total_days, 3);
        assert_eq!(with_delivery.subtotal, dec!(45.00));
        assert_eq!(with_delivery.delivery_fee, dec!(12.50));
        assert_eq!(with_delivery.service_fee, dec!(4.50));
        assert_eq!(with_delivery.total_amount, dec!(162.00));
        assert_eq!(
            with_delivery.total_amount,
            with_delivery.subtotal
                + with_delivery.security_deposit
                + with_delivery.delivery_fee
                + with_delivery.service_fee
        );

        let pickup = quote(&item, 3, false, dec!(10));
        assert_eq!(pickup.delivery_fee, dec!(0));
        assert_eq!(pickup.total_amount, dec!(149.50));
    }

    #[test]
    fn inclusive_ranges_overlap_on_shared_days() {
        assert!(overlaps(day(1), day(5), day(5), day(8)));
        assert!(overlaps(day(3), day(4), day(1), day(10)));
        assert!(!overlaps(day(1), day(4), day(5), day(8)));
        assert!(!overlaps(day(9), day(12), day(5), day(8)));
    }
}
