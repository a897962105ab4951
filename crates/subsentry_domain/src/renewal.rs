//! Calendar math for renewal dates and the urgency rules built on top of it.
//!
//! Month and year steps clamp to the last valid day of the target month:
//! `2024-01-31 + 1 month` is `2024-02-29`, and `2024-02-29 + 1 year` is
//! `2025-02-28`. Each step starts from the previous result, so a clamped day
//! is carried forward (`2024-01-31` stepped three times monthly lands on
//! `2024-04-29`).

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::Frequency;

/// Days-until threshold, inclusive, for the `VeryUrgent` tier.
pub const VERY_URGENT_DAYS: i64 = 2;
/// Days-until threshold, inclusive, for `Urgent` on monthly billing.
pub const MONTHLY_WARNING_DAYS: i64 = 3;
/// Days-until threshold, inclusive, for `Urgent` on annual billing.
pub const ANNUAL_WARNING_DAYS: i64 = 30;

/// Ordered from least to most severe so `max()` picks the most pressing tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UrgencyTier {
    Normal,
    Urgent,
    VeryUrgent,
}

impl Frequency {
    fn step(self) -> Months {
        match self {
            Frequency::Monthly => Months::new(1),
            Frequency::Annual => Months::new(12),
        }
    }

    /// Days ahead of a renewal at which it starts being reported as urgent.
    pub fn warning_days(self) -> i64 {
        match self {
            Frequency::Monthly => MONTHLY_WARNING_DAYS,
            Frequency::Annual => ANNUAL_WARNING_DAYS,
        }
    }
}

/// Advance `date` by exactly one billing period.
///
/// Returns `None` only when the result falls outside chrono's representable range.
pub fn next_occurrence(date: NaiveDate, frequency: Frequency) -> Option<NaiveDate> {
    date.checked_add_months(frequency.step())
}

/// Step `date` forward one period at a time until it is on or after `reference`.
///
/// Dates already on or after `reference` are returned unchanged.
pub fn advance_until_future(
    date: NaiveDate,
    frequency: Frequency,
    reference: NaiveDate,
) -> Option<NaiveDate> {
    let mut current = date;
    while current < reference {
        current = next_occurrence(current, frequency)?;
    }
    Some(current)
}

/// Whole calendar days from `reference` to `date`; negative when overdue.
pub fn days_until(date: NaiveDate, reference: NaiveDate) -> i64 {
    date.signed_duration_since(reference).num_days()
}

pub fn classify_urgency(days_until: i64, frequency: Frequency) -> UrgencyTier {
    if days_until <= VERY_URGENT_DAYS {
        UrgencyTier::VeryUrgent
    } else if days_until <= frequency.warning_days() {
        UrgencyTier::Urgent
    } else {
        UrgencyTier::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monthly_step_clamps_to_month_end() {
        assert_eq!(
            next_occurrence(ymd(2024, 1, 31), Frequency::Monthly),
            Some(ymd(2024, 2, 29))
        );
        assert_eq!(
            next_occurrence(ymd(2023, 1, 31), Frequency::Monthly),
            Some(ymd(2023, 2, 28))
        );
        assert_eq!(
            next_occurrence(ymd(2024, 12, 15), Frequency::Monthly),
            Some(ymd(2025, 1, 15))
        );
    }

    #[test]
    fn annual_step_handles_leap_day() {
        assert_eq!(
            next_occurrence(ymd(2024, 2, 29), Frequency::Annual),
            Some(ymd(2025, 2, 28))
        );
        assert_eq!(
            next_occurrence(ymd(2023, 6, 1), Frequency::Annual),
            Some(ymd(2024, 6, 1))
        );
    }

    #[test]
    fn advance_carries_clamped_day_forward() {
        let advanced = advance_until_future(ymd(2024, 1, 31), Frequency::Monthly, ymd(2024, 4, 15));
        assert_eq!(advanced, Some(ymd(2024, 4, 29)));
    }

    #[test]
    fn advance_leaves_current_dates_alone() {
        let today = ymd(2025, 3, 10);
        assert_eq!(
            advance_until_future(today, Frequency::Monthly, today),
            Some(today)
        );
        assert_eq!(
            advance_until_future(ymd(2025, 4, 1), Frequency::Annual, today),
            Some(ymd(2025, 4, 1))
        );
    }

    #[test]
    fn advance_lands_on_reference_when_aligned() {
        assert_eq!(
            advance_until_future(ymd(2020, 3, 10), Frequency::Monthly, ymd(2025, 3, 10)),
            Some(ymd(2025, 3, 10))
        );
    }

    #[test]
    fn advance_over_decades_terminates() {
        let advanced =
            advance_until_future(ymd(1990, 7, 4), Frequency::Monthly, ymd(2025, 1, 1)).unwrap();
        assert_eq!(advanced, ymd(2025, 1, 4));
    }

    #[test]
    fn days_until_is_signed() {
        let today = ymd(2025, 1, 10);
        assert_eq!(days_until(ymd(2025, 1, 10), today), 0);
        assert_eq!(days_until(ymd(2025, 1, 13), today), 3);
        assert_eq!(days_until(ymd(2025, 1, 7), today), -3);
        assert_eq!(days_until(ymd(2026, 1, 10), today), 365);
    }

    #[test]
    fn urgency_boundaries() {
        assert_eq!(classify_urgency(2, Frequency::Monthly), UrgencyTier::VeryUrgent);
        assert_eq!(classify_urgency(3, Frequency::Monthly), UrgencyTier::Urgent);
        assert_eq!(classify_urgency(4, Frequency::Monthly), UrgencyTier::Normal);
        assert_eq!(classify_urgency(2, Frequency::Annual), UrgencyTier::VeryUrgent);
        assert_eq!(classify_urgency(30, Frequency::Annual), UrgencyTier::Urgent);
        assert_eq!(classify_urgency(31, Frequency::Annual), UrgencyTier::Normal);
        assert_eq!(classify_urgency(-5, Frequency::Annual), UrgencyTier::VeryUrgent);
    }

    #[test]
    fn tiers_order_by_severity() {
        assert!(UrgencyTier::VeryUrgent > UrgencyTier::Urgent);
        assert!(UrgencyTier::Urgent > UrgencyTier::Normal);
    }
}
