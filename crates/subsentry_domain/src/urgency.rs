use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    record::{Currency, Frequency, SubscriptionId, SubscriptionRecord},
    renewal::{self, UrgencyTier},
};

/// Per-tier counts over the active records. Tiers are disjoint: a very urgent
/// record is not also counted as urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgencySummary {
    pub very_urgent_count: usize,
    pub urgent_count: usize,
    pub most_severe_tier: UrgencyTier,
}

impl Default for UrgencySummary {
    fn default() -> Self {
        Self {
            very_urgent_count: 0,
            urgent_count: 0,
            most_severe_tier: UrgencyTier::Normal,
        }
    }
}

impl UrgencySummary {
    /// Records needing attention in either elevated tier.
    pub fn renewing_soon(&self) -> usize {
        self.very_urgent_count + self.urgent_count
    }
}

/// Menu-ready view of one upcoming renewal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingRenewal {
    pub id: SubscriptionId,
    pub name: String,
    pub renewal_date: NaiveDate,
    pub days_until: i64,
    pub tier: UrgencyTier,
}

pub fn tier_for(record: &SubscriptionRecord, reference: NaiveDate) -> UrgencyTier {
    renewal::classify_urgency(
        renewal::days_until(record.renewal_date, reference),
        record.frequency,
    )
}

pub fn summarize(records: &[SubscriptionRecord], reference: NaiveDate) -> UrgencySummary {
    records
        .iter()
        .filter(|record| record.is_active())
        .map(|record| tier_for(record, reference))
        .fold(UrgencySummary::default(), |mut summary, tier| {
            match tier {
                UrgencyTier::VeryUrgent => summary.very_urgent_count += 1,
                UrgencyTier::Urgent => summary.urgent_count += 1,
                UrgencyTier::Normal => {}
            }
            summary.most_severe_tier = summary.most_severe_tier.max(tier);
            summary
        })
}

/// The `n` active records renewing soonest; equal dates fall back to name order.
pub fn top_upcoming(records: &[SubscriptionRecord], n: usize) -> Vec<SubscriptionRecord> {
    let mut active: Vec<&SubscriptionRecord> =
        records.iter().filter(|record| record.is_active()).collect();
    active.sort_by(|a, b| {
        a.renewal_date
            .cmp(&b.renewal_date)
            .then_with(|| a.name.cmp(&b.name))
    });
    active.into_iter().take(n).cloned().collect()
}

pub fn upcoming_renewals(
    records: &[SubscriptionRecord],
    n: usize,
    reference: NaiveDate,
) -> Vec<UpcomingRenewal> {
    top_upcoming(records, n)
        .into_iter()
        .map(|record| UpcomingRenewal {
            days_until: renewal::days_until(record.renewal_date, reference),
            tier: tier_for(&record, reference),
            id: record.id,
            name: record.name,
            renewal_date: record.renewal_date,
        })
        .collect()
}

/// Monthly spend of active records per currency; annual plans count a twelfth of their cost.
pub fn monthly_totals(records: &[SubscriptionRecord]) -> BTreeMap<Currency, f64> {
    let mut totals = BTreeMap::new();
    for record in records.iter().filter(|record| record.is_active()) {
        let monthly = match record.frequency {
            Frequency::Monthly => record.cost,
            Frequency::Annual => record.cost / 12.0,
        };
        *totals.entry(record.currency).or_insert(0.0) += monthly;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Status, SubscriptionDraft};
    use chrono::{Duration, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn record(name: &str, in_days: i64, frequency: Frequency, status: Status) -> SubscriptionRecord {
        SubscriptionRecord::from_draft(
            SubscriptionDraft {
                name: name.into(),
                cost: 12.0,
                currency: Currency::Usd,
                renewal_date: today() + Duration::days(in_days),
                frequency,
                tags: String::new(),
                status,
            },
            Utc::now(),
        )
    }

    #[test]
    fn summary_counts_disjoint_tiers() {
        let records = vec![
            record("Tomorrow", 1, Frequency::Monthly, Status::Active),
            record("Three", 3, Frequency::Monthly, Status::Active),
            record("Yearly", 25, Frequency::Annual, Status::Active),
            record("Later", 10, Frequency::Monthly, Status::Active),
            record("Paused", 0, Frequency::Monthly, Status::Inactive),
        ];
        let summary = summarize(&records, today());
        assert_eq!(summary.very_urgent_count, 1);
        assert_eq!(summary.urgent_count, 2);
        assert_eq!(summary.renewing_soon(), 3);
        assert_eq!(summary.most_severe_tier, UrgencyTier::VeryUrgent);
    }

    #[test]
    fn most_severe_tier_falls_back() {
        let urgent_only = vec![record("Yearly", 30, Frequency::Annual, Status::Active)];
        assert_eq!(
            summarize(&urgent_only, today()).most_severe_tier,
            UrgencyTier::Urgent
        );

        let calm = vec![
            record("Yearly", 31, Frequency::Annual, Status::Active),
            record("Monthly", 4, Frequency::Monthly, Status::Active),
        ];
        assert_eq!(summarize(&calm, today()), UrgencySummary::default());
        assert_eq!(summarize(&[], today()).most_severe_tier, UrgencyTier::Normal);
    }

    #[test]
    fn top_upcoming_orders_by_date_then_name() {
        let records = vec![
            record("Zoom", 2, Frequency::Monthly, Status::Active),
            record("Adobe", 2, Frequency::Monthly, Status::Active),
            record("Hidden", 0, Frequency::Monthly, Status::Inactive),
            record("Music", 5, Frequency::Monthly, Status::Active),
            record("Earliest", 1, Frequency::Annual, Status::Active),
        ];
        let names: Vec<String> = top_upcoming(&records, 3)
            .into_iter()
            .map(|record| record.name)
            .collect();
        assert_eq!(names, vec!["Earliest", "Adobe", "Zoom"]);
        assert_eq!(top_upcoming(&records, 10).len(), 4);
        assert!(top_upcoming(&records, 0).is_empty());
    }

    #[test]
    fn upcoming_renewals_carry_days_and_tier() {
        let records = vec![
            record("Soon", 3, Frequency::Monthly, Status::Active),
            record("Far", 40, Frequency::Annual, Status::Active),
        ];
        let entries = upcoming_renewals(&records, 5, today());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Soon");
        assert_eq!(entries[0].days_until, 3);
        assert_eq!(entries[0].tier, UrgencyTier::Urgent);
        assert_eq!(entries[1].days_until, 40);
        assert_eq!(entries[1].tier, UrgencyTier::Normal);
    }

    #[test]
    fn monthly_totals_spread_annual_cost() {
        let mut eur = record("Euro", 5, Frequency::Monthly, Status::Active);
        eur.currency = Currency::Eur;
        eur.cost = 4.5;
        let records = vec![
            record("Monthly", 5, Frequency::Monthly, Status::Active),
            record("Annual", 5, Frequency::Annual, Status::Active),
            record("Paused", 5, Frequency::Monthly, Status::Inactive),
            eur,
        ];
        let totals = monthly_totals(&records);
        assert_eq!(totals.get(&Currency::Usd), Some(&13.0));
        assert_eq!(totals.get(&Currency::Eur), Some(&4.5));
    }
}
