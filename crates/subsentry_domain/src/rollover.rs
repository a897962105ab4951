use chrono::{DateTime, NaiveDate, Utc};
use tracing::instrument;

use crate::{
    record::{RecordUpdate, SubscriptionId, SubscriptionRecord},
    renewal,
    store::{StoreResult, SubscriptionStore},
};

/// Outcome of one scan over the active records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloverReport {
    pub advanced: Vec<SubscriptionId>,
    /// Records that were past due but could not be advanced or saved.
    pub failed: Vec<SubscriptionId>,
}

impl RolloverReport {
    pub fn is_noop(&self) -> bool {
        self.advanced.is_empty() && self.failed.is_empty()
    }
}

pub fn is_past_due(record: &SubscriptionRecord, reference: NaiveDate) -> bool {
    record.is_active() && record.renewal_date < reference
}

/// Advance every active, past-due record to its first occurrence on or after `reference`.
///
/// Only reading the record list can fail the scan. A record that cannot be
/// advanced or saved is logged, reported in [`RolloverReport::failed`], and the
/// scan moves on; the next scan retries it.
#[instrument(skip(store, now), fields(%reference))]
pub fn rollover_past_due<S>(
    store: &S,
    reference: NaiveDate,
    now: DateTime<Utc>,
) -> StoreResult<RolloverReport>
where
    S: SubscriptionStore + ?Sized,
{
    let mut report = RolloverReport::default();
    for record in store.list_active()? {
        if !is_past_due(&record, reference) {
            continue;
        }
        let Some(next) =
            renewal::advance_until_future(record.renewal_date, record.frequency, reference)
        else {
            tracing::warn!(id = %record.id, date = %record.renewal_date, "renewal date cannot be advanced");
            report.failed.push(record.id);
            continue;
        };
        match store.update(&record.id, &RecordUpdate::renewal_date(next), now) {
            Ok(true) => {
                tracing::info!(
                    id = %record.id,
                    name = %record.name,
                    from = %record.renewal_date,
                    to = %next,
                    "advanced renewal date"
                );
                report.advanced.push(record.id);
            }
            Ok(false) => {
                tracing::debug!(id = %record.id, "record disappeared during rollover");
            }
            Err(err) => {
                tracing::warn!(id = %record.id, %err, "failed to save advanced renewal date");
                report.failed.push(record.id);
            }
        }
    }
    Ok(report)
}

/// Move a record exactly one period past its current renewal date, past due or not.
///
/// Returns `None` if the next date is not representable.
pub fn rollover_single(
    record: &SubscriptionRecord,
    now: DateTime<Utc>,
) -> Option<SubscriptionRecord> {
    let next = renewal::next_occurrence(record.renewal_date, record.frequency)?;
    let mut updated = record.clone();
    updated.renewal_date = next;
    updated.last_modified_at = now;
    Some(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Currency, Frequency, Status, SubscriptionDraft};
    use crate::store::{InMemoryStore, StoreError};
    use chrono::{Datelike, Duration, TimeZone};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    fn record(name: &str, date: NaiveDate, frequency: Frequency, status: Status) -> SubscriptionRecord {
        SubscriptionRecord::from_draft(
            SubscriptionDraft {
                name: name.into(),
                cost: 10.0,
                currency: Currency::Usd,
                renewal_date: date,
                frequency,
                tags: String::new(),
                status,
            },
            created(),
        )
    }

    #[test]
    fn advances_month_end_record_through_clamped_steps() {
        let stale = record("Cloud", ymd(2024, 1, 31), Frequency::Monthly, Status::Active);
        let id = stale.id.clone();
        let store = InMemoryStore::with_records([stale]);
        let now = created() + Duration::days(100);

        let report = rollover_past_due(&store, ymd(2024, 4, 15), now).unwrap();
        assert_eq!(report.advanced, vec![id.clone()]);
        let saved = store.get(&id).unwrap().unwrap();
        assert_eq!(saved.renewal_date, ymd(2024, 4, 29));
        assert_eq!(saved.last_modified_at, now);
    }

    #[test]
    fn second_scan_is_a_noop() {
        let store = InMemoryStore::with_records([
            record("A", ymd(2023, 5, 10), Frequency::Monthly, Status::Active),
            record("B", ymd(2022, 8, 1), Frequency::Annual, Status::Active),
        ]);
        let reference = ymd(2025, 3, 10);
        let first = rollover_past_due(&store, reference, created()).unwrap();
        assert_eq!(first.advanced.len(), 2);
        let snapshot = store.list_all().unwrap();

        let second = rollover_past_due(&store, reference, created() + Duration::hours(1)).unwrap();
        assert!(second.is_noop());
        assert_eq!(store.list_all().unwrap(), snapshot);
        assert!(snapshot.iter().all(|r| r.renewal_date >= reference));
    }

    #[test]
    fn leaves_current_and_inactive_records_untouched() {
        let current = record("Current", ymd(2025, 3, 10), Frequency::Monthly, Status::Active);
        let paused = record("Paused", ymd(2020, 1, 1), Frequency::Monthly, Status::Inactive);
        let store = InMemoryStore::with_records([current.clone(), paused.clone()]);

        let report = rollover_past_due(&store, ymd(2025, 3, 10), created() + Duration::days(1)).unwrap();
        assert!(report.is_noop());
        assert_eq!(store.get(&current.id).unwrap().unwrap(), current);
        assert_eq!(store.get(&paused.id).unwrap().unwrap(), paused);
    }

    #[test]
    fn unrepresentable_dates_do_not_block_others() {
        let last = NaiveDate::MAX;
        let edge = record("Edge", last - Duration::days(10), Frequency::Monthly, Status::Active);
        let year_before = last.with_year(last.year() - 1).unwrap();
        let normal = record("Normal", year_before, Frequency::Annual, Status::Active);
        let store = InMemoryStore::with_records([edge.clone(), normal.clone()]);

        let report = rollover_past_due(&store, NaiveDate::MAX, created()).unwrap();
        assert_eq!(report.failed, vec![edge.id.clone()]);
        assert_eq!(report.advanced, vec![normal.id.clone()]);
        assert_eq!(store.get(&edge.id).unwrap().unwrap().renewal_date, edge.renewal_date);
    }

    struct RejectingStore {
        inner: InMemoryStore,
        reject: SubscriptionId,
    }

    impl SubscriptionStore for RejectingStore {
        fn list_all(&self) -> StoreResult<Vec<SubscriptionRecord>> {
            self.inner.list_all()
        }

        fn get(&self, id: &SubscriptionId) -> StoreResult<Option<SubscriptionRecord>> {
            self.inner.get(id)
        }

        fn insert(&self, record: SubscriptionRecord) -> StoreResult<SubscriptionId> {
            self.inner.insert(record)
        }

        fn update(
            &self,
            id: &SubscriptionId,
            update: &RecordUpdate,
            modified_at: DateTime<Utc>,
        ) -> StoreResult<bool> {
            if *id == self.reject {
                return Err(StoreError::Io {
                    path: "subscriptions.json".into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.inner.update(id, update, modified_at)
        }

        fn delete(&self, id: &SubscriptionId) -> StoreResult<bool> {
            self.inner.delete(id)
        }
    }

    #[test]
    fn save_failure_is_isolated_to_one_record() {
        let broken = record("Broken", ymd(2024, 6, 1), Frequency::Monthly, Status::Active);
        let healthy = record("Healthy", ymd(2024, 7, 1), Frequency::Annual, Status::Active);
        let store = RejectingStore {
            inner: InMemoryStore::with_records([broken.clone(), healthy.clone()]),
            reject: broken.id.clone(),
        };

        let report = rollover_past_due(&store, ymd(2025, 3, 10), created()).unwrap();
        assert_eq!(report.failed, vec![broken.id.clone()]);
        assert_eq!(report.advanced, vec![healthy.id.clone()]);
        assert_eq!(
            store.get(&healthy.id).unwrap().unwrap().renewal_date,
            ymd(2025, 7, 1)
        );
    }

    #[test]
    fn single_rollover_always_steps_once() {
        let future = record("Future", ymd(2030, 5, 31), Frequency::Monthly, Status::Active);
        let now = created() + Duration::days(3);
        let stepped = rollover_single(&future, now).unwrap();
        assert_eq!(stepped.renewal_date, ymd(2030, 6, 30));
        assert_eq!(stepped.last_modified_at, now);
        assert_eq!(stepped.id, future.id);

        let stale = record("Stale", ymd(2020, 2, 29), Frequency::Annual, Status::Active);
        assert_eq!(
            rollover_single(&stale, now).unwrap().renewal_date,
            ymd(2021, 2, 28)
        );
    }

    #[test]
    fn single_rollover_rejects_unrepresentable_date() {
        let edge = record("Edge", NaiveDate::MAX, Frequency::Annual, Status::Active);
        assert!(rollover_single(&edge, created()).is_none());
    }
}
