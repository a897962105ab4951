use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of "today" for scheduling and of timestamps for record bookkeeping.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn now(&self) -> DateTime<Utc>;
}

/// Uses the local calendar date, which is what the user sees on their renewals.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self { today, now }
    }

    /// Pins both values to midnight UTC of `today`.
    pub fn on(today: NaiveDate) -> Self {
        Self {
            today,
            now: today.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
