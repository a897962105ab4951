use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    clock::{Clock, SystemClock},
    display::RenewalView,
    normalize::{self, NormalizeError},
    parsing::{FieldParser, ParseError, RawFields},
    record::{Currency, RecordUpdate, Status, SubscriptionDraft, SubscriptionId, SubscriptionRecord},
    rollover::{self, RolloverReport},
    store::{InMemoryStore, StoreError, SubscriptionStore},
    tray::{TraySink, TrayStatus},
    urgency,
};

/// Tray menu length used when the builder is not told otherwise.
pub const DEFAULT_UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid subscription: {0}")]
    Invalid(#[from] NormalizeError),
    #[error("subscription `{0}` not found")]
    NotFound(SubscriptionId),
    #[error("renewal date of `{0}` cannot be advanced further")]
    Unadvanceable(SubscriptionId),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub struct SubscriptionService {
    store: Box<dyn SubscriptionStore>,
    tray_sink: Option<Box<dyn TraySink>>,
    clock: Box<dyn Clock>,
    upcoming_limit: usize,
}

pub struct SubscriptionServiceBuilder {
    store: Option<Box<dyn SubscriptionStore>>,
    tray_sink: Option<Box<dyn TraySink>>,
    clock: Option<Box<dyn Clock>>,
    upcoming_limit: usize,
}

impl Default for SubscriptionServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            tray_sink: None,
            clock: None,
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
        }
    }

    pub fn with_store(mut self, store: Box<dyn SubscriptionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_tray_sink(mut self, sink: Box<dyn TraySink>) -> Self {
        self.tray_sink = Some(sink);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_upcoming_limit(mut self, limit: usize) -> Self {
        self.upcoming_limit = limit;
        self
    }

    /// Builds the service and brings stale renewal dates up to date.
    pub fn build(self) -> ServiceResult<SubscriptionService> {
        let service = SubscriptionService {
            store: self.store.unwrap_or_else(|| Box::new(InMemoryStore::new())),
            tray_sink: self.tray_sink,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            upcoming_limit: self.upcoming_limit,
        };
        service.rollover()?;
        Ok(service)
    }
}

impl SubscriptionService {
    pub fn builder() -> SubscriptionServiceBuilder {
        SubscriptionServiceBuilder::new()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Normalize extractor output and store it as a new active record.
    pub fn add_from_fields(&self, raw: &RawFields) -> ServiceResult<SubscriptionRecord> {
        let draft = normalize::normalize_fields(raw, self.clock.today())?;
        self.insert(draft)
    }

    pub async fn import_text<P: FieldParser>(
        &self,
        parser: &P,
        text: &str,
        credential: &str,
    ) -> ServiceResult<SubscriptionRecord> {
        if text.trim().is_empty() {
            return Err(ParseError::EmptyInput("text").into());
        }
        Self::check_credential(credential)?;
        let raw = parser.parse_text(text, credential).await?;
        self.add_from_fields(&raw)
    }

    pub async fn import_image<P: FieldParser>(
        &self,
        parser: &P,
        image: &[u8],
        credential: &str,
    ) -> ServiceResult<SubscriptionRecord> {
        if image.is_empty() {
            return Err(ParseError::EmptyInput("image").into());
        }
        Self::check_credential(credential)?;
        let raw = parser.parse_image(image, credential).await?;
        self.add_from_fields(&raw)
    }

    pub fn add_manual(&self, draft: SubscriptionDraft) -> ServiceResult<SubscriptionRecord> {
        normalize::validate_manual(&draft, self.clock.today())?;
        let draft = SubscriptionDraft {
            name: draft.name.trim().to_string(),
            tags: draft.tags.trim().to_string(),
            ..draft
        };
        self.insert(draft)
    }

    pub fn get(&self, id: &SubscriptionId) -> ServiceResult<SubscriptionRecord> {
        self.store
            .get(id)?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))
    }

    pub fn update(
        &self,
        id: &SubscriptionId,
        update: RecordUpdate,
    ) -> ServiceResult<SubscriptionRecord> {
        update.validate()?;
        if !self.store.update(id, &update, self.clock.now())? {
            return Err(ServiceError::NotFound(id.clone()));
        }
        self.refresh_tray();
        self.get(id)
    }

    pub fn set_status(
        &self,
        id: &SubscriptionId,
        status: Status,
    ) -> ServiceResult<SubscriptionRecord> {
        self.update(id, RecordUpdate::status(status))
    }

    pub fn delete(&self, id: &SubscriptionId) -> ServiceResult<()> {
        if !self.store.delete(id)? {
            return Err(ServiceError::NotFound(id.clone()));
        }
        self.refresh_tray();
        Ok(())
    }

    /// Every record, soonest renewal first, after advancing past-due ones.
    pub fn list_all(&self) -> ServiceResult<Vec<SubscriptionRecord>> {
        self.rollover()?;
        Ok(self.store.list_all()?)
    }

    pub fn list_active(&self) -> ServiceResult<Vec<SubscriptionRecord>> {
        self.rollover()?;
        Ok(self.store.list_active()?)
    }

    pub fn list_inactive(&self) -> ServiceResult<Vec<SubscriptionRecord>> {
        Ok(self.store.list_inactive()?)
    }

    pub fn search(&self, query: &str) -> ServiceResult<Vec<SubscriptionRecord>> {
        self.rollover()?;
        Ok(self.store.search(query)?)
    }

    /// Mark a subscription as renewed: move it exactly one period forward.
    pub fn mark_renewed(&self, id: &SubscriptionId) -> ServiceResult<SubscriptionRecord> {
        let record = self.get(id)?;
        let renewed = rollover::rollover_single(&record, self.clock.now())
            .ok_or_else(|| ServiceError::Unadvanceable(id.clone()))?;
        if !self.store.update(
            id,
            &RecordUpdate::renewal_date(renewed.renewal_date),
            renewed.last_modified_at,
        )? {
            return Err(ServiceError::NotFound(id.clone()));
        }
        tracing::info!(%id, date = %renewed.renewal_date, "marked as renewed");
        self.refresh_tray();
        Ok(renewed)
    }

    pub fn rollover(&self) -> ServiceResult<RolloverReport> {
        Ok(rollover::rollover_past_due(
            self.store.as_ref(),
            self.clock.today(),
            self.clock.now(),
        )?)
    }

    /// Advance stale records, recompute urgency, and hand the result to the tray.
    pub fn refresh(&self) -> ServiceResult<TrayStatus> {
        self.rollover()?;
        let today = self.clock.today();
        let active = self.store.list_active()?;
        let status = TrayStatus {
            reference_date: today,
            summary: urgency::summarize(&active, today),
            upcoming: urgency::upcoming_renewals(&active, self.upcoming_limit, today),
        };
        tracing::debug!(
            tier = ?status.summary.most_severe_tier,
            very_urgent = status.summary.very_urgent_count,
            urgent = status.summary.urgent_count,
            "refreshed renewal status"
        );
        if let Some(sink) = &self.tray_sink {
            sink.render(&status);
        }
        Ok(status)
    }

    pub fn monthly_totals(&self) -> ServiceResult<BTreeMap<Currency, f64>> {
        Ok(urgency::monthly_totals(&self.list_active()?))
    }

    pub fn renewal_views(&self) -> ServiceResult<Vec<RenewalView>> {
        let today = self.clock.today();
        Ok(self
            .list_all()?
            .iter()
            .map(|record| RenewalView::for_record(record, today))
            .collect())
    }
}

impl SubscriptionService {
    fn insert(&self, draft: SubscriptionDraft) -> ServiceResult<SubscriptionRecord> {
        let record = SubscriptionRecord::from_draft(draft, self.clock.now());
        self.store.insert(record.clone())?;
        tracing::info!(id = %record.id, name = %record.name, date = %record.renewal_date, "added subscription");
        self.refresh_tray();
        Ok(record)
    }

    fn check_credential(credential: &str) -> Result<(), ParseError> {
        if credential.trim().is_empty() {
            return Err(ParseError::MissingCredential);
        }
        Ok(())
    }

    fn refresh_tray(&self) {
        if self.tray_sink.is_none() {
            return;
        }
        if let Err(err) = self.refresh() {
            tracing::warn!(%err, "unable to refresh tray status");
        }
    }
}
