use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::{Field, NormalizeError};

/// Opaque identifier assigned when a record is first created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubscriptionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Eur => "€",
        }
    }
}

/// Billing period. Each variant maps to exactly one calendar step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Annual,
}

impl Frequency {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("monthly") {
            Some(Self::Monthly)
        } else if value.eq_ignore_ascii_case("annual") {
            Some(Self::Annual)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub id: SubscriptionId,
    pub name: String,
    pub cost: f64,
    pub currency: Currency,
    pub renewal_date: NaiveDate,
    pub frequency: Frequency,
    pub status: Status,
    #[serde(default)]
    pub tags: String,
    pub added_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

impl SubscriptionRecord {
    /// Materialise a validated draft into a record with a fresh identifier.
    pub fn from_draft(draft: SubscriptionDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: SubscriptionId::generate(),
            name: draft.name,
            cost: draft.cost,
            currency: draft.currency,
            renewal_date: draft.renewal_date,
            frequency: draft.frequency,
            status: draft.status,
            tags: draft.tags,
            added_at: now,
            last_modified_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn hashtags(&self) -> Vec<&str> {
        self.tags
            .split_whitespace()
            .filter(|token| token.len() > 1 && token.starts_with('#'))
            .collect()
    }

    pub fn apply(&mut self, update: &RecordUpdate, modified_at: DateTime<Utc>) {
        if let Some(name) = &update.name {
            self.name = name.trim().to_string();
        }
        if let Some(cost) = update.cost {
            self.cost = cost;
        }
        if let Some(currency) = update.currency {
            self.currency = currency;
        }
        if let Some(date) = update.renewal_date {
            self.renewal_date = date;
        }
        if let Some(frequency) = update.frequency {
            self.frequency = frequency;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(tags) = &update.tags {
            self.tags = tags.trim().to_string();
        }
        self.last_modified_at = modified_at;
    }
}

/// The normalized shape produced both by field extraction and by manual entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDraft {
    pub name: String,
    pub cost: f64,
    pub currency: Currency,
    pub renewal_date: NaiveDate,
    pub frequency: Frequency,
    #[serde(default)]
    pub tags: String,
    pub status: Status,
}

impl SubscriptionDraft {
    /// Checks the invariants a hand-built draft must satisfy before it is stored.
    pub fn validate(&self) -> Result<(), NormalizeError> {
        check_name(&self.name)?;
        check_cost(self.cost)
    }
}

/// Partial edit of an existing record; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdate {
    pub name: Option<String>,
    pub cost: Option<f64>,
    pub currency: Option<Currency>,
    pub renewal_date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub status: Option<Status>,
    pub tags: Option<String>,
}

impl RecordUpdate {
    pub fn renewal_date(date: NaiveDate) -> Self {
        Self {
            renewal_date: Some(date),
            ..Self::default()
        }
    }

    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), NormalizeError> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(cost) = self.cost {
            check_cost(cost)?;
        }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), NormalizeError> {
    if name.trim().is_empty() {
        return Err(NormalizeError::FieldType {
            field: Field::Name,
            expected: "non-empty text",
        });
    }
    Ok(())
}

fn check_cost(cost: f64) -> Result<(), NormalizeError> {
    if !cost.is_finite() || cost <= 0.0 {
        return Err(NormalizeError::FieldType {
            field: Field::Cost,
            expected: "a positive number",
        });
    }
    Ok(())
}
