//! Turns loosely-typed extractor output into a [`SubscriptionDraft`].
//!
//! Normalization runs in two passes. The defaulting pass fills the fields
//! listed in [`DEFAULTS`]; the validation pass then rejects anything still
//! missing from [`REQUIRED`] before checking shapes and enumerated values.

use std::fmt;

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::{
    parsing::RawFields,
    record::{Currency, Frequency, Status, SubscriptionDraft},
    renewal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Cost,
    Currency,
    RenewalDate,
    Frequency,
    Tags,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Cost => "cost",
            Field::Currency => "currency",
            Field::RenewalDate => "renewalDate",
            Field::Frequency => "frequency",
            Field::Tags => "tags",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("could not determine {}", join_fields(.0))]
    MissingField(Vec<Field>),
    #[error("{field} must be {expected}")]
    FieldType {
        field: Field,
        expected: &'static str,
    },
    #[error("{field} must be {expected}")]
    FieldValue {
        field: Field,
        expected: &'static str,
    },
}

impl NormalizeError {
    /// Every field this error refers to.
    pub fn fields(&self) -> Vec<Field> {
        match self {
            NormalizeError::MissingField(fields) => fields.clone(),
            NormalizeError::FieldType { field, .. } | NormalizeError::FieldValue { field, .. } => {
                vec![*field]
            }
        }
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| field.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values substituted when the extractor leaves a field empty.
pub const DEFAULTS: &[(Field, &str)] = &[(Field::Frequency, "monthly"), (Field::Currency, "USD")];

/// Fields that cannot be defaulted.
pub const REQUIRED: &[Field] = &[Field::Name, Field::Cost, Field::RenewalDate];

const DATE_SHAPE: &str = "a calendar date in YYYY-MM-DD form";

/// Normalize raw extractor output against `today`.
///
/// A renewal date before `today` is advanced to its next occurrence instead of
/// being rejected: receipts usually show the last charge, not the next one.
pub fn normalize_fields(raw: &RawFields, today: NaiveDate) -> Result<SubscriptionDraft, NormalizeError> {
    let fields = apply_defaults(raw);

    let missing: Vec<Field> = REQUIRED
        .iter()
        .copied()
        .filter(|field| is_missing(fields.get(field.key())))
        .collect();
    if !missing.is_empty() {
        return Err(NormalizeError::MissingField(missing));
    }

    let name = read_name(&fields)?;
    let cost = read_cost(&fields)?;
    let parsed_date = read_renewal_date(&fields)?;
    let currency = read_enum(&fields, Field::Currency, Currency::parse, "USD or EUR")?;
    let frequency = read_enum(&fields, Field::Frequency, Frequency::parse, "monthly or annual")?;

    let renewal_date = if parsed_date < today {
        let advanced = renewal::advance_until_future(parsed_date, frequency, today).ok_or(
            NormalizeError::FieldValue {
                field: Field::RenewalDate,
                expected: "within the supported calendar range",
            },
        )?;
        tracing::info!(%parsed_date, %advanced, "moved past renewal date to next occurrence");
        advanced
    } else {
        parsed_date
    };

    Ok(SubscriptionDraft {
        name,
        cost,
        currency,
        renewal_date,
        frequency,
        tags: coerce_tags(fields.get(Field::Tags.key())),
        status: Status::Active,
    })
}

/// Checks a hand-entered draft. Unlike extracted fields, a past renewal date is rejected.
pub fn validate_manual(draft: &SubscriptionDraft, today: NaiveDate) -> Result<(), NormalizeError> {
    draft.validate()?;
    if draft.renewal_date < today {
        return Err(NormalizeError::FieldValue {
            field: Field::RenewalDate,
            expected: "today or a later date",
        });
    }
    Ok(())
}

fn apply_defaults(raw: &RawFields) -> RawFields {
    let mut fields = raw.clone();
    for (field, default) in DEFAULTS {
        if is_missing(fields.get(field.key())) {
            tracing::debug!(field = field.key(), default, "field unclear, using default");
            fields.insert(field.key().to_string(), Value::String((*default).to_string()));
        }
    }
    fields
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

fn read_name(fields: &RawFields) -> Result<String, NormalizeError> {
    match fields.get(Field::Name.key()) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(NormalizeError::FieldType {
            field: Field::Name,
            expected: "non-empty text",
        }),
    }
}

fn read_cost(fields: &RawFields) -> Result<f64, NormalizeError> {
    match fields.get(Field::Cost.key()).and_then(Value::as_f64) {
        Some(cost) if cost.is_finite() && cost > 0.0 => Ok(cost),
        _ => Err(NormalizeError::FieldType {
            field: Field::Cost,
            expected: "a positive number",
        }),
    }
}

fn read_renewal_date(fields: &RawFields) -> Result<NaiveDate, NormalizeError> {
    let invalid = NormalizeError::FieldType {
        field: Field::RenewalDate,
        expected: DATE_SHAPE,
    };
    let Some(Value::String(text)) = fields.get(Field::RenewalDate.key()) else {
        return Err(invalid);
    };
    parse_iso_date(text).ok_or(invalid)
}

/// Parses strictly `YYYY-MM-DD`; chrono alone would also accept unpadded parts.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    if bytes.len() != 10 {
        return None;
    }
    let shaped = bytes.iter().enumerate().all(|(idx, byte)| match idx {
        4 | 7 => *byte == b'-',
        _ => byte.is_ascii_digit(),
    });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn read_enum<T>(
    fields: &RawFields,
    field: Field,
    parse: impl Fn(&str) -> Option<T>,
    expected: &'static str,
) -> Result<T, NormalizeError> {
    fields
        .get(field.key())
        .and_then(Value::as_str)
        .and_then(parse)
        .ok_or(NormalizeError::FieldValue { field, expected })
}

fn coerce_tags(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|token| !token.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Some(other) => other.to_string().trim().to_string(),
    }
}
