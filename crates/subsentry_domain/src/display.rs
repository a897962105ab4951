use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    record::{Currency, SubscriptionRecord},
    renewal::{self, UrgencyTier},
};

/// Presentation-ready fields for one record, derived with the shared renewal rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalView {
    pub name: String,
    pub formatted_cost: String,
    pub renewal_date: String,
    pub days_until: i64,
    pub tier: UrgencyTier,
    pub relative_label: String,
}

impl RenewalView {
    pub fn for_record(record: &SubscriptionRecord, today: NaiveDate) -> Self {
        let days_until = renewal::days_until(record.renewal_date, today);
        Self {
            name: record.name.clone(),
            formatted_cost: format_cost(record.cost, record.currency),
            renewal_date: record.renewal_date.format("%Y-%m-%d").to_string(),
            days_until,
            tier: renewal::classify_urgency(days_until, record.frequency),
            relative_label: relative_label(days_until),
        }
    }
}

pub fn format_cost(cost: f64, currency: Currency) -> String {
    format!("{}{:.2}", currency.symbol(), cost)
}

pub fn relative_label(days_until: i64) -> String {
    match days_until {
        -1 => "Yesterday".to_string(),
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        d if d < 0 => format!("{} days ago", -d),
        d => format!("In {} days", d),
    }
}

/// "Name (N days)" as shown in the tray menu.
pub fn menu_label(name: &str, days_until: i64) -> String {
    let unit = if days_until == 1 { "day" } else { "days" };
    format!("{} ({} {})", name, days_until, unit)
}
