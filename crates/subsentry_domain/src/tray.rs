use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    renewal::UrgencyTier,
    urgency::{UpcomingRenewal, UrgencySummary},
};

/// Everything the tray icon and its menu need after a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrayStatus {
    pub reference_date: NaiveDate,
    pub summary: UrgencySummary,
    pub upcoming: Vec<UpcomingRenewal>,
}

impl TrayStatus {
    pub fn icon_state(&self) -> UrgencyTier {
        self.summary.most_severe_tier
    }
}

/// Platform-specific tray adapters implement this; the domain never renders.
pub trait TraySink: Send + Sync {
    fn render(&self, status: &TrayStatus);
}
