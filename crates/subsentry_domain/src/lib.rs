pub mod clock;
pub mod display;
pub mod normalize;
pub mod parsing;
pub mod record;
pub mod renewal;
pub mod rollover;
pub mod service;
pub mod store;
pub mod tray;
pub mod urgency;

pub use crate::record::{
    Currency, Frequency, RecordUpdate, Status, SubscriptionDraft, SubscriptionId,
    SubscriptionRecord,
};
pub use crate::renewal::UrgencyTier;
pub use crate::service::{ServiceError, SubscriptionService, SubscriptionServiceBuilder};
