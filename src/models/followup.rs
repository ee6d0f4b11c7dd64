use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{DeliveryStatus, FollowUpStatus, MessageChannel, Urgency};

/// A post-visit contact task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpItem {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub reason: String,
    pub due_date: NaiveDate,
    pub status: FollowUpStatus,
    pub urgency: Urgency,
    pub last_visit: NaiveDate,
}

/// Outbox record for every follow-up message the clinic sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpMessage {
    pub id: String,
    pub patient_id: String,
    pub channel: MessageChannel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: DeliveryStatus,
    pub provider_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}
