use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::AlertSeverity;

/// A flagged clinical observation with a suggested action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternAlert {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub created_at: DateTime<Utc>,
}

/// Per-severity tally used by the roster and the pattern check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertCounts {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

impl AlertCounts {
    pub fn tally(alerts: &[PatternAlert]) -> Self {
        let mut counts = Self::default();
        for alert in alerts {
            match alert.severity {
                AlertSeverity::Critical => counts.critical += 1,
                AlertSeverity::Warning => counts.warning += 1,
                AlertSeverity::Info => counts.info += 1,
            }
        }
        counts
    }
}
