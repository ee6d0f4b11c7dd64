use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::NoteMode;

/// Subjective / Objective / Assessment / Plan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SoapNote {
    pub subjective: String,
    pub objective: String,
    pub assessment: String,
    pub plan: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub id: String,
    pub patient_id: String,
    pub date: NaiveDate,
    pub mode: NoteMode,
    pub soap: SoapNote,
    pub created_at: DateTime<Utc>,
}
