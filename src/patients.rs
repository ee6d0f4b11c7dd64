//! Patient roster, lookup, history and summary assembly.
//!
//! Everything here is read-only over the store. Summaries are built from a
//! template (no LLM) so the voice agent can read them out verbatim.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::repository::{
    get_appointments_by_patient, get_notes_by_patient, get_patient, get_pattern_alerts,
    insert_note, list_patients,
};
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, Gender, NoteMode};
use crate::models::{
    new_id, AlertCounts, Appointment, ClinicalNote, Medication, PatternAlert, Patient, SoapNote,
};

/// How many past visits the summary text lists.
const SUMMARY_VISIT_LIMIT: usize = 5;

// ─── Types ────────────────────────────────────────────────────────────────────

/// Roster row: the patient plus derived visit and alert figures.
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    #[serde(flatten)]
    pub patient: Patient,
    pub last_visit: Option<NaiveDate>,
    pub total_notes: usize,
    pub alert_counts: AlertCounts,
}

/// Full patient record for the detail page.
#[derive(Debug, Clone, Serialize)]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    pub notes: Vec<ClinicalNote>,
    pub appointments: Vec<Appointment>,
    pub alerts: Vec<PatternAlert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientHistory {
    pub patient: Patient,
    pub notes: Vec<ClinicalNote>,
    pub appointments: Vec<Appointment>,
    pub total_visits: usize,
    pub last_visit: Option<NaiveDate>,
}

/// Short listing used when the agent asks for "all patients".
#[derive(Debug, Clone, Serialize)]
pub struct PatientBrief {
    pub patient_id: String,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientMatch {
    pub found: bool,
    pub patient_id: String,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub blood_group: String,
    pub allergies: Vec<String>,
    pub chronic_conditions: Vec<String>,
    pub current_medications: Vec<Medication>,
    pub total_notes: usize,
    pub last_visit: Option<NaiveDate>,
    pub active_alerts: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LookupResult {
    Listing {
        patients: Vec<PatientBrief>,
        total: usize,
    },
    Found(PatientMatch),
    NoMatch {
        found: bool,
        message: String,
        available_patients: Vec<PatientBrief>,
    },
}

/// Spoken/handoff summary of one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub patient_name: String,
    pub summary_text: String,
    pub key_concerns: Vec<String>,
    pub last_visit_date: Option<NaiveDate>,
    pub total_visits: usize,
    pub generated_at: DateTime<Utc>,
}

// ─── Roster ───────────────────────────────────────────────────────────────────

pub fn list_roster(conn: &Connection) -> Result<Vec<RosterEntry>, DatabaseError> {
    let patients = list_patients(conn)?;
    let mut roster = Vec::with_capacity(patients.len());
    for patient in patients {
        let notes = get_notes_by_patient(conn, &patient.id)?;
        let alerts = get_pattern_alerts(conn, Some(&patient.id))?;
        roster.push(RosterEntry {
            last_visit: notes.first().map(|n| n.date),
            total_notes: notes.len(),
            alert_counts: AlertCounts::tally(&alerts),
            patient,
        });
    }
    Ok(roster)
}

pub fn patient_detail(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<PatientDetail>, DatabaseError> {
    let Some(patient) = get_patient(conn, patient_id)? else {
        return Ok(None);
    };
    Ok(Some(PatientDetail {
        notes: get_notes_by_patient(conn, patient_id)?,
        appointments: get_appointments_by_patient(conn, patient_id)?,
        alerts: get_pattern_alerts(conn, Some(patient_id))?,
        patient,
    }))
}

pub fn patient_history(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<PatientHistory>, DatabaseError> {
    let Some(patient) = get_patient(conn, patient_id)? else {
        return Ok(None);
    };
    let notes = get_notes_by_patient(conn, patient_id)?;
    let appointments = get_appointments_by_patient(conn, patient_id)?;
    Ok(Some(PatientHistory {
        total_visits: notes.len(),
        last_visit: notes.first().map(|n| n.date),
        patient,
        notes,
        appointments,
    }))
}

// ─── Lookup ───────────────────────────────────────────────────────────────────

/// Pick the patient a spoken name most likely refers to.
///
/// A case-insensitive substring match on the whole query wins. Otherwise the
/// first patient whose name contains any single word of the query.
pub fn match_patient_name<'a>(patients: &'a [Patient], query: &str) -> Option<&'a Patient> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(exact) = patients
        .iter()
        .find(|p| p.name.to_lowercase().contains(&needle))
    {
        return Some(exact);
    }

    let words: Vec<&str> = needle.split_whitespace().collect();
    patients.iter().find(|p| {
        let name = p.name.to_lowercase();
        words.iter().any(|w| name.contains(w))
    })
}

pub fn lookup_patient(conn: &Connection, name: Option<&str>) -> Result<LookupResult, DatabaseError> {
    let patients = list_patients(conn)?;
    let query = name.map(str::trim).filter(|n| !n.is_empty());

    let Some(query) = query else {
        let briefs: Vec<PatientBrief> = patients.iter().map(|p| brief(p, true)).collect();
        return Ok(LookupResult::Listing {
            total: briefs.len(),
            patients: briefs,
        });
    };

    let Some(found) = match_patient_name(&patients, query) else {
        tracing::info!(query, "Patient lookup found no match");
        let names: Vec<&str> = patients.iter().map(|p| p.name.as_str()).collect();
        return Ok(LookupResult::NoMatch {
            found: false,
            message: format!(
                "No patient found matching \"{query}\". Available patients: {}",
                names.join(", ")
            ),
            available_patients: patients.iter().map(|p| brief(p, false)).collect(),
        });
    };

    let notes = get_notes_by_patient(conn, &found.id)?;
    let alerts = get_pattern_alerts(conn, Some(&found.id))?;
    Ok(LookupResult::Found(PatientMatch {
        found: true,
        patient_id: found.id.clone(),
        name: found.name.clone(),
        age: found.age,
        gender: found.gender,
        blood_group: found.blood_group.clone(),
        allergies: found.allergies.clone(),
        chronic_conditions: found.chronic_conditions.clone(),
        current_medications: found.current_medications.clone(),
        total_notes: notes.len(),
        last_visit: notes.first().map(|n| n.date),
        active_alerts: alerts.len(),
    }))
}

fn brief(patient: &Patient, with_conditions: bool) -> PatientBrief {
    PatientBrief {
        patient_id: patient.id.clone(),
        name: patient.name.clone(),
        age: patient.age,
        gender: patient.gender,
        conditions: with_conditions.then(|| patient.chronic_conditions.clone()),
    }
}

// ─── Summary ──────────────────────────────────────────────────────────────────

/// Build the summary for a patient from the store, or `None` if unknown.
pub fn summarize_patient(
    conn: &Connection,
    patient_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<PatientSummary>, DatabaseError> {
    let Some(patient) = get_patient(conn, patient_id)? else {
        return Ok(None);
    };
    let notes = get_notes_by_patient(conn, patient_id)?;
    let upcoming: Vec<Appointment> = get_appointments_by_patient(conn, patient_id)?
        .into_iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled)
        .collect();
    Ok(Some(build_summary(&patient, &notes, &upcoming, now)))
}

/// Template summary. `notes` must be newest first.
pub fn build_summary(
    patient: &Patient,
    notes: &[ClinicalNote],
    upcoming: &[Appointment],
    now: DateTime<Utc>,
) -> PatientSummary {
    let diagnoses = join_or(&patient.chronic_conditions, ", ", "None documented");
    let allergies = join_or(&patient.allergies, ", ", "None");
    let medications = if patient.current_medications.is_empty() {
        "None".to_string()
    } else {
        patient
            .current_medications
            .iter()
            .map(Medication::display)
            .collect::<Vec<_>>()
            .join("; ")
    };

    let visits = if notes.is_empty() {
        "No documented visits.".to_string()
    } else {
        notes
            .iter()
            .take(SUMMARY_VISIT_LIMIT)
            .map(|n| format!("{}: {}", n.date, n.soap.assessment))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let appointments = if upcoming.is_empty() {
        "None scheduled".to_string()
    } else {
        upcoming
            .iter()
            .map(|a| format!("{} — {}", a.date, a.reason))
            .collect::<Vec<_>>()
            .join("; ")
    };

    let summary_text = format!(
        "Patient: {name}, {age}yo {gender}\n\
         Blood Group: {blood}\n\
         Diagnoses: {diagnoses}\n\
         Allergies: {allergies}\n\
         Current Medications: {medications}\n\
         \n\
         Visit History ({count} visits):\n\
         {visits}\n\
         \n\
         Upcoming Appointments: {appointments}",
        name = patient.name,
        age = patient.age,
        gender = patient.gender,
        blood = patient.blood_group,
        count = notes.len(),
    );

    PatientSummary {
        patient_name: patient.name.clone(),
        summary_text,
        key_concerns: key_concerns(patient, notes),
        last_visit_date: notes.first().map(|n| n.date),
        total_visits: notes.len(),
        generated_at: now,
    }
}

/// Flags worth reading out first. `notes` must be newest first.
pub fn key_concerns(patient: &Patient, notes: &[ClinicalNote]) -> Vec<String> {
    let mut concerns = Vec::new();
    if let Some(latest) = notes.first() {
        if latest.soap.assessment.to_lowercase().contains("worsening") {
            concerns.push("Condition worsening — needs close monitoring".to_string());
        }
    }
    if !patient.allergies.is_empty() {
        concerns.push(format!("Drug allergies: {}", patient.allergies.join(", ")));
    }
    if patient.chronic_conditions.len() >= 2 {
        concerns.push("Multiple chronic conditions — consider drug interactions".to_string());
    }
    concerns
}

fn join_or(items: &[String], sep: &str, empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(sep)
    }
}

// ─── Notes ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteRequest {
    pub patient_id: Option<String>,
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
    pub mode: Option<NoteMode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedNote {
    pub success: bool,
    pub note_id: String,
    pub soap: SoapNote,
    pub message: String,
}

/// Store a SOAP note dated `now`. The caller drops the patient's cached summary.
pub fn save_note(
    conn: &Connection,
    req: &NoteRequest,
    now: DateTime<Utc>,
) -> Result<SavedNote, NoteError> {
    let field = |value: &Option<String>| value.as_deref().map(str::trim).unwrap_or("").to_string();
    let patient_id = field(&req.patient_id);
    if patient_id.is_empty() {
        return Err(NoteError::MissingField("patient_id"));
    }
    let soap = SoapNote {
        subjective: field(&req.subjective),
        objective: field(&req.objective),
        assessment: field(&req.assessment),
        plan: field(&req.plan),
    };
    if soap.subjective.is_empty() {
        return Err(NoteError::MissingField("subjective"));
    }
    if soap.assessment.is_empty() {
        return Err(NoteError::MissingField("assessment"));
    }

    let patient = get_patient(conn, &patient_id)?
        .ok_or_else(|| NoteError::PatientNotFound(patient_id.clone()))?;

    let note = ClinicalNote {
        id: new_id("note"),
        patient_id,
        date: now.date_naive(),
        mode: req.mode.unwrap_or(NoteMode::Dictate),
        soap,
        created_at: now,
    };
    insert_note(conn, &note)?;
    tracing::info!(note_id = %note.id, patient_id = %note.patient_id, "SOAP note saved");

    Ok(SavedNote {
        success: true,
        message: format!("SOAP note saved for {}", patient.name),
        note_id: note.id,
        soap: note.soap,
    })
}

// ─── Pattern alerts ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub alerts: Vec<PatternAlert>,
    pub total: usize,
    pub critical: usize,
    pub warnings: usize,
    pub info: usize,
}

/// Alerts for one patient, or for everyone when `patient_id` is absent or "all".
pub fn check_patterns(
    conn: &Connection,
    patient_id: Option<&str>,
) -> Result<PatternReport, DatabaseError> {
    let scope = patient_id
        .map(str::trim)
        .filter(|id| !id.is_empty() && !id.eq_ignore_ascii_case("all"));
    let alerts = get_pattern_alerts(conn, scope)?;
    let counts = AlertCounts::tally(&alerts);
    Ok(PatternReport {
        total: alerts.len(),
        critical: counts.critical,
        warnings: counts.warning,
        info: counts.info,
        alerts,
    })
}
