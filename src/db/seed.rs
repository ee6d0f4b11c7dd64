//! Demo roster and calendar loaded into an empty store.
//!
//! Fixtures are compiled into the binary so a fresh in-memory store is
//! usable without any files on disk.

use rusqlite::Connection;
use serde::de::DeserializeOwned;

use super::repository::{
    count_patients, insert_appointment, insert_followup, insert_note, insert_pattern_alert,
    insert_patient,
};
use super::DatabaseError;
use crate::models::{Appointment, ClinicalNote, FollowUpItem, PatternAlert, Patient};

const PATIENTS: &str = include_str!("../../resources/seed/patients.json");
const NOTES: &str = include_str!("../../resources/seed/notes.json");
const APPOINTMENTS: &str = include_str!("../../resources/seed/appointments.json");
const ALERTS: &str = include_str!("../../resources/seed/alerts.json");
const FOLLOWUPS: &str = include_str!("../../resources/seed/followups.json");

/// Row counts inserted by a seed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub patients: usize,
    pub notes: usize,
    pub appointments: usize,
    pub alerts: usize,
    pub followups: usize,
}

/// Load the demo fixtures if the roster is empty. Returns `None` when the
/// store already holds patients.
pub fn seed_if_empty(conn: &Connection) -> Result<Option<SeedReport>, DatabaseError> {
    if count_patients(conn)? > 0 {
        tracing::debug!("Store already populated, skipping seed");
        return Ok(None);
    }
    seed_demo_data(conn).map(Some)
}

/// Insert every fixture inside one transaction.
pub fn seed_demo_data(conn: &Connection) -> Result<SeedReport, DatabaseError> {
    let patients: Vec<Patient> = parse_fixture("patients.json", PATIENTS)?;
    let notes: Vec<ClinicalNote> = parse_fixture("notes.json", NOTES)?;
    let appointments: Vec<Appointment> = parse_fixture("appointments.json", APPOINTMENTS)?;
    let alerts: Vec<PatternAlert> = parse_fixture("alerts.json", ALERTS)?;
    let followups: Vec<FollowUpItem> = parse_fixture("followups.json", FOLLOWUPS)?;

    let tx = conn.unchecked_transaction()?;
    for patient in &patients {
        insert_patient(&tx, patient)?;
    }
    for note in &notes {
        insert_note(&tx, note)?;
    }
    for apt in &appointments {
        insert_appointment(&tx, apt)?;
    }
    for alert in &alerts {
        insert_pattern_alert(&tx, alert)?;
    }
    for item in &followups {
        insert_followup(&tx, item)?;
    }
    tx.commit()?;

    let report = SeedReport {
        patients: patients.len(),
        notes: notes.len(),
        appointments: appointments.len(),
        alerts: alerts.len(),
        followups: followups.len(),
    };
    tracing::info!(
        patients = report.patients,
        notes = report.notes,
        appointments = report.appointments,
        alerts = report.alerts,
        followups = report.followups,
        "Seeded demo clinic data"
    );
    Ok(report)
}

fn parse_fixture<T: DeserializeOwned>(
    fixture: &'static str,
    raw: &str,
) -> Result<Vec<T>, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::Seed {
        fixture,
        reason: e.to_string(),
    })
}
