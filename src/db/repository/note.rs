use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::NoteMode;
use crate::models::{ClinicalNote, SoapNote};

pub fn insert_note(conn: &Connection, note: &ClinicalNote) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO clinical_notes (id, patient_id, date, mode, subjective, objective, assessment, plan, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            note.id,
            note.patient_id,
            note.date,
            note.mode.as_str(),
            note.soap.subjective,
            note.soap.objective,
            note.soap.assessment,
            note.soap.plan,
            note.created_at,
        ],
    )?;
    Ok(())
}

/// Notes for one patient, newest visit first.
pub fn get_notes_by_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<ClinicalNote>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, date, mode, subjective, objective, assessment, plan, created_at
         FROM clinical_notes
         WHERE patient_id = ?1
         ORDER BY date DESC, created_at DESC",
    )?;

    let rows = stmt.query_map(params![patient_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, NaiveDate>(2)?,
            row.get::<_, String>(3)?,
            SoapNote {
                subjective: row.get(4)?,
                objective: row.get(5)?,
                assessment: row.get(6)?,
                plan: row.get(7)?,
            },
            row.get::<_, DateTime<Utc>>(8)?,
        ))
    })?;

    let mut notes = Vec::new();
    for row in rows {
        let (id, patient_id, date, mode, soap, created_at) = row?;
        notes.push(ClinicalNote {
            id,
            patient_id,
            date,
            mode: NoteMode::from_str(&mode)?,
            soap,
            created_at,
        });
    }
    Ok(notes)
}

pub fn count_notes(conn: &Connection) -> Result<usize, DatabaseError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM clinical_notes", [], |row| row.get(0))?;
    Ok(count as usize)
}
