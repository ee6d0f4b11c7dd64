use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::Gender;
use crate::models::Patient;

const PATIENT_COLUMNS: &str = "id, name, age, gender, phone, email, blood_group, language,
     allergies, chronic_conditions, current_medications, emergency_contact";

/// Raw patient row before JSON columns and enums are decoded.
struct PatientRow {
    id: String,
    name: String,
    age: u32,
    gender: String,
    phone: String,
    email: Option<String>,
    blood_group: String,
    language: String,
    allergies: String,
    chronic_conditions: String,
    current_medications: String,
    emergency_contact: String,
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, name, age, gender, phone, email, blood_group, language,
         allergies, chronic_conditions, current_medications, emergency_contact)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            patient.id,
            patient.name,
            patient.age,
            patient.gender.as_str(),
            patient.phone,
            patient.email,
            patient.blood_group,
            patient.language,
            serde_json::to_string(&patient.allergies)?,
            serde_json::to_string(&patient.chronic_conditions)?,
            serde_json::to_string(&patient.current_medications)?,
            serde_json::to_string(&patient.emergency_contact)?,
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &str) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id],
            read_patient_row,
        )
        .optional()?;
    row.map(patient_from_row).transpose()
}

/// Roster in seed/insertion order.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY rowid"
    ))?;
    let rows = stmt.query_map([], read_patient_row)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

pub fn count_patients(conn: &Connection) -> Result<usize, DatabaseError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
    Ok(count as usize)
}

fn read_patient_row(row: &rusqlite::Row) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        blood_group: row.get(6)?,
        language: row.get(7)?,
        allergies: row.get(8)?,
        chronic_conditions: row.get(9)?,
        current_medications: row.get(10)?,
        emergency_contact: row.get(11)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: row.id,
        name: row.name,
        age: row.age,
        gender: Gender::from_str(&row.gender)?,
        phone: row.phone,
        email: row.email,
        blood_group: row.blood_group,
        language: row.language,
        allergies: serde_json::from_str(&row.allergies)?,
        chronic_conditions: serde_json::from_str(&row.chronic_conditions)?,
        current_medications: serde_json::from_str(&row.current_medications)?,
        emergency_contact: serde_json::from_str(&row.emergency_contact)?,
    })
}
