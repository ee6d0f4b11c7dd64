use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, AppointmentType};
use crate::models::Appointment;

const APPOINTMENT_COLUMNS: &str =
    "id, patient_id, patient_name, date, time, appointment_type, reason, status, language, created_at";

/// Optional filters for the calendar listing. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub patient_id: Option<String>,
    pub status: Option<AppointmentStatus>,
}

pub fn insert_appointment(conn: &Connection, apt: &Appointment) -> Result<(), DatabaseError> {
    let slot_minutes = apt
        .start_time()
        .map(|t| i64::from(t.hour() * 60 + t.minute()));

    conn.execute(
        "INSERT INTO appointments (id, patient_id, patient_name, date, time, slot_minutes,
         appointment_type, reason, status, language, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            apt.id,
            apt.patient_id,
            apt.patient_name,
            apt.date,
            apt.time,
            slot_minutes,
            apt.appointment_type.as_str(),
            apt.reason,
            apt.status.as_str(),
            apt.language,
            apt.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &str) -> Result<Option<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"
    ))?;
    let row = stmt.query_row(params![id], read_appointment_row).optional()?;
    row.map(appointment_from_row).transpose()
}

/// Calendar listing ordered by date then start time.
pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE 1=1");
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(date) = filter.date {
        values.push(Box::new(date));
        sql.push_str(&format!(" AND date = ?{}", values.len()));
    }
    if let Some(from) = filter.from {
        values.push(Box::new(from));
        sql.push_str(&format!(" AND date >= ?{}", values.len()));
    }
    if let Some(to) = filter.to {
        values.push(Box::new(to));
        sql.push_str(&format!(" AND date <= ?{}", values.len()));
    }
    if let Some(ref patient_id) = filter.patient_id {
        values.push(Box::new(patient_id.clone()));
        sql.push_str(&format!(" AND patient_id = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str()));
        sql.push_str(&format!(" AND status = ?{}", values.len()));
    }
    sql.push_str(" ORDER BY date ASC, slot_minutes ASC, rowid ASC");

    let mut stmt = conn.prepare(&sql)?;
    let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt.query_map(refs.as_slice(), read_appointment_row)?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row?)?);
    }
    Ok(appointments)
}

pub fn get_appointments_by_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<Appointment>, DatabaseError> {
    list_appointments(
        conn,
        &AppointmentFilter {
            patient_id: Some(patient_id.to_string()),
            ..Default::default()
        },
    )
}

/// Start minutes of every scheduled appointment on `date`.
pub fn scheduled_slots_on(conn: &Connection, date: NaiveDate) -> Result<Vec<u32>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT slot_minutes FROM appointments
         WHERE date = ?1 AND status = 'scheduled' AND slot_minutes IS NOT NULL
         ORDER BY slot_minutes",
    )?;
    let rows = stmt.query_map(params![date], |row| row.get::<_, i64>(0))?;

    let mut slots = Vec::new();
    for row in rows {
        slots.push(row? as u32);
    }
    Ok(slots)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.into(),
        });
    }
    Ok(())
}

type AppointmentRow = (
    String,
    String,
    String,
    NaiveDate,
    String,
    String,
    String,
    String,
    String,
    DateTime<Utc>,
);

fn read_appointment_row(row: &rusqlite::Row) -> Result<AppointmentRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    let (id, patient_id, patient_name, date, time, apt_type, reason, status, language, created_at) =
        row;
    Ok(Appointment {
        id,
        patient_id,
        patient_name,
        date,
        time,
        appointment_type: AppointmentType::from_str(&apt_type)?,
        reason,
        status: AppointmentStatus::from_str(&status)?,
        language,
        created_at,
    })
}
