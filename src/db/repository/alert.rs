use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::AlertSeverity;
use crate::models::PatternAlert;

pub fn insert_pattern_alert(conn: &Connection, alert: &PatternAlert) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO pattern_alerts (id, patient_id, patient_name, severity, title, description, recommendation, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            alert.id,
            alert.patient_id,
            alert.patient_name,
            alert.severity.as_str(),
            alert.title,
            alert.description,
            alert.recommendation,
            alert.created_at,
        ],
    )?;
    Ok(())
}

/// Alerts for one patient, or for everyone when `patient_id` is `None`.
pub fn get_pattern_alerts(
    conn: &Connection,
    patient_id: Option<&str>,
) -> Result<Vec<PatternAlert>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, patient_name, severity, title, description, recommendation, created_at
         FROM pattern_alerts
         WHERE ?1 IS NULL OR patient_id = ?1
         ORDER BY rowid",
    )?;

    let rows = stmt.query_map(params![patient_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, DateTime<Utc>>(7)?,
        ))
    })?;

    let mut alerts = Vec::new();
    for row in rows {
        let (id, patient_id, patient_name, severity, title, description, recommendation, created_at) =
            row?;
        alerts.push(PatternAlert {
            id,
            patient_id,
            patient_name,
            severity: AlertSeverity::from_str(&severity)?,
            title,
            description,
            recommendation,
            created_at,
        });
    }
    Ok(alerts)
}
