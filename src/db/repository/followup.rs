use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::{DeliveryStatus, FollowUpStatus, MessageChannel, Urgency};
use crate::models::{FollowUpItem, FollowUpMessage};

const FOLLOWUP_COLUMNS: &str =
    "id, patient_id, patient_name, reason, due_date, status, urgency, last_visit";

pub fn insert_followup(conn: &Connection, item: &FollowUpItem) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO followups (id, patient_id, patient_name, reason, due_date, status, urgency, last_visit)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            item.id,
            item.patient_id,
            item.patient_name,
            item.reason,
            item.due_date,
            item.status.as_str(),
            item.urgency.as_str(),
            item.last_visit,
        ],
    )?;
    Ok(())
}

pub fn list_followups(conn: &Connection) -> Result<Vec<FollowUpItem>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FOLLOWUP_COLUMNS} FROM followups ORDER BY rowid"
    ))?;
    let rows = stmt.query_map([], read_followup_row)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(followup_from_row(row?)?);
    }
    Ok(items)
}

pub fn get_followup(conn: &Connection, id: &str) -> Result<Option<FollowUpItem>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {FOLLOWUP_COLUMNS} FROM followups WHERE id = ?1"),
            params![id],
            read_followup_row,
        )
        .optional()?;
    row.map(followup_from_row).transpose()
}

pub fn update_followup_status(
    conn: &Connection,
    id: &str,
    status: FollowUpStatus,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE followups SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    not_found_if_zero(affected, id)
}

/// Move a follow-up to a new due date; it becomes `upcoming` again.
pub fn reschedule_followup(
    conn: &Connection,
    id: &str,
    due_date: NaiveDate,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE followups SET due_date = ?1, status = 'upcoming' WHERE id = ?2",
        params![due_date, id],
    )?;
    not_found_if_zero(affected, id)
}

/// Flag every upcoming follow-up whose due date has passed. Returns how many changed.
pub fn mark_overdue_followups(conn: &Connection, today: NaiveDate) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE followups SET status = 'overdue' WHERE status = 'upcoming' AND due_date < ?1",
        params![today],
    )?;
    Ok(affected)
}

pub fn insert_followup_message(
    conn: &Connection,
    msg: &FollowUpMessage,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO followup_messages (id, patient_id, channel, recipient, subject, body, status, provider_id, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            msg.id,
            msg.patient_id,
            msg.channel.as_str(),
            msg.recipient,
            msg.subject,
            msg.body,
            msg.status.as_str(),
            msg.provider_id,
            msg.sent_at,
        ],
    )?;
    Ok(())
}

/// Outbox for one patient, newest first.
pub fn get_followup_messages(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<FollowUpMessage>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, channel, recipient, subject, body, status, provider_id, sent_at
         FROM followup_messages WHERE patient_id = ?1
         ORDER BY sent_at DESC, rowid DESC",
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
            row.get::<_, Option<String>>(7)?,
            row.get::<_, DateTime<Utc>>(8)?,
        ))
    })?;

    let mut messages = Vec::new();
    for row in rows {
        let (id, patient_id, channel, recipient, subject, body, status, provider_id, sent_at) = row?;
        messages.push(FollowUpMessage {
            id,
            patient_id,
            channel: MessageChannel::from_str(&channel)?,
            recipient,
            subject,
            body,
            status: DeliveryStatus::from_str(&status)?,
            provider_id,
            sent_at,
        });
    }
    Ok(messages)
}

fn not_found_if_zero(affected: usize, id: &str) -> Result<(), DatabaseError> {
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "FollowUp".into(),
            id: id.into(),
        });
    }
    Ok(())
}

type FollowUpRow = (String, String, String, String, NaiveDate, String, String, NaiveDate);

fn read_followup_row(row: &rusqlite::Row) -> Result<FollowUpRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn followup_from_row(row: FollowUpRow) -> Result<FollowUpItem, DatabaseError> {
    let (id, patient_id, patient_name, reason, due_date, status, urgency, last_visit) = row;
    Ok(FollowUpItem {
        id,
        patient_id,
        patient_name,
        reason,
        due_date,
        status: FollowUpStatus::from_str(&status)?,
        urgency: Urgency::from_str(&urgency)?,
        last_visit,
    })
}
