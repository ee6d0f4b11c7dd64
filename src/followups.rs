//! Follow-up queue and patient messaging.
//!
//! Sending is split in three so the store lock is never held across a
//! provider call: [`prepare_message`] reads the store, [`deliver`] talks to
//! the providers, [`record_deliveries`] writes the outbox.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::repository::{
    get_followup, get_patient, insert_followup_message, list_followups, mark_overdue_followups,
    reschedule_followup as store_reschedule, update_followup_status,
};
use crate::db::DatabaseError;
use crate::models::enums::{DeliveryStatus, FollowUpStatus, MessageChannel, MessageType};
use crate::models::{new_id, FollowUpItem, FollowUpMessage, Patient};
use crate::voice::{Mailer, OutgoingEmail, VoiceError};

#[derive(Debug, thiserror::Error)]
pub enum FollowUpError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Follow-up not found: {0}")]
    FollowUpNotFound(String),

    #[error("{0} has no email address on file")]
    NoEmailAddress(String),

    #[error("No delivery channel selected")]
    NoChannel,

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ─── Queue ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct FollowUpQueue {
    pub followups: Vec<FollowUpItem>,
    pub total: usize,
    pub overdue: usize,
    pub upcoming: usize,
}

/// Overdue first, then urgency high → low, then earliest due date.
pub fn queue_order(a: &FollowUpItem, b: &FollowUpItem) -> Ordering {
    let overdue = |f: &FollowUpItem| f.status != FollowUpStatus::Overdue;
    overdue(a)
        .cmp(&overdue(b))
        .then_with(|| a.urgency.rank().cmp(&b.urgency.rank()))
        .then_with(|| a.due_date.cmp(&b.due_date))
}

/// Pending follow-ups as of `today`. Items past due are flagged overdue first.
pub fn followup_queue(conn: &Connection, today: NaiveDate) -> Result<FollowUpQueue, DatabaseError> {
    let flagged = mark_overdue_followups(conn, today)?;
    if flagged > 0 {
        tracing::info!(flagged, "Follow-ups became overdue");
    }

    let mut followups: Vec<FollowUpItem> = list_followups(conn)?
        .into_iter()
        .filter(|f| f.status != FollowUpStatus::Completed)
        .collect();
    followups.sort_by(queue_order);

    let overdue = followups
        .iter()
        .filter(|f| f.status == FollowUpStatus::Overdue)
        .count();
    Ok(FollowUpQueue {
        total: followups.len(),
        upcoming: followups.len() - overdue,
        overdue,
        followups,
    })
}

pub fn complete_followup(conn: &Connection, id: &str) -> Result<FollowUpItem, FollowUpError> {
    let mut item = existing(conn, id)?;
    update_followup_status(conn, id, FollowUpStatus::Completed)?;
    tracing::info!(followup_id = id, patient_id = %item.patient_id, "Follow-up completed");
    item.status = FollowUpStatus::Completed;
    Ok(item)
}

pub fn reschedule_followup(
    conn: &Connection,
    id: &str,
    due_date: Option<&str>,
) -> Result<FollowUpItem, FollowUpError> {
    let raw = due_date
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(FollowUpError::MissingField("due_date"))?;
    let due = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| FollowUpError::InvalidDate(raw.to_string()))?;

    let mut item = existing(conn, id)?;
    store_reschedule(conn, id, due)?;
    tracing::info!(followup_id = id, %due, "Follow-up rescheduled");
    item.due_date = due;
    item.status = FollowUpStatus::Upcoming;
    Ok(item)
}

fn existing(conn: &Connection, id: &str) -> Result<FollowUpItem, FollowUpError> {
    get_followup(conn, id)?.ok_or_else(|| FollowUpError::FollowUpNotFound(id.to_string()))
}

// ─── Templates ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    pub subject: String,
    pub body: String,
}

pub fn message_template(kind: MessageType, patient_name: &str, clinic: &str) -> MessageTemplate {
    let (subject, body) = match kind {
        MessageType::AppointmentReminder => (
            format!("Appointment Reminder — {clinic}"),
            format!(
                "Dear {patient_name}, this is a reminder about your upcoming appointment. \
                 Please arrive 10 minutes early and bring any recent lab reports. \
                 Reply to confirm. — {clinic}"
            ),
        ),
        MessageType::LabResults => (
            format!("Lab Results Follow-up — {clinic}"),
            format!(
                "Dear {patient_name}, your lab results are ready for review. \
                 Please schedule a visit at your earliest convenience. — {clinic}"
            ),
        ),
        MessageType::MedicationCheck => (
            format!("Medication Check-in — {clinic}"),
            format!(
                "Dear {patient_name}, we are checking in on your medication. \
                 How are you feeling? Any side effects? Please reply or call us. — {clinic}"
            ),
        ),
    };
    MessageTemplate { subject, body }
}

// ─── Sending ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    pub patient_id: Option<String>,
    pub message_type: Option<String>,
    /// Free-text body replacing the template.
    pub message: Option<String>,
    pub send_email: Option<bool>,
    pub send_sms: Option<bool>,
}

/// A message ready to go out, with its resolved recipients.
#[derive(Debug, Clone)]
pub struct PreparedMessage {
    pub patient_id: String,
    pub patient_name: String,
    pub subject: String,
    pub body: String,
    /// (channel, recipient)
    pub targets: Vec<(MessageChannel, String)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub message_id: String,
    pub channel: MessageChannel,
    pub recipient: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    pub patient_name: String,
    pub channels: Vec<MessageChannel>,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub deliveries: Vec<Delivery>,
}

/// Resolve patient, template and channels.
///
/// With no channel flags, email is used when the patient has an address and
/// SMS otherwise.
pub fn prepare_message(
    conn: &Connection,
    req: &SendRequest,
    clinic_name: &str,
) -> Result<PreparedMessage, FollowUpError> {
    let patient_id = req
        .patient_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(FollowUpError::MissingField("patient_id"))?;
    let patient = get_patient(conn, patient_id)?
        .ok_or_else(|| FollowUpError::PatientNotFound(patient_id.to_string()))?;

    let kind = req
        .message_type
        .as_deref()
        .and_then(|t| MessageType::from_str(t.trim()).ok())
        .unwrap_or(MessageType::AppointmentReminder);
    let template = message_template(kind, &patient.name, clinic_name);
    let body = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or(template.body);

    let targets = select_targets(&patient, req.send_email, req.send_sms)?;

    Ok(PreparedMessage {
        patient_id: patient.id,
        patient_name: patient.name,
        subject: template.subject,
        body,
        targets,
    })
}

fn select_targets(
    patient: &Patient,
    send_email: Option<bool>,
    send_sms: Option<bool>,
) -> Result<Vec<(MessageChannel, String)>, FollowUpError> {
    let email = patient.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    let (want_email, want_sms) = match (send_email, send_sms) {
        (None, None) => (email.is_some(), email.is_none()),
        (e, s) => (e.unwrap_or(false), s.unwrap_or(false)),
    };

    let mut targets = Vec::new();
    if want_email {
        let address = email.ok_or_else(|| FollowUpError::NoEmailAddress(patient.name.clone()))?;
        targets.push((MessageChannel::Email, address.to_string()));
    }
    if want_sms {
        targets.push((MessageChannel::Sms, patient.phone.clone()));
    }
    if targets.is_empty() {
        return Err(FollowUpError::NoChannel);
    }
    Ok(targets)
}

/// Client-facing reason on a failed delivery. Provider detail stays in the log.
pub const DELIVERY_FAILED: &str = "Email delivery failed";

/// Outcome of handing a message to its channels.
#[derive(Debug)]
pub struct DeliveryBatch {
    pub deliveries: Vec<Delivery>,
    /// Provider error behind the last failed email, if any.
    pub email_failure: Option<VoiceError>,
}

impl DeliveryBatch {
    /// True when every delivery failed.
    pub fn nothing_sent(&self) -> bool {
        !self.deliveries.is_empty()
            && self.deliveries.iter().all(|d| d.status == DeliveryStatus::Failed)
    }
}

/// Hand the message to each channel. Blocking: run off the async runtime.
///
/// SMS has no provider and is queued in the outbox. A failed email is
/// recorded on its delivery with [`DELIVERY_FAILED`].
pub fn deliver(message: &PreparedMessage, mailer: &dyn Mailer) -> DeliveryBatch {
    let mut email_failure = None;
    let deliveries = message
        .targets
        .iter()
        .map(|(channel, recipient)| {
            let mut delivery = Delivery {
                message_id: new_id("msg"),
                channel: *channel,
                recipient: recipient.clone(),
                status: DeliveryStatus::Queued,
                provider_id: None,
                error: None,
            };
            if *channel == MessageChannel::Email {
                let email = OutgoingEmail {
                    to: recipient.clone(),
                    subject: message.subject.clone(),
                    body: message.body.clone(),
                };
                match mailer.send(&email) {
                    Ok(id) => {
                        delivery.status = DeliveryStatus::Sent;
                        delivery.provider_id = Some(id);
                    }
                    Err(e) => {
                        tracing::warn!(patient_id = %message.patient_id, "Follow-up email failed: {e}");
                        delivery.status = DeliveryStatus::Failed;
                        delivery.error = Some(DELIVERY_FAILED.to_string());
                        email_failure = Some(e);
                    }
                }
            }
            delivery
        })
        .collect();
    DeliveryBatch {
        deliveries,
        email_failure,
    }
}

/// Persist every delivery in the outbox and build the response.
pub fn record_deliveries(
    conn: &Connection,
    message: &PreparedMessage,
    deliveries: Vec<Delivery>,
    sent_at: DateTime<Utc>,
) -> Result<SendOutcome, DatabaseError> {
    for d in &deliveries {
        insert_followup_message(
            conn,
            &FollowUpMessage {
                id: d.message_id.clone(),
                patient_id: message.patient_id.clone(),
                channel: d.channel,
                recipient: d.recipient.clone(),
                subject: message.subject.clone(),
                body: message.body.clone(),
                status: d.status,
                provider_id: d.provider_id.clone(),
                sent_at,
            },
        )?;
    }

    let success = deliveries.iter().all(|d| d.status != DeliveryStatus::Failed);
    tracing::info!(
        patient_id = %message.patient_id,
        deliveries = deliveries.len(),
        success,
        "Follow-up message recorded"
    );
    Ok(SendOutcome {
        success,
        patient_name: message.patient_name.clone(),
        channels: deliveries.iter().map(|d| d.channel).collect(),
        subject: message.subject.clone(),
        body: message.body.clone(),
        sent_at,
        deliveries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::get_followup_messages;
    use crate::db::seed::seed_demo_data;
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::Urgency;
    use crate::voice::MockMailer;

    fn seeded() -> Connection {
        let conn = open_memory_database().unwrap();
        seed_demo_data(&conn).unwrap();
        conn
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn send_to(patient_id: &str) -> SendRequest {
        SendRequest {
            patient_id: Some(patient_id.into()),
            ..Default::default()
        }
    }

    #[test]
    fn queue_puts_overdue_first_then_urgency() {
        let conn = seeded();
        let queue = followup_queue(&conn, d(2026, 2, 18)).unwrap();
        let ids: Vec<&str> = queue.followups.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["fu_004", "fu_002", "fu_001", "fu_003", "fu_005"]);
        assert_eq!(queue.total, 5);
        assert_eq!(queue.overdue, 1);
        assert_eq!(queue.upcoming, 4);
    }

    #[test]
    fn queue_flags_past_due_items_overdue() {
        let conn = seeded();
        // By 2026-03-15, fu_002 (02-21) and fu_001 (03-10) are past due.
        let queue = followup_queue(&conn, d(2026, 3, 15)).unwrap();
        assert_eq!(queue.overdue, 3);
        let ids: Vec<&str> = queue.followups.iter().take(3).map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["fu_004", "fu_002", "fu_001"]);
    }

    #[test]
    fn order_breaks_urgency_ties_by_due_date() {
        let make = |id: &str, due: NaiveDate| FollowUpItem {
            id: id.into(),
            patient_id: "p".into(),
            patient_name: "P".into(),
            reason: "r".into(),
            due_date: due,
            status: FollowUpStatus::Upcoming,
            urgency: Urgency::High,
            last_visit: d(2026, 1, 1),
        };
        let mut items = vec![make("late", d(2026, 5, 1)), make("early", d(2026, 4, 1))];
        items.sort_by(queue_order);
        assert_eq!(items[0].id, "early");
    }

    #[test]
    fn completed_items_leave_the_queue() {
        let conn = seeded();
        let item = complete_followup(&conn, "fu_004").unwrap();
        assert_eq!(item.status, FollowUpStatus::Completed);

        let queue = followup_queue(&conn, d(2026, 2, 18)).unwrap();
        assert_eq!(queue.total, 4);
        assert_eq!(queue.overdue, 0);
        assert!(matches!(
            complete_followup(&conn, "fu_404").unwrap_err(),
            FollowUpError::FollowUpNotFound(_)
        ));
    }

    #[test]
    fn reschedule_sets_upcoming_and_validates_date() {
        let conn = seeded();
        let item = reschedule_followup(&conn, "fu_004", Some("2026-03-20")).unwrap();
        assert_eq!(item.status, FollowUpStatus::Upcoming);
        assert_eq!(item.due_date, d(2026, 3, 20));

        assert!(matches!(
            reschedule_followup(&conn, "fu_004", None).unwrap_err(),
            FollowUpError::MissingField("due_date")
        ));
        assert!(matches!(
            reschedule_followup(&conn, "fu_004", Some("next week")).unwrap_err(),
            FollowUpError::InvalidDate(_)
        ));
    }

    #[test]
    fn templates_carry_clinic_name() {
        let t = message_template(MessageType::LabResults, "Kavitha Suresh", "Sunrise Clinic");
        assert_eq!(t.subject, "Lab Results Follow-up — Sunrise Clinic");
        assert!(t.body.starts_with("Dear Kavitha Suresh, your lab results are ready"));
        assert!(t.body.ends_with("— Sunrise Clinic"));
    }

    #[test]
    fn default_channel_follows_email_on_file() {
        let conn = seeded();
        let with_email = prepare_message(&conn, &send_to("pat_002"), "Clinic").unwrap();
        assert_eq!(
            with_email.targets,
            vec![(MessageChannel::Email, "kavitha.s@example.com".to_string())]
        );

        // pat_003 has no email address.
        let without = prepare_message(&conn, &send_to("pat_003"), "Clinic").unwrap();
        assert_eq!(without.targets[0].0, MessageChannel::Sms);
    }

    #[test]
    fn explicit_email_without_address_is_rejected() {
        let conn = seeded();
        let mut req = send_to("pat_003");
        req.send_email = Some(true);
        assert!(matches!(
            prepare_message(&conn, &req, "Clinic").unwrap_err(),
            FollowUpError::NoEmailAddress(_)
        ));

        let mut none = send_to("pat_001");
        none.send_email = Some(false);
        assert!(matches!(
            prepare_message(&conn, &none, "Clinic").unwrap_err(),
            FollowUpError::NoChannel
        ));
    }

    #[test]
    fn unknown_message_type_falls_back_and_message_overrides() {
        let conn = seeded();
        let mut req = send_to("pat_001");
        req.message_type = Some("birthday".into());
        let prepared = prepare_message(&conn, &req, "Clinic").unwrap();
        assert!(prepared.subject.starts_with("Appointment Reminder"));

        req.message = Some("Please call the clinic.".into());
        let custom = prepare_message(&conn, &req, "Clinic").unwrap();
        assert_eq!(custom.body, "Please call the clinic.");
    }

    #[test]
    fn send_emails_queues_sms_and_records_outbox() {
        let conn = seeded();
        let mailer = MockMailer::new();
        let mut req = send_to("pat_001");
        req.send_email = Some(true);
        req.send_sms = Some(true);

        let prepared = prepare_message(&conn, &req, "Clinic").unwrap();
        let batch = deliver(&prepared, &mailer);
        assert!(batch.email_failure.is_none());
        let outcome = record_deliveries(&conn, &prepared, batch.deliveries, Utc::now()).unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.channels, vec![MessageChannel::Email, MessageChannel::Sms]);
        assert_eq!(outcome.deliveries[0].status, DeliveryStatus::Sent);
        assert_eq!(outcome.deliveries[0].provider_id.as_deref(), Some("mock_1"));
        assert_eq!(outcome.deliveries[1].status, DeliveryStatus::Queued);
        assert_eq!(mailer.sent()[0].to, "ramesh.iyer@example.com");

        let outbox = get_followup_messages(&conn, "pat_001").unwrap();
        assert_eq!(outbox.len(), 2);
    }

    #[test]
    fn failed_email_is_recorded_without_provider_detail() {
        let conn = seeded();
        let prepared = prepare_message(&conn, &send_to("pat_002"), "Clinic").unwrap();
        let batch = deliver(&prepared, &MockMailer::failing(503, "mailbox service down"));
        assert!(matches!(
            batch.email_failure,
            Some(VoiceError::Upstream { status: 503, .. })
        ));
        let outcome =
            record_deliveries(&conn, &prepared, batch.deliveries, Utc::now()).unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.deliveries[0].status, DeliveryStatus::Failed);
        assert_eq!(outcome.deliveries[0].error.as_deref(), Some(DELIVERY_FAILED));
        assert_eq!(get_followup_messages(&conn, "pat_002").unwrap()[0].status, DeliveryStatus::Failed);
    }

    #[test]
    fn nothing_sent_only_when_every_channel_failed() {
        let conn = seeded();
        let failing = MockMailer::failing(401, "bad key");

        let prepared = prepare_message(&conn, &send_to("pat_002"), "Clinic").unwrap();
        assert!(deliver(&prepared, &failing).nothing_sent());

        let mut both = send_to("pat_002");
        both.send_email = Some(true);
        both.send_sms = Some(true);
        let prepared = prepare_message(&conn, &both, "Clinic").unwrap();
        let batch = deliver(&prepared, &failing);
        assert!(batch.email_failure.is_some());
        assert!(!batch.nothing_sent());
    }

    #[test]
    fn unknown_patient_is_not_found() {
        let conn = seeded();
        assert!(matches!(
            prepare_message(&conn, &send_to("pat_404"), "Clinic").unwrap_err(),
            FollowUpError::PatientNotFound(_)
        ));
        assert!(matches!(
            prepare_message(&conn, &SendRequest::default(), "Clinic").unwrap_err(),
            FollowUpError::MissingField("patient_id")
        ));
    }
}
