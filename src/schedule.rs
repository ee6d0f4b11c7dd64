//! Clinic calendar rules: opening hours, slot availability, booking and
//! appointment status changes.
//!
//! Weekdays run 09:00–17:00 with a 13:00–14:00 lunch break, Saturdays
//! 09:00–13:00, Sundays closed. Every appointment occupies one 30-minute
//! slot; a slot is taken while a `scheduled` appointment sits on it.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::repository::{
    get_appointment, get_patient, insert_appointment, scheduled_slots_on,
    update_appointment_status,
};
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, AppointmentType};
use crate::models::{format_clock_time, new_id, parse_clock_time, Appointment};

pub const SLOT_MINUTES: u32 = 30;
pub const MAX_SUGGESTIONS: usize = 3;
const DEFAULT_LANGUAGE: &str = "English";
const UNKNOWN_PATIENT: &str = "Unknown";

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid time '{0}', expected e.g. 10:30 AM")]
    InvalidTime(String),

    #[error("Unknown appointment type '{0}'")]
    InvalidType(String),

    #[error("{date} at {time} is outside clinic hours")]
    OutsideHours { date: NaiveDate, time: String },

    #[error("The slot on {date} at {time} is already booked")]
    SlotTaken { date: NaiveDate, time: String },

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(String),

    #[error("Cannot change appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ─── Opening hours ────────────────────────────────────────────────────────────

/// Opening window for one day, in minutes after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningHours {
    pub open: u32,
    pub close: u32,
    pub lunch: Option<(u32, u32)>,
}

pub fn opening_hours(weekday: Weekday) -> Option<OpeningHours> {
    match weekday {
        Weekday::Sun => None,
        Weekday::Sat => Some(OpeningHours {
            open: 9 * 60,
            close: 13 * 60,
            lunch: None,
        }),
        _ => Some(OpeningHours {
            open: 9 * 60,
            close: 17 * 60,
            lunch: Some((13 * 60, 14 * 60)),
        }),
    }
}

impl OpeningHours {
    /// Start minute of every bookable slot, in order.
    pub fn slots(&self) -> Vec<u32> {
        (self.open..self.close)
            .step_by(SLOT_MINUTES as usize)
            .filter(|&m| m + SLOT_MINUTES <= self.close)
            .filter(|&m| match self.lunch {
                Some((start, end)) => m < start || m >= end,
                None => true,
            })
            .collect()
    }
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_of(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// Whether `time` starts a slot the clinic offers on `date`.
pub fn is_clinic_slot(date: NaiveDate, time: NaiveTime) -> bool {
    opening_hours(date.weekday())
        .map(|hours| hours.slots().contains(&minutes_of(time)))
        .unwrap_or(false)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ScheduleError::InvalidDate(raw.to_string()))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, ScheduleError> {
    parse_clock_time(raw).ok_or_else(|| ScheduleError::InvalidTime(raw.to_string()))
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ScheduleError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ScheduleError::MissingField(field))
}

// ─── Availability ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotQuery {
    pub date: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotCheck {
    pub available: bool,
    pub date: NaiveDate,
    pub time: String,
    pub message: String,
    pub suggestions: Vec<String>,
}

/// Unbooked slots on `date` in clock order. Empty when the clinic is closed.
pub fn free_slots(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<NaiveTime>, DatabaseError> {
    let Some(hours) = opening_hours(date.weekday()) else {
        return Ok(Vec::new());
    };
    let taken = scheduled_slots_on(conn, date)?;
    Ok(hours
        .slots()
        .into_iter()
        .filter(|m| !taken.contains(m))
        .filter_map(time_of)
        .collect())
}

pub fn check_slot(conn: &Connection, query: &SlotQuery) -> Result<SlotCheck, ScheduleError> {
    let date = parse_date(required(&query.date, "date")?)?;
    let time = parse_time(required(&query.time, "time")?)?;
    let time_label = format_clock_time(time);

    let free = free_slots(conn, date)?;
    let requested = minutes_of(time);

    let (available, message) = if opening_hours(date.weekday()).is_none() {
        (false, format!("The clinic is closed on {}.", weekday_name(date.weekday())))
    } else if !is_clinic_slot(date, time) {
        (false, format!("{time_label} on {date} is outside clinic hours."))
    } else if free.iter().any(|t| minutes_of(*t) == requested) {
        (true, format!("The slot on {date} at {time_label} is available."))
    } else {
        (false, format!("The slot on {date} at {time_label} is already booked."))
    };

    let suggestions = if available {
        Vec::new()
    } else {
        nearest(&free, requested)
            .into_iter()
            .map(format_clock_time)
            .collect()
    };

    Ok(SlotCheck {
        available,
        date,
        time: time_label,
        message,
        suggestions,
    })
}

/// Up to `MAX_SUGGESTIONS` free slots closest to `requested`, in clock order.
fn nearest(free: &[NaiveTime], requested: u32) -> Vec<NaiveTime> {
    let mut by_distance: Vec<NaiveTime> = free.to_vec();
    by_distance.sort_by_key(|t| (minutes_of(*t).abs_diff(requested), minutes_of(*t)));
    by_distance.truncate(MAX_SUGGESTIONS);
    by_distance.sort();
    by_distance
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mondays",
        Weekday::Tue => "Tuesdays",
        Weekday::Wed => "Wednesdays",
        Weekday::Thu => "Thursdays",
        Weekday::Fri => "Fridays",
        Weekday::Sat => "Saturdays",
        Weekday::Sun => "Sundays",
    }
}

// ─── Booking ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(rename = "type")]
    pub appointment_type: Option<String>,
    pub reason: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub success: bool,
    pub appointment_id: String,
    pub patient_name: String,
    pub date: NaiveDate,
    pub time: String,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub reason: String,
    pub message: String,
}

/// Validate and store a new appointment.
///
/// Unknown patient ids are accepted: walk-in callers are booked under the
/// name they gave, or "Unknown".
pub fn book_appointment(
    conn: &Connection,
    req: &BookingRequest,
) -> Result<BookingConfirmation, ScheduleError> {
    let patient_id = required(&req.patient_id, "patient_id")?;
    let date_raw = required(&req.date, "date")?;
    let time_raw = required(&req.time, "time")?;
    let reason = required(&req.reason, "reason")?;

    let date = parse_date(date_raw)?;
    let time = parse_time(time_raw)?;
    let appointment_type = match req.appointment_type.as_deref().map(str::trim) {
        None | Some("") => AppointmentType::FollowUp,
        Some(raw) => AppointmentType::from_str(raw)
            .map_err(|_| ScheduleError::InvalidType(raw.to_string()))?,
    };

    let time_label = format_clock_time(time);
    if !is_clinic_slot(date, time) {
        return Err(ScheduleError::OutsideHours { date, time: time_label });
    }
    if scheduled_slots_on(conn, date)?.contains(&minutes_of(time)) {
        return Err(ScheduleError::SlotTaken { date, time: time_label });
    }

    let patient = get_patient(conn, patient_id)?;
    let given_name = req.patient_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let patient_name = given_name
        .map(str::to_string)
        .or_else(|| patient.as_ref().map(|p| p.name.clone()))
        .unwrap_or_else(|| UNKNOWN_PATIENT.to_string());
    let language = req
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .or_else(|| patient.as_ref().map(|p| p.language.clone()))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let appointment = Appointment {
        id: new_id("apt"),
        patient_id: patient_id.to_string(),
        patient_name: patient_name.clone(),
        date,
        time: time_label.clone(),
        appointment_type,
        reason: reason.to_string(),
        status: AppointmentStatus::Scheduled,
        language,
        created_at: Utc::now(),
    };
    insert_appointment(conn, &appointment)?;

    tracing::info!(
        appointment_id = %appointment.id,
        patient_id,
        %date,
        time = %time_label,
        "Appointment booked"
    );

    Ok(BookingConfirmation {
        success: true,
        message: format!("Appointment scheduled for {patient_name} on {date} at {time_label}"),
        appointment_id: appointment.id,
        patient_name,
        date,
        time: time_label,
        appointment_type,
        reason: appointment.reason,
    })
}

// ─── Status ───────────────────────────────────────────────────────────────────

/// Close out a scheduled appointment. Only `scheduled` appointments move,
/// and never back to `scheduled`.
pub fn set_appointment_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
) -> Result<Appointment, ScheduleError> {
    let mut appointment =
        get_appointment(conn, id)?.ok_or_else(|| ScheduleError::AppointmentNotFound(id.into()))?;

    if appointment.status != AppointmentStatus::Scheduled || status == AppointmentStatus::Scheduled
    {
        return Err(ScheduleError::InvalidTransition {
            from: appointment.status,
            to: status,
        });
    }

    update_appointment_status(conn, id, status)?;
    tracing::info!(appointment_id = id, from = %appointment.status, to = %status, "Appointment status changed");
    appointment.status = status;
    Ok(appointment)
}
