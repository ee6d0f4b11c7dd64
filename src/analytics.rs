//! Dashboard figures derived from the appointment calendar.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Timelike};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::repository::{count_patients, list_appointments, AppointmentFilter};
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, AppointmentType};
use crate::models::Appointment;

// ─── Header stats ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderStats {
    pub today_count: usize,
    pub week_count: usize,
    pub patient_count: usize,
}

/// Monday and Sunday of the week containing `day`.
pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

pub fn header_stats(conn: &Connection, today: NaiveDate) -> Result<HeaderStats, DatabaseError> {
    let (monday, sunday) = week_bounds(today);
    let week = list_appointments(
        conn,
        &AppointmentFilter {
            from: Some(monday),
            to: Some(sunday),
            ..Default::default()
        },
    )?;
    Ok(HeaderStats {
        today_count: week.iter().filter(|a| a.date == today).count(),
        week_count: week.len(),
        patient_count: count_patients(conn)?,
    })
}

// ─── Grouping ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Day,
    Week,
    Month,
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("group_by must be day, week or month (got '{other}')")),
        }
    }
}

impl GroupBy {
    /// Sortable bucket key and a display label for `date`.
    fn bucket(&self, date: NaiveDate) -> (String, String) {
        match self {
            Self::Day => (date.to_string(), date.format("%a").to_string()),
            Self::Week => {
                let (monday, _) = week_bounds(date);
                let iso = date.iso_week();
                (
                    monday.to_string(),
                    format!("{}-W{:02}", iso.year(), iso.week()),
                )
            }
            Self::Month => (date.format("%Y-%m").to_string(), date.format("%b %Y").to_string()),
        }
    }
}

/// Appointment volume in one period, split by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VolumeBucket {
    pub period: String,
    pub label: String,
    pub follow_up: usize,
    pub new_consultation: usize,
    pub procedure: usize,
    pub lab_review: usize,
    pub total: usize,
}

impl VolumeBucket {
    fn add(&mut self, kind: AppointmentType) {
        match kind {
            AppointmentType::FollowUp => self.follow_up += 1,
            AppointmentType::NewConsultation => self.new_consultation += 1,
            AppointmentType::Procedure => self.procedure += 1,
            AppointmentType::LabReview => self.lab_review += 1,
        }
        self.total += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotCount {
    pub time: String,
    pub count: usize,
}

/// Outcome percentages over appointments that are no longer `scheduled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutcomeRates {
    pub resolved: usize,
    pub completion_rate: f64,
    pub cancellation_rate: f64,
    pub no_show_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub group_by: GroupBy,
    pub total_appointments: usize,
    pub unique_days: usize,
    pub average_per_day: f64,
    /// Every calendar entry is created through the booking tool.
    pub voice_booked: usize,
    pub unique_languages: usize,
    pub volume: Vec<VolumeBucket>,
    pub by_language: Vec<NamedCount>,
    pub by_type: Vec<NamedCount>,
    pub by_time_slot: Vec<SlotCount>,
    pub outcomes: OutcomeRates,
}

pub fn analytics(conn: &Connection, group_by: GroupBy) -> Result<Analytics, DatabaseError> {
    let appointments = list_appointments(conn, &AppointmentFilter::default())?;
    Ok(summarize_appointments(&appointments, group_by))
}

pub fn summarize_appointments(appointments: &[Appointment], group_by: GroupBy) -> Analytics {
    let total = appointments.len();
    let unique_days = appointments
        .iter()
        .map(|a| a.date)
        .collect::<HashSet<_>>()
        .len();
    let unique_languages = appointments
        .iter()
        .map(|a| a.language.trim())
        .filter(|l| !l.is_empty())
        .collect::<HashSet<_>>()
        .len();

    let mut volume: BTreeMap<String, VolumeBucket> = BTreeMap::new();
    for apt in appointments {
        let (period, label) = group_by.bucket(apt.date);
        volume
            .entry(period.clone())
            .or_insert_with(|| VolumeBucket {
                period,
                label,
                ..Default::default()
            })
            .add(apt.appointment_type);
    }

    Analytics {
        group_by,
        total_appointments: total,
        unique_days,
        average_per_day: if unique_days == 0 {
            0.0
        } else {
            round1(total as f64 / unique_days as f64)
        },
        voice_booked: total,
        unique_languages,
        volume: volume.into_values().collect(),
        by_language: ranked(appointments.iter().map(|a| {
            let lang = a.language.trim();
            if lang.is_empty() { "Unknown" } else { lang }.to_string()
        })),
        by_type: ranked(appointments.iter().map(|a| a.appointment_type.label().to_string())),
        by_time_slot: time_slots(appointments),
        outcomes: outcome_rates(appointments),
    }
}

/// Counts per name, largest first, ties by name.
fn ranked(names: impl Iterator<Item = String>) -> Vec<NamedCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in names {
        *counts.entry(name).or_default() += 1;
    }
    let mut out: Vec<NamedCount> = counts
        .into_iter()
        .map(|(name, value)| NamedCount { name, value })
        .collect();
    out.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    out
}

/// Appointments per starting hour ("9 AM", "2 PM"), in clock order.
/// Unparseable times are grouped under "Unknown" at the end.
fn time_slots(appointments: &[Appointment]) -> Vec<SlotCount> {
    let mut by_hour: BTreeMap<u32, usize> = BTreeMap::new();
    let mut unknown = 0;
    for apt in appointments {
        match apt.start_time() {
            Some(t) => *by_hour.entry(t.hour()).or_default() += 1,
            None => unknown += 1,
        }
    }

    let mut slots: Vec<SlotCount> = by_hour
        .into_iter()
        .map(|(hour, count)| SlotCount {
            time: hour_label(hour),
            count,
        })
        .collect();
    if unknown > 0 {
        slots.push(SlotCount {
            time: "Unknown".to_string(),
            count: unknown,
        });
    }
    slots
}

fn hour_label(hour: u32) -> String {
    match hour {
        0 => "12 AM".to_string(),
        1..=11 => format!("{hour} AM"),
        12 => "12 PM".to_string(),
        _ => format!("{} PM", hour - 12),
    }
}

fn outcome_rates(appointments: &[Appointment]) -> OutcomeRates {
    let count = |status: AppointmentStatus| appointments.iter().filter(|a| a.status == status).count();
    let completed = count(AppointmentStatus::Completed);
    let cancelled = count(AppointmentStatus::Cancelled);
    let no_show = count(AppointmentStatus::NoShow);
    let resolved = completed + cancelled + no_show;
    if resolved == 0 {
        return OutcomeRates::default();
    }
    let pct = |n: usize| round1(n as f64 * 100.0 / resolved as f64);
    OutcomeRates {
        resolved,
        completion_rate: pct(completed),
        cancellation_rate: pct(cancelled),
        no_show_rate: pct(no_show),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
