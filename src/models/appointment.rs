use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::enums::{AppointmentStatus, AppointmentType};

/// "9", "9:30", "9:30 AM", "09:30am", "14:00".
static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2})(?::(\d{2}))?\s*([AaPp][Mm])?\s*$").unwrap()
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub date: NaiveDate,
    /// Clinic display time, e.g. "10:30 AM".
    pub time: String,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub reason: String,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub language: String,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Parsed start time, `None` when the stored display string is not a clock time.
    pub fn start_time(&self) -> Option<NaiveTime> {
        parse_clock_time(&self.time)
    }
}

/// Parse a clinic clock string into a time of day.
///
/// Accepts 12-hour times with an AM/PM suffix and plain 24-hour times.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let caps = CLOCK_TIME.captures(raw)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    if let Some(meridiem) = caps.get(3) {
        if hour == 0 || hour > 12 {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Render a time the way the calendar shows it: "9:00 AM", "2:30 PM".
pub fn format_clock_time(time: NaiveTime) -> String {
    let (pm, hour) = time.hour12();
    format!(
        "{}:{:02} {}",
        hour,
        time.minute(),
        if pm { "PM" } else { "AM" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn parses_twelve_hour_times() {
        assert_eq!(parse_clock_time("10:30 AM"), Some(t(10, 30)));
        assert_eq!(parse_clock_time("2:00 PM"), Some(t(14, 0)));
        assert_eq!(parse_clock_time("12:00 PM"), Some(t(12, 0)));
        assert_eq!(parse_clock_time("12:30 am"), Some(t(0, 30)));
        assert_eq!(parse_clock_time("9 AM"), Some(t(9, 0)));
    }

    #[test]
    fn parses_twenty_four_hour_times() {
        assert_eq!(parse_clock_time("14:00"), Some(t(14, 0)));
        assert_eq!(parse_clock_time("09:30"), Some(t(9, 30)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_clock_time("lunchtime"), None);
        assert_eq!(parse_clock_time("13:00 PM"), None);
        assert_eq!(parse_clock_time("25:00"), None);
        assert_eq!(parse_clock_time("10:75"), None);
    }

    #[test]
    fn formats_for_calendar() {
        assert_eq!(format_clock_time(t(9, 0)), "9:00 AM");
        assert_eq!(format_clock_time(t(14, 30)), "2:30 PM");
        assert_eq!(format_clock_time(t(12, 0)), "12:00 PM");
    }
}
