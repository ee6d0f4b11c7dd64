use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The serde representation matches `as_str`, so the wire format and the
/// stored column value are the same string.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Gender {
    Male => "Male",
    Female => "Female",
    Other => "Other",
});

str_enum!(NoteMode {
    Dictate => "dictate",
    Summarize => "summarize",
});

str_enum!(AppointmentType {
    FollowUp => "follow_up",
    NewConsultation => "new_consultation",
    Procedure => "procedure",
    LabReview => "lab_review",
});

impl AppointmentType {
    pub const ALL: [AppointmentType; 4] = [
        AppointmentType::FollowUp,
        AppointmentType::NewConsultation,
        AppointmentType::Procedure,
        AppointmentType::LabReview,
    ];

    /// Human label used by the calendar and analytics views.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FollowUp => "Follow-up",
            Self::NewConsultation => "New Consultation",
            Self::Procedure => "Procedure",
            Self::LabReview => "Lab Review",
        }
    }
}

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

str_enum!(AlertSeverity {
    Critical => "critical",
    Warning => "warning",
    Info => "info",
});

str_enum!(FollowUpStatus {
    Overdue => "overdue",
    Upcoming => "upcoming",
    Completed => "completed",
});

str_enum!(Urgency {
    High => "high",
    Medium => "medium",
    Low => "low",
});

impl Urgency {
    /// Sort rank: high first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

str_enum!(MessageChannel {
    Email => "email",
    Sms => "sms",
});

str_enum!(DeliveryStatus {
    Sent => "sent",
    Queued => "queued",
    Failed => "failed",
});

str_enum!(MessageType {
    AppointmentReminder => "appointment_reminder",
    LabResults => "lab_results",
    MedicationCheck => "medication_check",
});

str_enum!(MedMode {
    Dictate => "dictate",
    Summarize => "summarize",
    Pattern => "pattern",
    Booking => "booking",
    FollowUp => "followup",
});

impl MedMode {
    pub const ALL: [MedMode; 5] = [
        MedMode::Dictate,
        MedMode::Summarize,
        MedMode::Pattern,
        MedMode::Booking,
        MedMode::FollowUp,
    ];
}
