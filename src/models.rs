pub mod alert;
pub mod appointment;
pub mod enums;
pub mod followup;
pub mod note;
pub mod patient;

pub use alert::*;
pub use appointment::*;
pub use followup::*;
pub use note::*;
pub use patient::*;

/// Prefixed opaque identifier, e.g. `note_3f2a…`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}
