//! REST handlers, one module per area of the desk.

pub mod agent;
pub mod alerts;
pub mod appointments;
pub mod followups;
pub mod health;
pub mod notes;
pub mod patients;
pub mod stats;
pub mod tts;
