//! Repository layer: entity-scoped database operations.
//!
//! One sub-module per table; every function borrows a `Connection` so
//! callers decide how the connection is shared.

mod alert;
mod appointment;
mod followup;
mod note;
mod patient;

pub use alert::*;
pub use appointment::*;
pub use followup::*;
pub use note::*;
pub use patient::*;
