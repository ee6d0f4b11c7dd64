use serde::{Deserialize, Serialize};

use super::enums::Gender;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
}

impl Medication {
    /// "Metformin 500mg BD" style one-liner.
    pub fn display(&self) -> String {
        format!("{} {} {}", self.name, self.dosage, self.frequency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub relation: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub blood_group: String,
    pub language: String,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
    #[serde(default)]
    pub current_medications: Vec<Medication>,
    pub emergency_contact: EmergencyContact,
}
