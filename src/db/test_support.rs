//! Shared fixtures for store-level tests.

use crate::models::enums::Gender;
use crate::models::{EmergencyContact, Medication, Patient};

pub(crate) fn make_patient(id: &str, name: &str) -> Patient {
    Patient {
        id: id.into(),
        name: name.into(),
        age: 58,
        gender: Gender::Male,
        phone: "+91 98450 11223".into(),
        email: None,
        blood_group: "B+".into(),
        language: "Tamil".into(),
        allergies: vec!["Sulfa drugs".into()],
        chronic_conditions: vec!["Type 2 Diabetes".into(), "Hypertension".into()],
        current_medications: vec![Medication {
            name: "Metformin".into(),
            dosage: "500mg".into(),
            frequency: "BD".into(),
        }],
        emergency_contact: EmergencyContact {
            name: "Lakshmi Iyer".into(),
            relation: "Wife".into(),
            phone: "+91 98450 11224".into(),
        },
    }
}
