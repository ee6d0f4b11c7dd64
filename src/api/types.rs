//! Shared types for the REST layer.

use std::sync::Arc;

use axum::body::Bytes;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::core_state::CoreState;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }

    /// Clinic-local "today". The clinic runs on UTC dates.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Body carrying just a patient id, used by several tool endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PatientIdRequest {
    pub patient_id: Option<String>,
}

impl PatientIdRequest {
    pub fn require(&self) -> Result<&str, ApiError> {
        self.patient_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::BadRequest("patient_id is required".into()))
    }
}

/// Parse a body that may be left out. An empty body yields `T::default()`;
/// anything else must be valid JSON.
pub fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))
}
