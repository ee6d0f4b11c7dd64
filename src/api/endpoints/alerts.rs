//! `POST /api/check-patterns`

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{optional_json, ApiContext, PatientIdRequest};
use crate::patients::{self, PatternReport};

/// No body, no `patient_id` or `"all"` scans every patient. A malformed
/// body is rejected.
pub async fn check(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<PatternReport>, ApiError> {
    let req: PatientIdRequest = optional_json(&body)?;
    let conn = ctx.core.lock_db()?;
    Ok(Json(patients::check_patterns(&conn, req.patient_id.as_deref())?))
}
