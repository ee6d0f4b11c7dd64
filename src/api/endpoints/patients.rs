//! Patient roster and record endpoints.
//!
//! - `GET /api/patients`: roster with visit and alert counts
//! - `GET /api/patients/:id`: full record
//! - `POST /api/lookup-patient`: resolve a spoken name
//! - `POST /api/get-patient-history`
//! - `POST /api/summarize-history`: memoized per patient

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{optional_json, ApiContext, PatientIdRequest};
use crate::patients::{self, LookupResult, PatientDetail, PatientHistory, PatientSummary, RosterEntry};

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<RosterEntry>>, ApiError> {
    let conn = ctx.core.lock_db()?;
    Ok(Json(patients::list_roster(&conn)?))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<PatientDetail>, ApiError> {
    let conn = ctx.core.lock_db()?;
    patients::patient_detail(&conn, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Patient not found: {id}")))
}

#[derive(Debug, Default, Deserialize)]
pub struct LookupRequest {
    pub name: Option<String>,
}

/// Body is optional: no body (or no name) lists every patient.
pub async fn lookup(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<LookupResult>, ApiError> {
    let req: LookupRequest = optional_json(&body)?;
    let conn = ctx.core.lock_db()?;
    Ok(Json(patients::lookup_patient(&conn, req.name.as_deref())?))
}

pub async fn history(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PatientIdRequest>, JsonRejection>,
) -> Result<Json<PatientHistory>, ApiError> {
    let Json(req) = payload?;
    let patient_id = req.require()?;
    let conn = ctx.core.lock_db()?;
    patients::patient_history(&conn, patient_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Patient not found: {patient_id}")))
}

#[derive(Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: PatientSummary,
    pub cached: bool,
}

pub async fn summarize(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PatientIdRequest>, JsonRejection>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let Json(req) = payload?;
    let patient_id = req.require()?;
    let lookup = ctx
        .core
        .summarize(patient_id, Utc::now())?
        .ok_or_else(|| ApiError::NotFound(format!("Patient not found: {patient_id}")))?;
    Ok(Json(SummaryResponse {
        summary: lookup.summary,
        cached: lookup.cached,
    }))
}
