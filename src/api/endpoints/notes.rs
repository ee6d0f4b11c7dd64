//! `POST /api/save-note`

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::patients::{NoteRequest, SavedNote};

pub async fn save(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NoteRequest>, JsonRejection>,
) -> Result<Json<SavedNote>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(ctx.core.record_note(&req, Utc::now())?))
}
