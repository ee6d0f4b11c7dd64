//! Follow-up queue endpoints.
//!
//! - `POST /api/get-followups`
//! - `POST /api/send-followup`: email through the provider, SMS into the outbox.
//!   Every attempt is recorded; when nothing went out the provider error
//!   maps to 502 (or 500 when unconfigured).
//! - `POST /api/followups/:id/complete`
//! - `POST /api/followups/:id/reschedule`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::followups::{self, DeliveryBatch, FollowUpQueue, SendOutcome, SendRequest};
use crate::models::FollowUpItem;

pub async fn queue(State(ctx): State<ApiContext>) -> Result<Json<FollowUpQueue>, ApiError> {
    let today = ctx.today();
    let conn = ctx.core.lock_db()?;
    Ok(Json(followups::followup_queue(&conn, today)?))
}

pub async fn send(
    State(ctx): State<ApiContext>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SendOutcome>, ApiError> {
    let Json(req) = payload?;
    let prepared = {
        let conn = ctx.core.lock_db()?;
        followups::prepare_message(&conn, &req, &ctx.core.config.clinic_name)?
    };

    // The mailer is a blocking client.
    let mailer = ctx.core.mailer();
    let (prepared, batch) = tokio::task::spawn_blocking(move || {
        let batch = followups::deliver(&prepared, mailer.as_ref());
        (prepared, batch)
    })
    .await?;

    let nothing_sent = batch.nothing_sent();
    let DeliveryBatch {
        deliveries,
        email_failure,
    } = batch;
    let outcome = {
        let conn = ctx.core.lock_db()?;
        followups::record_deliveries(&conn, &prepared, deliveries, Utc::now())?
    };

    // Nothing went out: surface the provider failure as 502/500.
    if let (true, Some(err)) = (nothing_sent, email_failure) {
        return Err(ApiError::from(err));
    }
    Ok(Json(outcome))
}

pub async fn complete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<FollowUpItem>, ApiError> {
    let conn = ctx.core.lock_db()?;
    Ok(Json(followups::complete_followup(&conn, &id)?))
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub due_date: Option<String>,
}

pub async fn reschedule(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    payload: Result<Json<RescheduleRequest>, JsonRejection>,
) -> Result<Json<FollowUpItem>, ApiError> {
    let Json(req) = payload?;
    let conn = ctx.core.lock_db()?;
    Ok(Json(followups::reschedule_followup(&conn, &id, req.due_date.as_deref())?))
}
