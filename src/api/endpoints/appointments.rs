//! Calendar endpoints.
//!
//! - `GET /api/appointments` with optional date, range, patient and status filters
//! - `POST /api/book-appointment`
//! - `POST /api/check-schedule`
//! - `POST /api/appointments/:id/status`

use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository::{list_appointments, AppointmentFilter};
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;
use crate::schedule::{self, BookingConfirmation, BookingRequest, SlotCheck, SlotQuery};

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentQuery {
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub patient_id: Option<String>,
    pub status: Option<String>,
}

impl AppointmentQuery {
    fn into_filter(self) -> Result<AppointmentFilter, ApiError> {
        let date = |raw: Option<String>| -> Result<_, ApiError> {
            raw.filter(|d| !d.trim().is_empty())
                .map(|d| schedule::parse_date(&d))
                .transpose()
                .map_err(ApiError::from)
        };
        let status = self
            .status
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                AppointmentStatus::from_str(s.trim())
                    .map_err(|_| ApiError::BadRequest(format!("Unknown status: {s}")))
            })
            .transpose()?;
        Ok(AppointmentFilter {
            date: date(self.date)?,
            from: date(self.from)?,
            to: date(self.to)?,
            patient_id: self.patient_id.filter(|p| !p.trim().is_empty()),
            status,
        })
    }
}

#[derive(Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    query: Result<Query<AppointmentQuery>, QueryRejection>,
) -> Result<Json<AppointmentsResponse>, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let conn = ctx.core.lock_db()?;
    let appointments = list_appointments(&conn, &filter)?;
    Ok(Json(AppointmentsResponse { appointments }))
}

pub async fn book(
    State(ctx): State<ApiContext>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<BookingConfirmation>, ApiError> {
    let Json(req) = payload?;
    let conn = ctx.core.lock_db()?;
    Ok(Json(schedule::book_appointment(&conn, &req)?))
}

pub async fn check(
    State(ctx): State<ApiContext>,
    payload: Result<Json<SlotQuery>, JsonRejection>,
) -> Result<Json<SlotCheck>, ApiError> {
    let Json(query) = payload?;
    let conn = ctx.core.lock_db()?;
    Ok(Json(schedule::check_slot(&conn, &query)?))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

pub async fn set_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<Appointment>, ApiError> {
    let Json(update) = payload?;
    let raw = update
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("status is required".into()))?;
    let status = AppointmentStatus::from_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("Unknown status: {raw}")))?;

    let conn = ctx.core.lock_db()?;
    Ok(Json(schedule::set_appointment_status(&conn, &id, status)?))
}
