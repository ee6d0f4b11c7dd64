//! Dashboard numbers.
//!
//! - `GET /api/stats`: header counters
//! - `GET /api/analytics?group_by=day|week|month`

use std::str::FromStr;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::analytics::{self, Analytics, GroupBy, HeaderStats};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;

pub async fn header(State(ctx): State<ApiContext>) -> Result<Json<HeaderStats>, ApiError> {
    let today = ctx.today();
    let conn = ctx.core.lock_db()?;
    Ok(Json(analytics::header_stats(&conn, today)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub group_by: Option<String>,
}

pub async fn report(
    State(ctx): State<ApiContext>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<Json<Analytics>, ApiError> {
    let Query(query) = query?;
    let group_by = match query.group_by.as_deref().filter(|g| !g.trim().is_empty()) {
        Some(raw) => GroupBy::from_str(raw).map_err(ApiError::BadRequest)?,
        None => GroupBy::default(),
    };
    let conn = ctx.core.lock_db()?;
    Ok(Json(analytics::analytics(&conn, group_by)?))
}
