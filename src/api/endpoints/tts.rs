//! `POST /api/tts`: speech synthesis proxy.
//!
//! The provider key never leaves the server. `Cache-Control: no-store` is
//! added by the router.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: Option<String>,
}

pub async fn speak(
    State(ctx): State<ApiContext>,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let text = req
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("text is required".into()))?;

    let tts = ctx.core.tts();
    let audio = tokio::task::spawn_blocking(move || tts.synthesize(&text)).await??;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}
