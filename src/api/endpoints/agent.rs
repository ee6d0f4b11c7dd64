//! Voice-agent mode catalogue.
//!
//! - `GET /api/agent/modes`
//! - `GET /api/agent/modes/:mode`

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::enums::MedMode;
use crate::voice::{agent_mode, agent_modes, AgentMode};

#[derive(Serialize)]
pub struct ModesResponse {
    pub modes: Vec<AgentMode>,
    pub agent_id: Option<String>,
}

pub async fn list(State(ctx): State<ApiContext>) -> Json<ModesResponse> {
    Json(ModesResponse {
        modes: agent_modes(),
        agent_id: ctx.core.config.tts.agent_id.clone(),
    })
}

pub async fn get(Path(mode): Path<String>) -> Result<Json<AgentMode>, ApiError> {
    let mode = MedMode::from_str(&mode)
        .map_err(|_| ApiError::NotFound(format!("Unknown agent mode: {mode}")))?;
    Ok(Json(agent_mode(mode)))
}
