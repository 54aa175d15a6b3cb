use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::answers::AnswerValue;
use crate::error::EngineError;
use crate::exam::QuestionView;
use crate::scoring::GradedSubmission;
use crate::session::controller::SessionResult;
use crate::session::SessionView;

type ApiResult<T> = Result<Json<T>, EngineError>;

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub exam_id: String,
    pub taker_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct RemainingResponse {
    /// `None` for untimed sessions
    pub remaining_seconds: Option<u64>,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn start_session(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), EngineError> {
    let session = state
        .controller
        .start(&payload.exam_id, &payload.taker_id)?;
    Ok((StatusCode::CREATED, Json(session.view(Utc::now()))))
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
    Ok(Json(state.controller.view(id, Utc::now())?))
}

pub async fn current_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<QuestionView> {
    Ok(Json(state.controller.current_question(id)?))
}

pub async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NavigateRequest>,
) -> ApiResult<SessionView> {
    Ok(Json(state.controller.navigate(id, payload.index)?))
}

pub async fn record_answer(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, String)>,
    Json(value): Json<AnswerValue>,
) -> ApiResult<SessionView> {
    Ok(Json(state.controller.record_answer(id, &question_id, value)?))
}

pub async fn remaining(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RemainingResponse> {
    let remaining = state.controller.remaining(id, Utc::now())?;
    Ok(Json(RemainingResponse {
        remaining_seconds: remaining.map(|d| d.num_seconds().max(0) as u64),
    }))
}

pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<GradedSubmission> {
    Ok(Json(state.controller.submit(id).await?))
}

pub async fn result(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<SessionResult> {
    Ok(Json(state.controller.result(id)?))
}
