//! HTTP surface for the UI layer
//!
//! Thin axum wrapper around `SessionController`. Every response that reaches
//! the exam taker goes through a client view, so hidden test case content and
//! correct answers never leave this module.

mod handlers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::error::EngineError;
use crate::session::SessionController;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
}

pub fn router(controller: Arc<SessionController>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/sessions", post(handlers::start_session))
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/question", get(handlers::current_question))
        .route("/sessions/{id}/navigate", post(handlers::navigate))
        .route(
            "/sessions/{id}/answers/{question_id}",
            put(handlers::record_answer),
        )
        .route("/sessions/{id}/remaining", get(handlers::remaining))
        .route("/sessions/{id}/submit", post(handlers::submit))
        .route("/sessions/{id}/result", get(handlers::result))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { controller })
}

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::SessionNotFound(_) | EngineError::ExamNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::OutOfRange { .. }
            | EngineError::UnknownQuestion(_)
            | EngineError::AnswerTypeMismatch { .. } => StatusCode::BAD_REQUEST,
            EngineError::SessionFinalized | EngineError::ResultPending(_) => StatusCode::CONFLICT,
            EngineError::InvalidExam(_)
            | EngineError::MisconfiguredExam(_)
            | EngineError::NoTestCases(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::SandboxUnavailable(_)
            | EngineError::UnsupportedLanguage(_)
            | EngineError::GradingIncomplete { .. }
            | EngineError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
