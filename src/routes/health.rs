use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::dto::chat_dto::HealthResponse;
use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok".to_string(),
        active_sessions: state.chat_service.session_count().await,
    };
    (StatusCode::OK, Json(body))
}
