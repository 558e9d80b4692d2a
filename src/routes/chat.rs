use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::dto::chat_dto::{ActionRequest, ChatResponse, SendMessageRequest};
use crate::error::Result;
use crate::utils::validation::validate;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_session(State(state): State<AppState>) -> (StatusCode, Json<ChatResponse>) {
    let reply = state.chat_service.start().await;
    (StatusCode::CREATED, Json(reply))
}

#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ChatResponse>> {
    validate(&req)?;
    let reply = state.chat_service.send_message(session_id, &req.text).await?;
    Ok(Json(reply))
}

#[axum::debug_handler]
pub async fn handle_action(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ChatResponse>> {
    validate(&req)?;
    tracing::info!(%session_id, action = %req.name, "Action received");
    let reply = state
        .chat_service
        .handle_action(session_id, &req.name, &req.payload)
        .await?;
    Ok(Json(reply))
}

#[axum::debug_handler]
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.chat_service.end(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
