pub mod chat;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/chat/sessions", post(chat::start_session))
        .route(
            "/api/chat/sessions/:id",
            axum::routing::delete(chat::end_session),
        )
        .route("/api/chat/sessions/:id/messages", post(chat::send_message))
        .route("/api/chat/sessions/:id/actions", post(chat::handle_action))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
