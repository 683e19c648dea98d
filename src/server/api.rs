use crate::agent::ChatAgent;
use crate::clock::Clock;
use crate::history::HistoryStore;
use crate::models::chat::{ validate_user_id, ChatRequest, ChatResponse, ValidationError };
use crate::server::middleware::log_requests;
use std::sync::Arc;
use axum::{
    routing::{ delete, get, post },
    Router,
    Json,
    body::Bytes,
    extract::{ State, Path },
    response::{ IntoResponse, Response },
    http::{ header, Method, StatusCode },
    middleware,
};
use serde_json::json;
use tower_http::cors::{ Any, CorsLayer };
use log::{ debug, error, info, warn };

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChatAgent>,
    pub history: Arc<dyn HistoryStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(agent: Arc<ChatAgent>, clock: Arc<dyn Clock>) -> Self {
        let history = agent.history_store();
        Self { agent, history, clock }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/chat", post(chat_handler).delete(missing_user_handler))
        .route("/api/v1/chat/", delete(missing_user_handler))
        .route("/api/v1/chat/{user_id}", delete(clear_chat_handler))
        .layer(cors)
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

fn reply(status: StatusCode, body: ChatResponse) -> Response {
    (status, Json(body)).into_response()
}

fn bad_request(err: ValidationError) -> Response {
    reply(StatusCode::BAD_REQUEST, ChatResponse::failed(err.to_string()))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "time": state.clock.now().to_rfc3339(),
    }))
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes
) -> Response {
    // Decoded by hand so a missing or non-JSON Content-Type is not rejected.
    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected chat request body: {}", e);
            return bad_request(ValidationError::InvalidFormat);
        }
    };

    if let Err(e) = request.validate() {
        return bad_request(e);
    }

    info!(
        "Incoming chat request from user {}: {} chars, system prompt: {}",
        request.user_id,
        request.message.chars().count(),
        request.context.system_prompt().is_some()
    );
    if let Some(metadata) = &request.context.metadata {
        debug!("Request metadata for {}: {:?}", request.user_id, metadata);
    }

    // The turn runs on its own task so a client disconnect cannot cancel it
    // between the two history appends; the result is then simply dropped.
    let agent = Arc::clone(&state.agent);
    let turn = tokio::spawn(async move {
        agent.generate(&request.user_id, &request.message, &request.context).await
    });

    match turn.await {
        Ok(Ok(response)) => reply(StatusCode::OK, ChatResponse::ok(response)),
        Ok(Err(e)) => {
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                ChatResponse::failed(format!("Failed to generate response: {}", e))
            )
        }
        Err(e) => {
            error!("Chat generation task failed: {}", e);
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                ChatResponse::failed(format!("Failed to generate response: {}", e))
            )
        }
    }
}

async fn clear_chat_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>
) -> Response {
    if let Err(e) = validate_user_id(&user_id) {
        return bad_request(e);
    }

    match state.history.clear(&user_id).await {
        Ok(()) => {
            info!("Conversation cleared for user {}", user_id);
            reply(StatusCode::OK, ChatResponse::ok("Conversation cleared successfully"))
        }
        Err(e) => {
            error!("Failed to clear conversation for {}: {}", user_id, e);
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                ChatResponse::failed(format!("Failed to clear conversation: {}", e))
            )
        }
    }
}

async fn missing_user_handler() -> Response {
    bad_request(ValidationError::MissingUserId)
}
