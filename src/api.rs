use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::ServiceError;
use crate::light::RequestedAttributes;
use crate::platform::LightPlatform;
use crate::state::{EntityState, StateMachine};

/// Shared application state
pub struct AppState {
    pub state_machine: Arc<StateMachine>,
    pub platform: Arc<LightPlatform>,
}

/// `entity_id` may be a single id or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EntityIds {
    Single(String),
    Multiple(Vec<String>),
}

impl EntityIds {
    fn into_vec(self) -> Vec<String> {
        match self {
            EntityIds::Single(id) => vec![id],
            EntityIds::Multiple(ids) => ids,
        }
    }
}

/// POST /api/services/light/{service} request body
#[derive(Debug, Deserialize)]
pub struct LightServiceRequest {
    pub entity_id: EntityIds,
    #[serde(flatten)]
    pub attributes: RequestedAttributes,
}

#[derive(Debug, Serialize)]
struct ApiStatus {
    message: String,
}

#[derive(Debug, Serialize)]
struct ServiceResponse {
    changed_states: Vec<EntityState>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    /// Entities that were commanded before or after the failing one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    changed_states: Vec<EntityState>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/", get(api_status))
        .route("/api/states", get(get_states))
        .route("/api/states/:entity_id", get(get_state))
        .route("/api/services/light/:service", post(call_service))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/: API running check
async fn api_status() -> Json<ApiStatus> {
    Json(ApiStatus {
        message: "API running.".to_string(),
    })
}

/// GET /api/states: return all entity states
async fn get_states(State(app): State<Arc<AppState>>) -> Json<Vec<EntityState>> {
    Json(app.state_machine.get_all())
}

/// GET /api/states/{entity_id}: return single entity state
async fn get_state(
    State(app): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
) -> Result<Json<EntityState>, StatusCode> {
    app.state_machine
        .get(&entity_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// POST /api/services/light/{service}: turn_on, turn_off or toggle
///
/// Every listed entity is called. If any fail, the first error decides the
/// status and the states that did change are still returned.
async fn call_service(
    State(app): State<Arc<AppState>>,
    Path(service): Path<String>,
    Json(body): Json<LightServiceRequest>,
) -> Result<Json<ServiceResponse>, ApiError> {
    let mut changed = Vec::new();
    let mut first_error = None;
    for entity_id in body.entity_id.into_vec() {
        match app.platform.call_service(&service, &entity_id, &body.attributes) {
            Ok(state) => changed.push(state),
            Err(e) => {
                tracing::warn!(entity_id = %entity_id, "Service call failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(error_response(e, changed)),
        None => Ok(Json(ServiceResponse {
            changed_states: changed,
        })),
    }
}

/// GET /api/health
async fn health(State(app): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "entity_count": app.platform.entity_count(),
        "subscribed_topics": app.platform.subscribed_topics().len(),
    }))
}

fn error_response(e: ServiceError, changed_states: Vec<EntityState>) -> ApiError {
    let status = match &e {
        ServiceError::UnknownEntity(_) => StatusCode::NOT_FOUND,
        ServiceError::UnknownService(_) => StatusCode::BAD_REQUEST,
        ServiceError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Transport(_) => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorResponse {
            message: e.to_string(),
            changed_states,
        }),
    )
}
