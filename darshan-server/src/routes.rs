use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use darshan_logic::{InitializeResponse, TargetLocation, TargetUpdate};

use crate::state::ServerState;

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/location/initialize", post(initialize_location))
        .route(
            "/api/location/{id}",
            get(get_location).post(update_location),
        )
        .with_state(state)
}

async fn get_location(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<TargetLocation>, StatusCode> {
    state.get(&id).map(Json).map_err(StatusCode::from)
}

async fn update_location(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(update): Json<TargetUpdate>,
) -> Result<Json<TargetLocation>, StatusCode> {
    state.upsert(&id, update).map(Json).map_err(StatusCode::from)
}

async fn initialize_location(State(state): State<ServerState>) -> Json<InitializeResponse> {
    let location = state.initialize();
    Json(InitializeResponse {
        message: "Default location initialized successfully".to_string(),
        location,
    })
}
