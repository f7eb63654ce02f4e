use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{common::RoomPhaseSnapshot, public::PlayersResponse, rooms::RoomSummary},
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Public read-only endpoints that expose the current room state.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms/{id}", get(get_room_by_code))
        .route("/rooms/{id}/phase", get(get_room_phase))
        .route("/rooms/{id}/players", get(get_players))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "public",
    params(("id" = String, Path, description = "Six-digit join code")),
    responses(
        (status = 200, description = "Room summary", body = RoomSummary),
        (status = 404, description = "No room with this code")
    )
)]
/// Resolve a join code to the room's public summary.
pub async fn get_room_by_code(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    let payload = public_service::get_room_by_code(&state, &code).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}/phase",
    tag = "public",
    params(("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Current room phase", body = RoomPhaseSnapshot),
        (status = 404, description = "Unknown room")
    )
)]
/// Return the phase snapshot players poll between SSE events.
pub async fn get_room_phase(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoomPhaseSnapshot>, AppError> {
    let payload = public_service::get_room_phase(&state, id).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/rooms/{id}/players",
    tag = "public",
    params(("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Roster ordered by score", body = PlayersResponse),
        (status = 404, description = "Unknown room")
    )
)]
/// Return the room's roster, highest score first.
pub async fn get_players(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayersResponse>, AppError> {
    let payload = public_service::get_players(&state, id).await?;
    Ok(Json(payload))
}
