use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::rooms::{
        AnswerRequest, AnswerResponse, CreateRoomRequest, CreateRoomResponse, JoinRoomRequest,
        JoinRoomResponse,
    },
    error::AppError,
    services::{player_service, room_service},
    state::SharedState,
};

/// Room lifecycle endpoints: creation, joining, and answer submission.
pub fn router() -> Router<SharedState> {
    // The join segment carries the 6-digit code, not a room id; the router
    // needs one parameter name per position, so both go by `id`.
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{id}/join", post(join_room))
        .route("/rooms/{id}/answer", post(submit_answer))
}

#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = CreateRoomResponse),
        (status = 422, description = "Invalid quiz payload"),
        (status = 503, description = "Storage unavailable or code space exhausted")
    )
)]
/// Create a room in the lobby phase and return its join code and host credentials.
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    Ok(Json(room_service::create_room(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/join",
    tag = "rooms",
    params(("id" = String, Path, description = "Six-digit join code")),
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined the room", body = JoinRoomResponse),
        (status = 404, description = "No room with this code"),
        (status = 409, description = "Room already ended"),
        (status = 422, description = "Invalid player name")
    )
)]
/// Join a room by code, or rename an existing player when a known id is resubmitted.
pub async fn join_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<JoinRoomResponse>, AppError> {
    Ok(Json(player_service::join_room(&state, &code, payload).await?))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/answer",
    tag = "rooms",
    params(("id" = String, Path, description = "Room identifier")),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer locked in", body = AnswerResponse),
        (status = 404, description = "Room or player not found"),
        (status = 409, description = "No question is accepting answers, or already answered"),
        (status = 422, description = "Option index out of range")
    )
)]
/// Lock in a player's answer for the live question.
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    Ok(Json(
        player_service::submit_answer(&state, id, payload).await?,
    ))
}
