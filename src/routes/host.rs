use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::rooms::HostActionResponse,
    error::AppError,
    services::host_service,
    state::SharedState,
};

const HOST_TOKEN_HEADER: &str = "x-host-token";

/// Host-only endpoints driving a room through its phases. Every route checks
/// the `X-Host-Token` header against the room's secret.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/rooms/{id}/host/start", post(start))
        .route("/rooms/{id}/host/reveal", post(reveal))
        .route("/rooms/{id}/host/next", post(next))
        .route("/rooms/{id}/host/pause", post(pause))
        .route("/rooms/{id}/host/resume", post(resume))
        .route("/rooms/{id}/host/reset", post(reset))
        .route_layer(middleware::from_fn_with_state(state, require_host_token))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/host/start",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued at room creation"),
    ("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "First question opened", body = HostActionResponse),
        (status = 401, description = "Missing or invalid host token"),
        (status = 409, description = "Room is not in the lobby")
    )
)]
/// Start the quiz: open the first question and launch its countdown.
pub async fn start(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HostActionResponse>, AppError> {
    Ok(Json(host_service::start(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/host/reveal",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued at room creation"),
    ("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Question revealed and scored", body = HostActionResponse),
        (status = 401, description = "Missing or invalid host token"),
        (status = 409, description = "No question is live")
    )
)]
/// Close the live question early, score it, and show the correct answer.
pub async fn reveal(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HostActionResponse>, AppError> {
    Ok(Json(host_service::reveal(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/host/next",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued at room creation"),
    ("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Next question opened, or quiz ended", body = HostActionResponse),
        (status = 401, description = "Missing or invalid host token"),
        (status = 409, description = "Room is not showing a reveal")
    )
)]
/// Advance past the reveal: open the next question, or end after the last one.
pub async fn next(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HostActionResponse>, AppError> {
    Ok(Json(host_service::next(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/host/pause",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued at room creation"),
    ("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Question paused", body = HostActionResponse),
        (status = 401, description = "Missing or invalid host token"),
        (status = 409, description = "No running question to pause")
    )
)]
/// Freeze the live question's clock and stop accepting answers.
pub async fn pause(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HostActionResponse>, AppError> {
    Ok(Json(host_service::pause(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/host/resume",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued at room creation"),
    ("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Question resumed", body = HostActionResponse),
        (status = 401, description = "Missing or invalid host token"),
        (status = 409, description = "No paused question to resume")
    )
)]
/// Resume a paused question, restarting its clock where it stopped.
pub async fn resume(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HostActionResponse>, AppError> {
    Ok(Json(host_service::resume(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/rooms/{id}/host/reset",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued at room creation"),
    ("id" = String, Path, description = "Room identifier")),
    responses(
        (status = 200, description = "Room back in the lobby", body = HostActionResponse),
        (status = 401, description = "Missing or invalid host token"),
        (status = 409, description = "Room is already in the lobby")
    )
)]
/// Return the room to the lobby, wiping scores and answers but keeping players.
pub async fn reset(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HostActionResponse>, AppError> {
    Ok(Json(host_service::reset(&state, id).await?))
}

async fn require_host_token(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(HOST_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| {
            AppError::Unauthorized("missing or malformed `X-Host-Token` header".into())
        })?;

    host_service::authorize(&state, id, provided).await?;
    Ok(next.run(req).await)
}
