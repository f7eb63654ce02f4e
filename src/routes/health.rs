use axum::{Json, Router, extract::State, routing::get};
use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

#[utoipa::path(
    get,
    path = "/healthcheck",
    responses((status = 200, description = "Service health and live room count", body = HealthResponse))
)]
/// Report backend health: the degraded flag, the number of live rooms, and a
/// storage ping whose failures are logged but never fail the route.
pub async fn healthcheck(State(state): State<SharedState>) -> Json<HealthResponse> {
    match state.require_room_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    Json(HealthResponse::new(
        state.is_degraded().await,
        state.rooms().len(),
    ))
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/healthcheck", get(healthcheck))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::room_store::memory::MemoryRoomStore, state::AppState};

    #[tokio::test]
    async fn healthcheck_reports_the_degraded_flag_and_live_rooms() {
        let state = AppState::new(AppConfig::default());

        let Json(before) = healthcheck(State(state.clone())).await;
        assert_eq!(before.status, "degraded");
        assert_eq!(before.live_rooms, 0);

        state
            .install_room_store(Arc::new(MemoryRoomStore::new()))
            .await;

        let Json(after) = healthcheck(State(state.clone())).await;
        assert_eq!(after.status, "ok");
    }
}
