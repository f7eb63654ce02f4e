use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Number of rooms currently live in this process.
    pub live_rooms: usize,
}

impl HealthResponse {
    /// Build the payload from the degraded flag and the live room count.
    pub fn new(degraded: bool, live_rooms: usize) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" }.to_string(),
            live_rooms,
        }
    }
}
