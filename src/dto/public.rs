use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::common::PlayerSummary;

/// Response payload listing a room's players ordered by score descending.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayersResponse {
    pub players: Vec<PlayerSummary>,
}
