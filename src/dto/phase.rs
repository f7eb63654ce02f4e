use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::RoomPhase;

/// Publicly visible room phase exposed to clients (REST/SSE). The pause flag
/// travels separately so clients keep rendering the question while paused.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoomPhase {
    /// Waiting for players to join.
    Lobby,
    /// A question is live.
    Question,
    /// Scores for the latest question are on display.
    Reveal,
    /// The quiz is over and final standings are shown.
    Ended,
}

impl From<RoomPhase> for VisibleRoomPhase {
    fn from(value: RoomPhase) -> Self {
        match value {
            RoomPhase::Lobby => VisibleRoomPhase::Lobby,
            RoomPhase::Question(_) => VisibleRoomPhase::Question,
            RoomPhase::Reveal => VisibleRoomPhase::Reveal,
            RoomPhase::Ended => VisibleRoomPhase::Ended,
        }
    }
}
