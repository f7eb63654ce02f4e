use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        common::PlayerSummary,
        sse::{CountdownEvent, PhaseChangedEvent, PlayersChangedEvent, ServerEvent, SystemStatus},
    },
    services::public_service,
    state::{RoomHandle, SharedState},
};

const EVENT_PHASE_CHANGED: &str = "room_phase_changed";
const EVENT_PLAYERS_CHANGED: &str = "players_changed";
const EVENT_COUNTDOWN: &str = "countdown";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Broadcast a room phase change notification with a full snapshot.
pub async fn broadcast_phase_changed(state: &SharedState, room: &RoomHandle) {
    let snapshot = public_service::phase_snapshot(state, room).await;
    send_room_event(room, EVENT_PHASE_CHANGED, &PhaseChangedEvent(snapshot));
}

/// Broadcast the roster, ordered by score descending, after it changed.
pub async fn broadcast_players_changed(room: &RoomHandle) {
    let players = {
        let session = room.session().read().await;
        session
            .standings()
            .into_iter()
            .map(PlayerSummary::from)
            .collect()
    };
    send_room_event(room, EVENT_PLAYERS_CHANGED, &PlayersChangedEvent { players });
}

/// Broadcast a countdown tick for the live question.
pub fn broadcast_countdown(room: &RoomHandle, question_index: usize, remaining_sec: u64) {
    send_room_event(
        room,
        EVENT_COUNTDOWN,
        &CountdownEvent {
            question_index,
            remaining_sec,
        },
    );
}

/// Notify every live room that the backend entered or left degraded mode.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    for entry in state.rooms().iter() {
        send_room_event(entry.value(), EVENT_SYSTEM_STATUS, &payload);
    }
}

fn send_room_event(room: &RoomHandle, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => room.sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
