//! Server-side timer tasks for live questions.
//!
//! Each spawn stamps the room's current timer generation; bumping the
//! generation (new question, reveal, reset) makes stale tasks exit on their
//! next tick instead of firing against a phase they no longer own.

use std::{sync::Arc, time::SystemTime};

use tokio::time::{Duration, interval, sleep};
use tracing::debug;

use crate::{
    services::{host_service, sse_events},
    state::{
        RoomHandle, SharedState, clock,
        state_machine::{QuestionStatus, RoomPhase},
    },
};

/// Countdown resolution. Broadcasts only happen when the whole-second value
/// changes, so clients see at most one event per second.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// How long a reveal stays on screen before the room advances by itself.
pub const REVEAL_HOLD_MS: u64 = 3_500;

/// Launch the countdown task for the live question. When the countdown hits
/// zero while the question is still running, the task reveals it.
pub fn schedule_countdown(state: SharedState, room: Arc<RoomHandle>) {
    let generation = room.bump_timer_generation();

    tokio::spawn(async move {
        let mut ticker = interval(TICK_INTERVAL);
        let mut last_broadcast = None;

        loop {
            ticker.tick().await;
            if room.timer_generation() != generation {
                return;
            }

            let phase = room.phase().await;
            let Some((question_index, remaining_sec)) = countdown_reading(&room).await else {
                return;
            };

            if last_broadcast != Some(remaining_sec) {
                sse_events::broadcast_countdown(&room, question_index, remaining_sec);
                last_broadcast = Some(remaining_sec);
            }

            if remaining_sec == 0 && phase == RoomPhase::Question(QuestionStatus::Running) {
                if let Err(err) = host_service::reveal_room(&state, &room).await {
                    // A concurrent host reveal won the race; nothing to do.
                    debug!(error = %err, "countdown reveal lost the transition race");
                }
                return;
            }
        }
    });
}

/// Launch the auto-advance task after a reveal. Once the hold expires the
/// room moves to the next question, or ends after the last one.
pub fn schedule_auto_advance(state: SharedState, room: Arc<RoomHandle>) {
    let generation = room.bump_timer_generation();

    tokio::spawn(async move {
        sleep(Duration::from_millis(REVEAL_HOLD_MS)).await;
        if room.timer_generation() != generation {
            return;
        }
        if room.phase().await != RoomPhase::Reveal {
            return;
        }

        if let Err(err) = host_service::advance_room(&state, &room).await {
            debug!(error = %err, "auto-advance lost the transition race");
        }
    });
}

/// Current question index and remaining seconds, or `None` when the session
/// no longer has a live question.
async fn countdown_reading(room: &RoomHandle) -> Option<(usize, u64)> {
    let session = room.session().read().await;
    let index = session.current_question_index?;
    let question = session.question(index)?;
    let start = session.question_start?;

    let remaining = clock::remaining_secs(
        start,
        question.time_limit_sec,
        session.paused_accum_ms,
        session.pause_start,
        SystemTime::now(),
    );
    Some((index, remaining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::room_store::memory::MemoryRoomStore,
        dto::rooms::{CreateRoomRequest, JoinRoomRequest},
        services::{player_service, room_service},
        state::AppState,
    };

    async fn running_room() -> (SharedState, Arc<RoomHandle>) {
        let state = AppState::new(AppConfig::default());
        state
            .install_room_store(Arc::new(MemoryRoomStore::new()))
            .await;
        let created = room_service::create_room(&state, CreateRoomRequest { quiz: None })
            .await
            .unwrap();
        player_service::join_room(
            &state,
            &created.code,
            JoinRoomRequest {
                name: "Ada".into(),
                player_id: None,
            },
        )
        .await
        .unwrap();
        host_service::start(&state, created.room_id).await.unwrap();
        let room = state.room(created.room_id).unwrap();
        (state, room)
    }

    /// Slide the live question's start far enough back that its deadline has
    /// already passed.
    async fn expire_question(room: &RoomHandle) {
        let mut session = room.session().write().await;
        let limit = session.question(0).unwrap().time_limit_sec;
        session.question_start =
            Some(SystemTime::now() - Duration::from_secs(u64::from(limit) + 1));
    }

    async fn wait_for_phase(room: &RoomHandle, phase: RoomPhase) {
        tokio::time::timeout(Duration::from_secs(60), async {
            while room.phase().await != phase {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("room never reached {phase:?}"));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_reveals_once_the_deadline_passes() {
        let (state, room) = running_room().await;

        expire_question(&room).await;
        schedule_countdown(state.clone(), room.clone());

        wait_for_phase(&room, RoomPhase::Reveal).await;
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_hold_advances_to_the_next_question() {
        let (state, room) = running_room().await;
        host_service::reveal_room(&state, &room).await.unwrap();

        wait_for_phase(&room, RoomPhase::Question(QuestionStatus::Running)).await;
        let session = room.session().read().await;
        assert_eq!(session.current_question_index, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn bumped_generation_cancels_a_scheduled_countdown() {
        let (state, room) = running_room().await;

        schedule_countdown(state.clone(), room.clone());
        room.bump_timer_generation();
        expire_question(&room).await;

        sleep(Duration::from_secs(5)).await;
        assert_eq!(
            room.phase().await,
            RoomPhase::Question(QuestionStatus::Running)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn bumped_generation_cancels_the_reveal_hold() {
        let (state, room) = running_room().await;
        host_service::reveal_room(&state, &room).await.unwrap();
        room.bump_timer_generation();

        sleep(Duration::from_millis(REVEAL_HOLD_MS * 2)).await;
        assert_eq!(room.phase().await, RoomPhase::Reveal);
    }
}
