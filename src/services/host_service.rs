//! Host-only room transitions. Every operation runs through the room's
//! plan/apply gate, so a host button and an expiring timer racing for the
//! same transition cannot both win; the loser fails with a conflict.

use std::{sync::Arc, time::SystemTime};

use uuid::Uuid;

use crate::{
    dto::rooms::HostActionResponse,
    error::ServiceError,
    services::{public_service, question_timer, room_service, sse_events},
    state::{
        RoomHandle, SharedState, scoring,
        state_machine::{QuestionStatus, RoomEvent, RoomPhase},
        transitions::run_transition_with_broadcast,
    },
};

/// Verify the host token presented for a room.
pub async fn authorize(
    state: &SharedState,
    room_id: Uuid,
    token: Uuid,
) -> Result<(), ServiceError> {
    let room = room_service::load_room(state, room_id).await?;
    let session = room.session().read().await;
    if session.host_token != token {
        return Err(ServiceError::Unauthorized(
            "host token does not match this room".into(),
        ));
    }
    Ok(())
}

/// Start the quiz: open question 0 and launch its countdown.
pub async fn start(state: &SharedState, room_id: Uuid) -> Result<HostActionResponse, ServiceError> {
    let room = room_service::load_room(state, room_id).await?;

    run_transition_with_broadcast(state, &room, RoomEvent::Start, || async {
        let mut session = room.session().write().await;
        session.begin_question(0, SystemTime::now());
        persist_room_locked(state, &session, RoomPhase::Question(QuestionStatus::Running)).await
    })
    .await?;

    question_timer::schedule_countdown(state.clone(), room.clone());
    respond(state, &room, "question started").await
}

/// Reveal the live question: score every locked-in answer in one batch, then
/// hold the reveal briefly before advancing automatically.
pub async fn reveal(
    state: &SharedState,
    room_id: Uuid,
) -> Result<HostActionResponse, ServiceError> {
    let room = room_service::load_room(state, room_id).await?;
    reveal_room(state, &room).await?;
    respond(state, &room, "question revealed").await
}

/// Shared reveal path used by the host endpoint and the countdown timer.
pub async fn reveal_room(state: &SharedState, room: &Arc<RoomHandle>) -> Result<(), ServiceError> {
    run_transition_with_broadcast(state, room, RoomEvent::Reveal, || async {
        let mut session = room.session().write().await;
        let index = session
            .current_question_index
            .ok_or_else(|| ServiceError::InvalidState("no live question".into()))?;
        let question = session
            .question(index)
            .cloned()
            .ok_or_else(|| ServiceError::InvalidState("question index out of range".into()))?;

        scoring::score_question(&mut session.players, &question, index);
        session.updated_at = SystemTime::now();

        persist_players(state, &session).await?;
        persist_room_locked(state, &session, RoomPhase::Reveal).await
    })
    .await?;

    sse_events::broadcast_players_changed(room).await;
    question_timer::schedule_auto_advance(state.clone(), room.clone());
    Ok(())
}

/// Advance past the reveal: open the next question, or end the quiz after the
/// last one.
pub async fn next(state: &SharedState, room_id: Uuid) -> Result<HostActionResponse, ServiceError> {
    let room = room_service::load_room(state, room_id).await?;
    advance_room(state, &room).await?;
    respond(state, &room, "room advanced").await
}

/// Shared advance path used by the host endpoint and the auto-advance timer.
pub async fn advance_room(state: &SharedState, room: &Arc<RoomHandle>) -> Result<(), ServiceError> {
    let next_index = {
        let session = room.session().read().await;
        let index = session
            .current_question_index
            .ok_or_else(|| ServiceError::InvalidState("no question to advance from".into()))?;
        let candidate = index + 1;
        (candidate < session.quiz.questions.len()).then_some(candidate)
    };

    match next_index {
        Some(index) => {
            run_transition_with_broadcast(state, room, RoomEvent::Next, || async {
                let mut session = room.session().write().await;
                session.begin_question(index, SystemTime::now());
                persist_room_locked(state, &session, RoomPhase::Question(QuestionStatus::Running))
                    .await
            })
            .await?;
            question_timer::schedule_countdown(state.clone(), room.clone());
        }
        None => {
            run_transition_with_broadcast(state, room, RoomEvent::Finish, || async {
                let mut session = room.session().write().await;
                session.finish(SystemTime::now());
                persist_room_locked(state, &session, RoomPhase::Ended).await
            })
            .await?;
            room.bump_timer_generation();
        }
    }

    Ok(())
}

/// Freeze the live question's countdown and cache the current leader.
pub async fn pause(state: &SharedState, room_id: Uuid) -> Result<HostActionResponse, ServiceError> {
    let room = room_service::load_room(state, room_id).await?;

    run_transition_with_broadcast(state, &room, RoomEvent::Pause, || async {
        let mut session = room.session().write().await;
        session.pause(SystemTime::now());
        persist_room_locked(state, &session, RoomPhase::Question(QuestionStatus::Paused)).await
    })
    .await?;

    respond(state, &room, "question paused").await
}

/// Resume a paused question; the banked pause slides the deadline.
pub async fn resume(
    state: &SharedState,
    room_id: Uuid,
) -> Result<HostActionResponse, ServiceError> {
    let room = room_service::load_room(state, room_id).await?;

    run_transition_with_broadcast(state, &room, RoomEvent::Resume, || async {
        let mut session = room.session().write().await;
        session.resume(SystemTime::now());
        persist_room_locked(state, &session, RoomPhase::Question(QuestionStatus::Running)).await
    })
    .await?;

    respond(state, &room, "question resumed").await
}

/// Return the room to the lobby with every score and answer wiped.
pub async fn reset(state: &SharedState, room_id: Uuid) -> Result<HostActionResponse, ServiceError> {
    let room = room_service::load_room(state, room_id).await?;

    run_transition_with_broadcast(state, &room, RoomEvent::Reset, || async {
        let mut session = room.session().write().await;
        session.reset(SystemTime::now());
        persist_players(state, &session).await?;
        persist_room_locked(state, &session, RoomPhase::Lobby).await
    })
    .await?;

    room.bump_timer_generation();
    sse_events::broadcast_players_changed(&room).await;
    respond(state, &room, "room reset").await
}

async fn persist_room_locked(
    state: &SharedState,
    session: &crate::state::room::RoomSession,
    phase: RoomPhase,
) -> Result<(), ServiceError> {
    let store = state.require_room_store().await?;
    store.save_room(session.to_entity(phase)).await?;
    Ok(())
}

async fn persist_players(
    state: &SharedState,
    session: &crate::state::room::RoomSession,
) -> Result<(), ServiceError> {
    let store = state.require_room_store().await?;
    let players = session.players.values().map(Into::into).collect();
    store.save_players(session.id, players).await?;
    Ok(())
}

async fn respond(
    state: &SharedState,
    room: &Arc<RoomHandle>,
    message: &str,
) -> Result<HostActionResponse, ServiceError> {
    Ok(HostActionResponse {
        message: message.into(),
        snapshot: public_service::phase_snapshot(state, room).await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::room_store::memory::MemoryRoomStore,
        dto::rooms::{AnswerRequest, CreateRoomRequest, JoinRoomRequest},
        dto::phase::VisibleRoomPhase,
        services::{player_service, room_service},
        state::AppState,
    };

    async fn room_with_player() -> (SharedState, Uuid, Uuid) {
        let state = AppState::new(AppConfig::default());
        state
            .install_room_store(Arc::new(MemoryRoomStore::new()))
            .await;
        let created = room_service::create_room(&state, CreateRoomRequest { quiz: None })
            .await
            .unwrap();
        let joined = player_service::join_room(
            &state,
            &created.code,
            JoinRoomRequest {
                name: "Ada".into(),
                player_id: None,
            },
        )
        .await
        .unwrap();
        (state, created.room_id, joined.player_id)
    }

    #[tokio::test]
    async fn authorize_rejects_a_wrong_token() {
        let (state, room_id, _) = room_with_player().await;
        let token = {
            let room = state.room(room_id).unwrap();
            let session = room.session().read().await;
            session.host_token
        };

        assert!(authorize(&state, room_id, token).await.is_ok());
        assert!(matches!(
            authorize(&state, room_id, Uuid::new_v4()).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn start_opens_the_first_question() {
        let (state, room_id, _) = room_with_player().await;

        let response = start(&state, room_id).await.unwrap();

        assert_eq!(response.snapshot.phase, VisibleRoomPhase::Question);
        let question = response.snapshot.question.unwrap();
        assert_eq!(question.index, 0);
        assert!(question.correct_index.is_none());
        assert_eq!(response.snapshot.answered_count, Some(0));
    }

    #[tokio::test]
    async fn start_twice_is_a_conflict() {
        let (state, room_id, _) = room_with_player().await;

        start(&state, room_id).await.unwrap();
        assert!(matches!(
            start(&state, room_id).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn reveal_scores_answers_and_exposes_the_correct_index() {
        let (state, room_id, player_id) = room_with_player().await;
        start(&state, room_id).await.unwrap();

        player_service::submit_answer(
            &state,
            room_id,
            AnswerRequest {
                player_id,
                // Question 0 of the built-in quiz has correct index 0.
                option_index: 0,
            },
        )
        .await
        .unwrap();

        let response = reveal(&state, room_id).await.unwrap();

        assert_eq!(response.snapshot.phase, VisibleRoomPhase::Reveal);
        let question = response.snapshot.question.unwrap();
        assert_eq!(question.correct_index, Some(0));

        let correct = response.snapshot.correct_players.unwrap();
        assert_eq!(correct.len(), 1);
        assert_eq!(correct[0].id, player_id);
        assert!(correct[0].score > 0);
    }

    #[tokio::test]
    async fn double_reveal_loses_the_race() {
        let (state, room_id, _) = room_with_player().await;
        start(&state, room_id).await.unwrap();

        reveal(&state, room_id).await.unwrap();
        assert!(matches!(
            reveal(&state, room_id).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn next_walks_to_the_end_of_the_quiz() {
        let (state, room_id, _) = room_with_player().await;
        let question_count = state
            .config()
            .default_quiz()
            .questions
            .len();

        start(&state, room_id).await.unwrap();
        for _ in 0..question_count - 1 {
            reveal(&state, room_id).await.unwrap();
            let response = next(&state, room_id).await.unwrap();
            assert_eq!(response.snapshot.phase, VisibleRoomPhase::Question);
        }

        reveal(&state, room_id).await.unwrap();
        let response = next(&state, room_id).await.unwrap();
        assert_eq!(response.snapshot.phase, VisibleRoomPhase::Ended);
        assert!(response.snapshot.winner.is_some());
    }

    #[tokio::test]
    async fn pause_caches_the_leader_and_resume_clears_it() {
        let (state, room_id, player_id) = room_with_player().await;
        start(&state, room_id).await.unwrap();

        let paused = pause(&state, room_id).await.unwrap();
        assert!(paused.snapshot.paused);
        let leader = paused.snapshot.leader.unwrap();
        assert_eq!(leader.id, player_id);

        let resumed = resume(&state, room_id).await.unwrap();
        assert!(!resumed.snapshot.paused);
        assert!(resumed.snapshot.leader.is_none());
    }

    #[tokio::test]
    async fn paused_questions_reject_answers_but_allow_reveal() {
        let (state, room_id, player_id) = room_with_player().await;
        start(&state, room_id).await.unwrap();
        pause(&state, room_id).await.unwrap();

        let answer = player_service::submit_answer(
            &state,
            room_id,
            AnswerRequest {
                player_id,
                option_index: 0,
            },
        )
        .await;
        assert!(matches!(answer, Err(ServiceError::InvalidState(_))));

        let response = reveal(&state, room_id).await.unwrap();
        assert_eq!(response.snapshot.phase, VisibleRoomPhase::Reveal);
    }

    #[tokio::test]
    async fn reset_returns_to_the_lobby_and_wipes_scores() {
        let (state, room_id, player_id) = room_with_player().await;
        start(&state, room_id).await.unwrap();
        player_service::submit_answer(
            &state,
            room_id,
            AnswerRequest {
                player_id,
                option_index: 0,
            },
        )
        .await
        .unwrap();
        reveal(&state, room_id).await.unwrap();

        let response = reset(&state, room_id).await.unwrap();
        assert_eq!(response.snapshot.phase, VisibleRoomPhase::Lobby);

        let room = state.room(room_id).unwrap();
        let session = room.session().read().await;
        let player = &session.players[&player_id];
        assert_eq!(player.score, 0);
        assert!(player.answers.is_empty());
        assert!(session.current_question_index.is_none());
    }

    #[tokio::test]
    async fn reset_from_the_lobby_is_a_conflict() {
        let (state, room_id, _) = room_with_player().await;
        assert!(matches!(
            reset(&state, room_id).await,
            Err(ServiceError::InvalidState(_))
        ));
    }
}
