//! Player-facing operations: joining a room and locking in answers.

use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dto::{
        rooms::{AnswerRequest, AnswerResponse, JoinRoomRequest, JoinRoomResponse},
        validation::sanitize_player_name,
    },
    error::ServiceError,
    services::{room_service, sse_events},
    state::{
        SharedState, clock,
        room::{Answer, Player},
        state_machine::{QuestionStatus, RoomPhase},
    },
};

/// Join a room by code, or rename an existing player when the payload carries
/// a known player id. Joining is idempotent: score and answers survive.
pub async fn join_room(
    state: &SharedState,
    code: &str,
    payload: JoinRoomRequest,
) -> Result<JoinRoomResponse, ServiceError> {
    let room_id = room_service::resolve_code(state, code).await?;
    let room = room_service::load_room(state, room_id).await?;

    if room.phase().await == RoomPhase::Ended {
        return Err(ServiceError::InvalidState(
            "the quiz in this room has ended".into(),
        ));
    }

    let name = sanitize_player_name(&payload.name);

    let player = {
        let mut session = room.session().write().await;
        let player_id = payload.player_id.unwrap_or_else(Uuid::new_v4);
        let now = SystemTime::now();
        let player = session
            .players
            .entry(player_id)
            .or_insert_with(|| Player::new(player_id, name.clone(), now));
        player.name = name;
        session.updated_at = now;
        session.players[&player_id].clone()
    };

    let store = state.require_room_store().await?;
    store.save_player(room_id, (&player).into()).await?;

    sse_events::broadcast_players_changed(&room).await;
    Ok(JoinRoomResponse::from_player(room_id, &player))
}

/// Lock in a player's answer for the live question. One answer per player per
/// question; latency is measured server-side with paused time excluded.
pub async fn submit_answer(
    state: &SharedState,
    room_id: Uuid,
    payload: AnswerRequest,
) -> Result<AnswerResponse, ServiceError> {
    let room = room_service::load_room(state, room_id).await?;

    match room.phase().await {
        RoomPhase::Question(QuestionStatus::Running) => {}
        RoomPhase::Question(QuestionStatus::Paused) => {
            return Err(ServiceError::InvalidState(
                "the question is paused".into(),
            ));
        }
        _ => {
            return Err(ServiceError::InvalidState(
                "no question is accepting answers".into(),
            ));
        }
    }

    let (player, answer) = {
        let mut session = room.session().write().await;

        // A transition planned before this lock was taken (a reveal that
        // already scored, for instance) would never see this answer; re-check
        // the machine now that the session is held.
        let snapshot = room.snapshot().await;
        if snapshot.phase != RoomPhase::Question(QuestionStatus::Running)
            || snapshot.pending.is_some()
        {
            return Err(ServiceError::InvalidState(
                "no question is accepting answers".into(),
            ));
        }

        let index = session
            .current_question_index
            .ok_or_else(|| ServiceError::InvalidState("no live question".into()))?;
        let question = session
            .question(index)
            .ok_or_else(|| ServiceError::InvalidState("question index out of range".into()))?;

        if payload.option_index >= question.options.len() {
            return Err(ServiceError::InvalidInput(format!(
                "option index {} is out of range",
                payload.option_index
            )));
        }

        let limit_ms = u64::from(question.time_limit_sec) * 1_000;
        let question_start = session
            .question_start
            .ok_or_else(|| ServiceError::InvalidState("question has not started".into()))?;

        let now = SystemTime::now();
        let time_taken_ms = clock::elapsed_answer_ms(
            question_start,
            session.paused_accum_ms,
            session.pause_start,
            now,
        )
        .min(limit_ms);

        let answer = Answer {
            option_index: payload.option_index,
            time_taken_ms,
            submitted_at: now,
            scored: false,
            correct: false,
        };

        let player = session
            .players
            .get_mut(&payload.player_id)
            .ok_or_else(|| ServiceError::NotFound("player is not in this room".into()))?;

        if player.answers.contains_key(&index) {
            return Err(ServiceError::InvalidState(
                "answer already locked in for this question".into(),
            ));
        }
        player.answers.insert(index, answer);
        let player = player.clone();
        session.updated_at = now;
        (player, answer)
    };

    let store = state.require_room_store().await?;
    store.save_player(room_id, (&player).into()).await?;

    Ok(AnswerResponse {
        time_taken_ms: answer.time_taken_ms,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::room_store::memory::MemoryRoomStore,
        dto::rooms::CreateRoomRequest,
        state::AppState,
        state::state_machine::RoomEvent,
    };

    async fn state_with_room() -> (SharedState, String, Uuid) {
        let state = AppState::new(AppConfig::default());
        state
            .install_room_store(Arc::new(MemoryRoomStore::new()))
            .await;
        let created = room_service::create_room(&state, CreateRoomRequest { quiz: None })
            .await
            .unwrap();
        (state, created.code, created.room_id)
    }

    fn join_payload(name: &str) -> JoinRoomRequest {
        JoinRoomRequest {
            name: name.into(),
            player_id: None,
        }
    }

    #[tokio::test]
    async fn join_sanitizes_the_name_and_is_idempotent() {
        let (state, code, room_id) = state_with_room().await;

        let joined = join_room(&state, &code, join_payload("  Ada   Lovelace  "))
            .await
            .unwrap();
        assert_eq!(joined.name, "Ada Lovelace");
        assert_eq!(joined.room_id, room_id);

        let renamed = join_room(
            &state,
            &code,
            JoinRoomRequest {
                name: "Countess".into(),
                player_id: Some(joined.player_id),
            },
        )
        .await
        .unwrap();

        assert_eq!(renamed.player_id, joined.player_id);
        assert_eq!(renamed.name, "Countess");

        let room = state.room(room_id).unwrap();
        assert_eq!(room.session().read().await.players.len(), 1);
    }

    #[tokio::test]
    async fn answers_are_rejected_outside_a_running_question() {
        let (state, code, room_id) = state_with_room().await;
        let joined = join_room(&state, &code, join_payload("Ada")).await.unwrap();

        let result = submit_answer(
            &state,
            room_id,
            AnswerRequest {
                player_id: joined.player_id,
                option_index: 0,
            },
        )
        .await;

        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn second_answer_for_the_same_question_is_rejected() {
        let (state, code, room_id) = state_with_room().await;
        let joined = join_room(&state, &code, join_payload("Ada")).await.unwrap();

        let room = state.room(room_id).unwrap();
        room.run_transition(RoomEvent::Start, || async {
            let mut session = room.session().write().await;
            session.begin_question(0, SystemTime::now());
            Ok(())
        })
        .await
        .unwrap();

        let request = AnswerRequest {
            player_id: joined.player_id,
            option_index: 1,
        };
        let first = submit_answer(&state, room_id, request).await.unwrap();
        assert!(first.time_taken_ms < 1_000);

        let second = submit_answer(
            &state,
            room_id,
            AnswerRequest {
                player_id: joined.player_id,
                option_index: 0,
            },
        )
        .await;
        assert!(matches!(second, Err(ServiceError::InvalidState(_))));
    }

    #[tokio::test]
    async fn out_of_range_option_is_rejected() {
        let (state, code, room_id) = state_with_room().await;
        let joined = join_room(&state, &code, join_payload("Ada")).await.unwrap();

        let room = state.room(room_id).unwrap();
        room.run_transition(RoomEvent::Start, || async {
            let mut session = room.session().write().await;
            session.begin_question(0, SystemTime::now());
            Ok(())
        })
        .await
        .unwrap();

        let result = submit_answer(
            &state,
            room_id,
            AnswerRequest {
                player_id: joined.player_id,
                option_index: 99,
            },
        )
        .await;
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn answers_are_rejected_while_a_reveal_is_in_flight() {
        let (state, code, room_id) = state_with_room().await;
        let joined = join_room(&state, &code, join_payload("Ada")).await.unwrap();

        let room = state.room(room_id).unwrap();
        room.run_transition(RoomEvent::Start, || async {
            let mut session = room.session().write().await;
            session.begin_question(0, SystemTime::now());
            Ok(())
        })
        .await
        .unwrap();

        // Between planning a reveal and applying it, the phase still reads
        // Question(Running); a late answer must not slip past the scoring
        // batch unscored.
        room.run_transition(RoomEvent::Reveal, || async {
            let late = submit_answer(
                &state,
                room_id,
                AnswerRequest {
                    player_id: joined.player_id,
                    option_index: 0,
                },
            )
            .await;
            assert!(matches!(late, Err(ServiceError::InvalidState(_))));
            Ok(())
        })
        .await
        .unwrap();
    }
}
