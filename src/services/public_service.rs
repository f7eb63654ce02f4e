//! Service helpers that expose read-only public projections of a room.

use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dto::{
        common::{PlayerSummary, QuestionSnapshot, RoomPhaseSnapshot},
        public::PlayersResponse,
        rooms::RoomSummary,
    },
    error::ServiceError,
    services::room_service,
    state::{
        RoomHandle, SharedState, clock,
        state_machine::{QuestionStatus, RoomPhase},
    },
};

/// Build the shared phase snapshot for a room, shaped by the current phase:
/// the live question hides its correct answer, the reveal exposes it together
/// with the scoreboard, and the ended phase adds the winner.
pub async fn phase_snapshot(state: &SharedState, room: &RoomHandle) -> RoomPhaseSnapshot {
    let phase = room.phase().await;
    let degraded = state.is_degraded().await;
    let session = room.session().read().await;

    let mut snapshot = RoomPhaseSnapshot {
        phase: phase.into(),
        paused: matches!(phase, RoomPhase::Question(QuestionStatus::Paused)),
        room_id: session.id,
        quiz_title: session.quiz.title.clone(),
        question_count: session.quiz.questions.len(),
        degraded,
        question: None,
        remaining_sec: None,
        answered_count: None,
        leader: None,
        correct_players: None,
        scoreboard: None,
        winner: None,
    };

    let current = session
        .current_question_index
        .and_then(|index| session.question(index).map(|question| (index, question)));

    match phase {
        RoomPhase::Lobby => {}
        RoomPhase::Question(status) => {
            if let Some((index, question)) = current {
                snapshot.question = Some(QuestionSnapshot::hidden(index, question));
                snapshot.answered_count = Some(session.answered_count(index));
                if let Some(start) = session.question_start {
                    snapshot.remaining_sec = Some(clock::remaining_secs(
                        start,
                        question.time_limit_sec,
                        session.paused_accum_ms,
                        session.pause_start,
                        SystemTime::now(),
                    ));
                }
            }
            if status == QuestionStatus::Paused {
                snapshot.leader = session.leader.clone().map(Into::into);
            }
        }
        RoomPhase::Reveal => {
            if let Some((index, question)) = current {
                snapshot.question = Some(QuestionSnapshot::revealed(index, question));
                snapshot.correct_players = Some(
                    session
                        .correct_players(index)
                        .into_iter()
                        .map(Into::into)
                        .collect(),
                );
            }
            snapshot.scoreboard = Some(standings(&session));
        }
        RoomPhase::Ended => {
            snapshot.winner = session.winner.clone().map(Into::into);
            snapshot.scoreboard = Some(standings(&session));
        }
    }

    snapshot
}

fn standings(session: &crate::state::room::RoomSession) -> Vec<PlayerSummary> {
    session
        .standings()
        .into_iter()
        .map(PlayerSummary::from)
        .collect()
}

/// Return the room phase snapshot for public consumers.
pub async fn get_room_phase(
    state: &SharedState,
    room_id: Uuid,
) -> Result<RoomPhaseSnapshot, ServiceError> {
    let room = room_service::load_room(state, room_id).await?;
    Ok(phase_snapshot(state, &room).await)
}

/// Return the roster ordered by score descending.
pub async fn get_players(
    state: &SharedState,
    room_id: Uuid,
) -> Result<PlayersResponse, ServiceError> {
    let room = room_service::load_room(state, room_id).await?;
    let session = room.session().read().await;
    Ok(PlayersResponse {
        players: standings(&session),
    })
}

/// Look a room up by join code and return its public summary.
pub async fn get_room_by_code(
    state: &SharedState,
    code: &str,
) -> Result<RoomSummary, ServiceError> {
    let room_id = room_service::resolve_code(state, code).await?;
    let room = room_service::load_room(state, room_id).await?;
    let phase = room.phase().await;
    let session = room.session().read().await;
    Ok(RoomSummary::from_session(&session, phase.into()))
}
