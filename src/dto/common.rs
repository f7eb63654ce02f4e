use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::phase::VisibleRoomPhase,
    state::room::{self, Question},
};

/// Snapshot of a player used in rosters, reveals, and caches.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub name: String,
    pub score: u32,
}

impl From<&room::Player> for PlayerSummary {
    fn from(player: &room::Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            score: player.score,
        }
    }
}

impl From<room::PlayerSummary> for PlayerSummary {
    fn from(summary: room::PlayerSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            score: summary.score,
        }
    }
}

/// Snapshot of the live question. The correct answer is withheld until the
/// reveal so a player inspecting the payload learns nothing early.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct QuestionSnapshot {
    /// Index of the question within the quiz.
    pub index: usize,
    pub text: String,
    pub options: Vec<String>,
    /// Seconds players have to answer.
    pub time_limit_sec: u32,
    /// Index of the correct option; present during reveal and ended only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<usize>,
}

impl QuestionSnapshot {
    /// Snapshot shown while the question is live, correct answer withheld.
    pub fn hidden(index: usize, question: &Question) -> Self {
        Self {
            index,
            text: question.text.clone(),
            options: question.options.clone(),
            time_limit_sec: question.time_limit_sec,
            correct_index: None,
        }
    }

    /// Snapshot shown from the reveal onwards, correct answer included.
    pub fn revealed(index: usize, question: &Question) -> Self {
        Self {
            correct_index: Some(question.correct_index),
            ..Self::hidden(index, question)
        }
    }
}

/// Shared snapshot describing the current room phase and related context.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct RoomPhaseSnapshot {
    pub phase: VisibleRoomPhase,
    /// True while the live question's countdown is frozen.
    pub paused: bool,
    pub room_id: Uuid,
    /// Title of the quiz being played.
    pub quiz_title: String,
    /// Total number of questions in the quiz.
    pub question_count: usize,
    /// True when the backend operates in degraded mode (no connection to database).
    pub degraded: bool,
    /// Present during question/reveal/ended phases to expose the current question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionSnapshot>,
    /// Present during the question phase: whole seconds left on the countdown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_sec: Option<u64>,
    /// Present during the question phase: how many players have locked an answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_count: Option<usize>,
    /// Present while paused to display the current leader.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<PlayerSummary>,
    /// Present during the reveal: players who answered the question correctly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_players: Option<Vec<PlayerSummary>>,
    /// Present during reveal/ended phases: players ordered by score descending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoreboard: Option<Vec<PlayerSummary>>,
    /// Present once the quiz has ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<PlayerSummary>,
}
