use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        common::{PlayerSummary, RoomPhaseSnapshot},
        format_system_time,
        phase::VisibleRoomPhase,
        validation::{validate_player_name, validate_question_input},
    },
    state::room::{Player, Question, Quiz, RoomSession},
};

/// Payload used to open a brand-new room. Omitting the quiz plays the
/// configured default one.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    #[serde(default)]
    #[validate(nested)]
    pub quiz: Option<QuizInput>,
}

/// Incoming quiz definition for the room bootstrap.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct QuizInput {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(length(min = 1), nested)]
    pub questions: Vec<QuestionInput>,
}

/// Question details required to populate a quiz.
#[derive(Debug, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_question_input"))]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
    #[validate(length(min = 2, max = 8))]
    pub options: Vec<String>,
    pub correct_index: usize,
    #[validate(range(min = 5, max = 300))]
    pub time_limit_sec: u32,
}

impl From<QuizInput> for Quiz {
    fn from(value: QuizInput) -> Self {
        Self {
            title: value.title,
            questions: value
                .questions
                .into_iter()
                .map(|question| Question {
                    text: question.text,
                    options: question.options,
                    correct_index: question.correct_index,
                    time_limit_sec: question.time_limit_sec,
                })
                .collect(),
        }
    }
}

/// Credentials returned once when a room is created. The host token is never
/// exposed again afterwards.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRoomResponse {
    pub room_id: Uuid,
    /// Six-digit code players use to join.
    pub code: String,
    pub host_id: Uuid,
    /// Secret to present in the `X-Host-Token` header on host endpoints.
    pub host_token: Uuid,
}

/// Payload used to join a room by code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    /// Display name; trimmed, inner whitespace collapsed, truncated to 20 chars.
    #[validate(custom(function = "validate_player_name"))]
    pub name: String,
    /// Resubmitting an existing id renames that player instead of adding one.
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

/// Identity returned after a successful join.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinRoomResponse {
    pub room_id: Uuid,
    pub player_id: Uuid,
    /// The sanitized name actually stored.
    pub name: String,
    pub score: u32,
}

impl JoinRoomResponse {
    pub fn from_player(room_id: Uuid, player: &Player) -> Self {
        Self {
            room_id,
            player_id: player.id,
            name: player.name.clone(),
            score: player.score,
        }
    }
}

/// Payload locking in a player's answer for the live question.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub player_id: Uuid,
    pub option_index: usize,
}

/// Acknowledgement for a locked-in answer.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    /// Milliseconds between question start and submission, paused time excluded.
    pub time_taken_ms: u64,
}

/// Response returned by every host transition endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct HostActionResponse {
    pub message: String,
    pub snapshot: RoomPhaseSnapshot,
}

/// Public summary of a room returned when looking it up by code.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    pub room_id: Uuid,
    pub code: String,
    pub phase: VisibleRoomPhase,
    pub quiz_title: String,
    pub question_count: usize,
    pub players: Vec<PlayerSummary>,
    pub created_at: String,
}

impl RoomSummary {
    pub fn from_session(session: &RoomSession, phase: VisibleRoomPhase) -> Self {
        Self {
            room_id: session.id,
            code: session.code.clone(),
            phase,
            quiz_title: session.quiz.title.clone(),
            question_count: session.quiz.questions.len(),
            players: session.players.values().map(PlayerSummary::from).collect(),
            created_at: format_system_time(session.created_at),
        }
    }
}
