use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Quiz definition carried inside a room document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizEntity {
    /// Display title of the quiz.
    pub title: String,
    /// Questions in play order.
    pub questions: Vec<QuestionEntity>,
}

/// Question entry inside a quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Question text shown to players.
    pub text: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_index: usize,
    /// Seconds players have to answer.
    pub time_limit_sec: u32,
}

/// Persisted phase tag of a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomStateEntity {
    /// Waiting for players to join.
    Lobby,
    /// A question is live (the pause flag tells running from paused).
    Question,
    /// Scores for the latest question are on display.
    Reveal,
    /// The quiz is over.
    Ended,
}

/// Representation of a player stored in persistence and shared across layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name chosen at join.
    pub name: String,
    /// Current score for the player.
    pub score: u32,
    /// When the player first joined the room.
    pub joined_at: SystemTime,
    /// Locked-in answers, one per question at most.
    pub answers: Vec<AnswerEntity>,
}

/// One locked-in answer belonging to a player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Index of the question this answer belongs to.
    pub question_index: usize,
    /// The chosen option.
    pub option_index: usize,
    /// Milliseconds between question start and submission, paused time excluded.
    pub time_taken_ms: u64,
    /// Server receive time.
    pub submitted_at: SystemTime,
    /// Whether this answer has been through a reveal scoring pass.
    pub scored: bool,
    /// Whether the chosen option was correct.
    pub correct: bool,
}

/// Summary representation of a player used for the leader and winner caches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerSummaryEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name chosen at join.
    pub name: String,
    /// Score at the time the summary was taken.
    pub score: u32,
}

/// Aggregate room entity persisted by the storage layer, roster excluded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Primary key of the room.
    pub id: Uuid,
    /// Six-digit join code.
    pub code: String,
    /// Identifier of the host.
    pub host_id: Uuid,
    /// Secret authorizing host transitions.
    pub host_token: Uuid,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the room entity was updated.
    pub updated_at: SystemTime,
    /// Persisted phase tag.
    pub state: RoomStateEntity,
    /// Whether the live question is paused.
    pub paused: bool,
    /// The quiz being played.
    pub quiz: QuizEntity,
    /// Index of the live question, if any.
    pub current_question_index: Option<usize>,
    /// When the live question started.
    pub question_start: Option<SystemTime>,
    /// When the in-progress pause began, if paused.
    pub pause_start: Option<SystemTime>,
    /// Total completed pause duration for the live question.
    pub paused_accum_ms: u64,
    /// Leader cached while paused.
    pub leader: Option<PlayerSummaryEntity>,
    /// Winner cached once ended.
    pub winner: Option<PlayerSummaryEntity>,
}
