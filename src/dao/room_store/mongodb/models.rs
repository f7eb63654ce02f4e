use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, PlayerEntity, PlayerSummaryEntity, QuizEntity, RoomEntity, RoomStateEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    code: String,
    host_id: Uuid,
    host_token: Uuid,
    created_at: DateTime,
    updated_at: DateTime,
    state: RoomStateEntity,
    #[serde(default)]
    paused: bool,
    quiz: QuizEntity,
    current_question_index: Option<usize>,
    question_start: Option<DateTime>,
    pause_start: Option<DateTime>,
    paused_accum_ms: i64,
    leader: Option<PlayerSummaryEntity>,
    winner: Option<PlayerSummaryEntity>,
}

impl From<RoomEntity> for MongoRoomDocument {
    fn from(value: RoomEntity) -> Self {
        Self {
            id: value.id,
            code: value.code,
            host_id: value.host_id,
            host_token: value.host_token,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            state: value.state,
            paused: value.paused,
            quiz: value.quiz,
            current_question_index: value.current_question_index,
            question_start: value.question_start.map(DateTime::from_system_time),
            pause_start: value.pause_start.map(DateTime::from_system_time),
            paused_accum_ms: value.paused_accum_ms as i64,
            leader: value.leader,
            winner: value.winner,
        }
    }
}

impl From<MongoRoomDocument> for RoomEntity {
    fn from(value: MongoRoomDocument) -> Self {
        Self {
            id: value.id,
            code: value.code,
            host_id: value.host_id,
            host_token: value.host_token,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            state: value.state,
            paused: value.paused,
            quiz: value.quiz,
            current_question_index: value.current_question_index,
            question_start: value.question_start.map(DateTime::to_system_time),
            pause_start: value.pause_start.map(DateTime::to_system_time),
            paused_accum_ms: value.paused_accum_ms.max(0) as u64,
            leader: value.leader,
            winner: value.winner,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    pub room_id: Uuid,
    pub player_id: Uuid,
    pub name: String,
    pub score: u32,
    pub joined_at: DateTime,
    pub answers: Vec<MongoAnswerDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAnswerDocument {
    question_index: usize,
    option_index: usize,
    time_taken_ms: i64,
    submitted_at: DateTime,
    scored: bool,
    correct: bool,
}

impl From<(Uuid, PlayerEntity)> for MongoPlayerDocument {
    fn from((room_id, player): (Uuid, PlayerEntity)) -> Self {
        Self {
            room_id,
            player_id: player.id,
            name: player.name,
            score: player.score,
            joined_at: DateTime::from_system_time(player.joined_at),
            answers: player
                .answers
                .into_iter()
                .map(|answer| MongoAnswerDocument {
                    question_index: answer.question_index,
                    option_index: answer.option_index,
                    time_taken_ms: answer.time_taken_ms as i64,
                    submitted_at: DateTime::from_system_time(answer.submitted_at),
                    scored: answer.scored,
                    correct: answer.correct,
                })
                .collect(),
        }
    }
}

impl From<MongoPlayerDocument> for PlayerEntity {
    fn from(value: MongoPlayerDocument) -> Self {
        Self {
            id: value.player_id,
            name: value.name,
            score: value.score,
            joined_at: value.joined_at.to_system_time(),
            answers: value
                .answers
                .into_iter()
                .map(|answer| AnswerEntity {
                    question_index: answer.question_index,
                    option_index: answer.option_index,
                    time_taken_ms: answer.time_taken_ms.max(0) as u64,
                    submitted_at: answer.submitted_at.to_system_time(),
                    scored: answer.scored,
                    correct: answer.correct,
                })
                .collect(),
        }
    }
}

/// Join code reservation document; the code itself is the primary key, so a
/// plain insert is an atomic claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCodeDocument {
    #[serde(rename = "_id")]
    pub code: String,
    pub room_id: Uuid,
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
