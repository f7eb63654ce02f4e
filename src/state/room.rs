use std::time::SystemTime;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dao::models::{
        AnswerEntity, PlayerEntity, PlayerSummaryEntity, QuestionEntity, QuizEntity, RoomEntity,
        RoomStateEntity,
    },
    state::{
        clock,
        state_machine::{QuestionStatus, RoomPhase},
    },
};

/// A quiz: a title and its ordered questions.
#[derive(Debug, Clone)]
pub struct Quiz {
    /// Display title shown in the lobby.
    pub title: String,
    /// Questions in play order.
    pub questions: Vec<Question>,
}

/// One multiple-choice question.
#[derive(Debug, Clone)]
pub struct Question {
    /// Question text.
    pub text: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_index: usize,
    /// Seconds players have to answer.
    pub time_limit_sec: u32,
}

/// A locked-in answer for one question.
#[derive(Debug, Clone, Copy)]
pub struct Answer {
    /// The option the player chose.
    pub option_index: usize,
    /// Milliseconds between question start and submission, paused time excluded.
    pub time_taken_ms: u64,
    /// Server receive time.
    pub submitted_at: SystemTime,
    /// Whether this answer has been through a reveal scoring pass.
    pub scored: bool,
    /// Whether the chosen option was correct; meaningful once `scored` is set.
    pub correct: bool,
}

/// A player participating in a room.
#[derive(Debug, Clone)]
pub struct Player {
    /// Server-issued identifier returned at join.
    pub id: Uuid,
    /// Display name (sanitized at join).
    pub name: String,
    /// Accumulated score across scored questions.
    pub score: u32,
    /// When the player first joined.
    pub joined_at: SystemTime,
    /// Answers keyed by question index; at most one per question.
    pub answers: IndexMap<usize, Answer>,
}

impl Player {
    /// Fresh player with no score and no answers.
    pub fn new(id: Uuid, name: String, joined_at: SystemTime) -> Self {
        Self {
            id,
            name,
            score: 0,
            joined_at,
            answers: IndexMap::new(),
        }
    }
}

/// Cached {id, name, score} triple for the paused-leader and winner displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    /// Player identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Score at the time the summary was taken.
    pub score: u32,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            score: player.score,
        }
    }
}

/// Aggregated state for one live room: the quiz, the roster, and the
/// per-question timing bookkeeping. The phase itself lives in the room's
/// state machine; this record holds everything the phase points at.
#[derive(Debug, Clone)]
pub struct RoomSession {
    /// Primary key of the room.
    pub id: Uuid,
    /// Six-digit join code the room was created under.
    pub code: String,
    /// Identifier of the host.
    pub host_id: Uuid,
    /// Secret authorizing host transitions, returned once at creation.
    pub host_token: Uuid,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the room record was updated.
    pub updated_at: SystemTime,
    /// The quiz being played.
    pub quiz: Quiz,
    /// Participating players keyed by id, in join order.
    pub players: IndexMap<Uuid, Player>,
    /// Index of the live question; `None` while in the lobby.
    pub current_question_index: Option<usize>,
    /// When the live question started.
    pub question_start: Option<SystemTime>,
    /// When the in-progress pause began, if paused.
    pub pause_start: Option<SystemTime>,
    /// Total completed pause duration for the live question.
    pub paused_accum_ms: u64,
    /// Leader cached when the host paused; cleared on resume.
    pub leader: Option<PlayerSummary>,
    /// Winner cached when the quiz ended; cleared on reset.
    pub winner: Option<PlayerSummary>,
}

impl RoomSession {
    /// Build a new in-memory session in the lobby with an empty roster.
    pub fn new(code: String, quiz: Quiz) -> Self {
        let timestamp = SystemTime::now();

        Self {
            id: Uuid::new_v4(),
            code,
            host_id: Uuid::new_v4(),
            host_token: Uuid::new_v4(),
            created_at: timestamp,
            updated_at: timestamp,
            quiz,
            players: IndexMap::new(),
            current_question_index: None,
            question_start: None,
            pause_start: None,
            paused_accum_ms: 0,
            leader: None,
            winner: None,
        }
    }

    /// The question at `index`, if it exists.
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.quiz.questions.get(index)
    }

    /// The live question, if any.
    pub fn current_question(&self) -> Option<&Question> {
        self.current_question_index
            .and_then(|index| self.question(index))
    }

    /// Open question `index`: stamp the start time and clear the per-question
    /// pause fields and the leader cache.
    pub fn begin_question(&mut self, index: usize, now: SystemTime) {
        self.current_question_index = Some(index);
        self.question_start = Some(now);
        self.pause_start = None;
        self.paused_accum_ms = 0;
        self.leader = None;
        self.winner = None;
        self.updated_at = now;
    }

    /// Freeze the countdown and cache the current leader for display.
    pub fn pause(&mut self, now: SystemTime) {
        self.pause_start = Some(now);
        self.leader = self.current_leader();
        self.updated_at = now;
    }

    /// Bank the elapsed pause duration and clear the pause fields.
    pub fn resume(&mut self, now: SystemTime) {
        if let Some(pause_start) = self.pause_start.take() {
            let elapsed = now
                .duration_since(pause_start)
                .map(|elapsed| elapsed.as_millis() as u64)
                .unwrap_or(0);
            self.paused_accum_ms += elapsed;
        }
        self.leader = None;
        self.updated_at = now;
    }

    /// Record the top scorer as winner when the quiz ends.
    pub fn finish(&mut self, now: SystemTime) {
        self.winner = self.current_leader();
        self.leader = None;
        self.updated_at = now;
    }

    /// Return everyone to the lobby: zero all scores and answers, clear the
    /// question/pause fields and both caches.
    pub fn reset(&mut self, now: SystemTime) {
        for player in self.players.values_mut() {
            player.score = 0;
            player.answers.clear();
        }
        self.current_question_index = None;
        self.question_start = None;
        self.pause_start = None;
        self.paused_accum_ms = 0;
        self.leader = None;
        self.winner = None;
        self.updated_at = now;
    }

    /// Highest-scoring player right now, ties broken by join order.
    pub fn current_leader(&self) -> Option<PlayerSummary> {
        self.players
            .values()
            .reduce(|best, player| if player.score > best.score { player } else { best })
            .map(PlayerSummary::from)
    }

    /// Players ordered by score descending (join order on ties).
    pub fn standings(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
    }

    /// How many players have locked an answer for `question_index`.
    pub fn answered_count(&self, question_index: usize) -> usize {
        self.players
            .values()
            .filter(|player| player.answers.contains_key(&question_index))
            .count()
    }

    /// Players whose scored answer for `question_index` was correct.
    pub fn correct_players(&self, question_index: usize) -> Vec<PlayerSummary> {
        self.players
            .values()
            .filter(|player| {
                player
                    .answers
                    .get(&question_index)
                    .is_some_and(|answer| answer.scored && answer.correct)
            })
            .map(PlayerSummary::from)
            .collect()
    }

    /// Total paused milliseconds for the live question as of `now`.
    pub fn paused_so_far(&self, now: SystemTime) -> u64 {
        clock::paused_so_far(self.paused_accum_ms, self.pause_start, now)
    }
}

/// Map the persisted state tag and pause flag back onto a machine phase.
pub fn phase_from_entity(state: RoomStateEntity, paused: bool) -> RoomPhase {
    match state {
        RoomStateEntity::Lobby => RoomPhase::Lobby,
        RoomStateEntity::Question if paused => RoomPhase::Question(QuestionStatus::Paused),
        RoomStateEntity::Question => RoomPhase::Question(QuestionStatus::Running),
        RoomStateEntity::Reveal => RoomPhase::Reveal,
        RoomStateEntity::Ended => RoomPhase::Ended,
    }
}

/// Split a machine phase into the persisted state tag and pause flag.
pub fn phase_to_entity(phase: RoomPhase) -> (RoomStateEntity, bool) {
    match phase {
        RoomPhase::Lobby => (RoomStateEntity::Lobby, false),
        RoomPhase::Question(QuestionStatus::Running) => (RoomStateEntity::Question, false),
        RoomPhase::Question(QuestionStatus::Paused) => (RoomStateEntity::Question, true),
        RoomPhase::Reveal => (RoomStateEntity::Reveal, false),
        RoomPhase::Ended => (RoomStateEntity::Ended, false),
    }
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            text: value.text,
            options: value.options,
            correct_index: value.correct_index,
            time_limit_sec: value.time_limit_sec,
        }
    }
}

impl From<Question> for QuestionEntity {
    fn from(value: Question) -> Self {
        Self {
            text: value.text,
            options: value.options,
            correct_index: value.correct_index,
            time_limit_sec: value.time_limit_sec,
        }
    }
}

impl From<QuizEntity> for Quiz {
    fn from(value: QuizEntity) -> Self {
        Self {
            title: value.title,
            questions: value.questions.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Quiz> for QuizEntity {
    fn from(value: Quiz) -> Self {
        Self {
            title: value.title,
            questions: value.questions.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<PlayerEntity> for Player {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            score: value.score,
            joined_at: value.joined_at,
            answers: value
                .answers
                .into_iter()
                .map(|answer| {
                    (
                        answer.question_index,
                        Answer {
                            option_index: answer.option_index,
                            time_taken_ms: answer.time_taken_ms,
                            submitted_at: answer.submitted_at,
                            scored: answer.scored,
                            correct: answer.correct,
                        },
                    )
                })
                .collect(),
        }
    }
}

impl From<&Player> for PlayerEntity {
    fn from(value: &Player) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            score: value.score,
            joined_at: value.joined_at,
            answers: value
                .answers
                .iter()
                .map(|(question_index, answer)| AnswerEntity {
                    question_index: *question_index,
                    option_index: answer.option_index,
                    time_taken_ms: answer.time_taken_ms,
                    submitted_at: answer.submitted_at,
                    scored: answer.scored,
                    correct: answer.correct,
                })
                .collect(),
        }
    }
}

impl From<PlayerSummaryEntity> for PlayerSummary {
    fn from(value: PlayerSummaryEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            score: value.score,
        }
    }
}

impl From<PlayerSummary> for PlayerSummaryEntity {
    fn from(value: PlayerSummary) -> Self {
        Self {
            id: value.id,
            name: value.name,
            score: value.score,
        }
    }
}

impl RoomSession {
    /// Persisted form of the room document, excluding the player roster and
    /// carrying the phase tag separately (the phase lives in the machine).
    pub fn to_entity(&self, phase: RoomPhase) -> RoomEntity {
        let (state, paused) = phase_to_entity(phase);
        RoomEntity {
            id: self.id,
            code: self.code.clone(),
            host_id: self.host_id,
            host_token: self.host_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
            state,
            paused,
            quiz: self.quiz.clone().into(),
            current_question_index: self.current_question_index,
            question_start: self.question_start,
            pause_start: self.pause_start,
            paused_accum_ms: self.paused_accum_ms,
            leader: self.leader.clone().map(Into::into),
            winner: self.winner.clone().map(Into::into),
        }
    }

    /// Re-hydrate a session from its persisted parts.
    pub fn from_entities(room: RoomEntity, players: Vec<PlayerEntity>) -> Self {
        Self {
            id: room.id,
            code: room.code,
            host_id: room.host_id,
            host_token: room.host_token,
            created_at: room.created_at,
            updated_at: room.updated_at,
            quiz: room.quiz.into(),
            players: players
                .into_iter()
                .map(|player| (player.id, player.into()))
                .collect(),
            current_question_index: room.current_question_index,
            question_start: room.question_start,
            pause_start: room.pause_start,
            paused_accum_ms: room.paused_accum_ms,
            leader: room.leader.map(Into::into),
            winner: room.winner.map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn sample_quiz() -> Quiz {
        Quiz {
            title: "general knowledge".into(),
            questions: vec![
                Question {
                    text: "q1".into(),
                    options: vec!["a".into(), "b".into()],
                    correct_index: 0,
                    time_limit_sec: 20,
                },
                Question {
                    text: "q2".into(),
                    options: vec!["a".into(), "b".into()],
                    correct_index: 1,
                    time_limit_sec: 15,
                },
            ],
        }
    }

    fn session_with_players() -> RoomSession {
        let mut session = RoomSession::new("123456".into(), sample_quiz());
        let now = SystemTime::now();
        for (name, score) in [("ada", 300), ("grace", 700)] {
            let mut player = Player::new(Uuid::new_v4(), name.into(), now);
            player.score = score;
            session.players.insert(player.id, player);
        }
        session
    }

    #[test]
    fn begin_question_clears_pause_bookkeeping() {
        let mut session = session_with_players();
        let now = SystemTime::now();
        session.paused_accum_ms = 9_000;
        session.pause_start = Some(now);
        session.leader = session.current_leader();

        session.begin_question(1, now);

        assert_eq!(session.current_question_index, Some(1));
        assert_eq!(session.question_start, Some(now));
        assert_eq!(session.paused_accum_ms, 0);
        assert!(session.pause_start.is_none());
        assert!(session.leader.is_none());
    }

    #[test]
    fn pause_caches_the_leader_and_resume_banks_the_duration() {
        let mut session = session_with_players();
        let start = SystemTime::now();
        session.begin_question(0, start);

        let pause_at = start + Duration::from_secs(5);
        session.pause(pause_at);
        assert_eq!(session.pause_start, Some(pause_at));
        assert_eq!(session.leader.as_ref().map(|leader| leader.name.as_str()), Some("grace"));

        let resume_at = pause_at + Duration::from_millis(2_500);
        session.resume(resume_at);
        assert!(session.pause_start.is_none());
        assert!(session.leader.is_none());
        assert_eq!(session.paused_accum_ms, 2_500);
    }

    #[test]
    fn finish_caches_the_winner() {
        let mut session = session_with_players();
        session.finish(SystemTime::now());
        let winner = session.winner.expect("winner cached");
        assert_eq!(winner.name, "grace");
        assert_eq!(winner.score, 700);
    }

    #[test]
    fn reset_zeroes_scores_and_answers() {
        let mut session = session_with_players();
        let now = SystemTime::now();
        session.begin_question(0, now);
        let first_id = *session.players.keys().next().unwrap();
        session.players[&first_id].answers.insert(
            0,
            Answer {
                option_index: 0,
                time_taken_ms: 1_000,
                submitted_at: now,
                scored: true,
                correct: true,
            },
        );
        session.finish(now);

        session.reset(now);

        assert!(session.current_question_index.is_none());
        assert!(session.question_start.is_none());
        assert!(session.winner.is_none());
        for player in session.players.values() {
            assert_eq!(player.score, 0);
            assert!(player.answers.is_empty());
        }
    }

    #[test]
    fn standings_order_by_score_descending() {
        let session = session_with_players();
        let standings = session.standings();
        assert_eq!(standings[0].name, "grace");
        assert_eq!(standings[1].name, "ada");
    }

    #[test]
    fn entity_round_trip_preserves_the_session() {
        let mut session = session_with_players();
        let now = SystemTime::now();
        session.begin_question(0, now);

        let phase = RoomPhase::Question(QuestionStatus::Running);
        let room_entity = session.to_entity(phase);
        let player_entities: Vec<PlayerEntity> =
            session.players.values().map(PlayerEntity::from).collect();

        assert_eq!(phase_from_entity(room_entity.state, room_entity.paused), phase);

        let rebuilt = RoomSession::from_entities(room_entity, player_entities);
        assert_eq!(rebuilt.id, session.id);
        assert_eq!(rebuilt.code, session.code);
        assert_eq!(rebuilt.players.len(), session.players.len());
        assert_eq!(rebuilt.current_question_index, Some(0));
        assert_eq!(rebuilt.quiz.questions.len(), 2);
    }
}
