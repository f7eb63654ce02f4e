//! Point computation for revealed questions.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::state::room::{Player, Question};

/// Maximum points for an instant correct answer.
const MAX_POINTS: u32 = 1_000;

/// Points awarded for one answer: a correct answer earns up to [`MAX_POINTS`],
/// decaying linearly with the fraction of the time limit consumed. Incorrect
/// answers earn nothing. `time_taken_ms` is clamped into `[0, limit_ms]`.
pub fn answer_points(correct: bool, time_taken_ms: u64, limit_ms: u64) -> u32 {
    if !correct || limit_ms == 0 {
        return 0;
    }
    let time_ms = time_taken_ms.min(limit_ms);
    let fraction_left = 1.0 - (time_ms as f64 / limit_ms as f64);
    (f64::from(MAX_POINTS) * fraction_left).round().max(0.0) as u32
}

/// Score every unscored answer for `question_index`, in one batch over all
/// players. Each answer is marked `scored` and its correctness recorded, so
/// re-running on the same index awards nothing twice.
///
/// Returns the ids of players whose score changed state in this pass.
pub fn score_question(
    players: &mut IndexMap<Uuid, Player>,
    question: &Question,
    question_index: usize,
) -> Vec<Uuid> {
    let limit_ms = u64::from(question.time_limit_sec) * 1_000;
    let mut touched = Vec::new();

    for (id, player) in players.iter_mut() {
        let Some(answer) = player.answers.get_mut(&question_index) else {
            continue;
        };
        if answer.scored {
            continue;
        }

        let correct = answer.option_index == question.correct_index;
        answer.correct = correct;
        answer.scored = true;
        player.score += answer_points(correct, answer.time_taken_ms, limit_ms);
        touched.push(*id);
    }

    touched
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::room::Answer;

    fn question(time_limit_sec: u32) -> Question {
        Question {
            text: "capital of France?".into(),
            options: vec!["Lyon".into(), "Paris".into(), "Nice".into(), "Lille".into()],
            correct_index: 1,
            time_limit_sec,
        }
    }

    fn player_with_answer(option_index: usize, time_taken_ms: u64) -> Player {
        let mut player = Player::new(Uuid::new_v4(), "ada".into(), SystemTime::now());
        player.answers.insert(
            0,
            Answer {
                option_index,
                time_taken_ms,
                submitted_at: SystemTime::now(),
                scored: false,
                correct: false,
            },
        );
        player
    }

    #[test]
    fn halfway_correct_answer_earns_half_the_points() {
        // timeLimitSec=20, answered at 10s: round(1000 * (1 - 0.5)) = 500.
        assert_eq!(answer_points(true, 10_000, 20_000), 500);
    }

    #[test]
    fn incorrect_answers_earn_zero_at_any_speed() {
        for time in [0, 1, 5_000, 20_000] {
            assert_eq!(answer_points(false, time, 20_000), 0);
        }
    }

    #[test]
    fn points_never_increase_with_time_taken() {
        let limit_ms = 17_000;
        let mut previous = u32::MAX;
        for time in (0..=limit_ms).step_by(250) {
            let points = answer_points(true, time, limit_ms);
            assert!(points <= previous, "points rose at {time}ms");
            previous = points;
        }
    }

    #[test]
    fn instant_answer_earns_the_maximum() {
        assert_eq!(answer_points(true, 0, 20_000), 1_000);
    }

    #[test]
    fn time_beyond_the_limit_is_clamped_to_zero_points() {
        assert_eq!(answer_points(true, 20_000, 20_000), 0);
        assert_eq!(answer_points(true, 90_000, 20_000), 0);
    }

    #[test]
    fn batch_scores_all_unscored_answers() {
        let correct = player_with_answer(1, 10_000);
        let wrong = player_with_answer(0, 2_000);
        let mut players = IndexMap::new();
        let correct_id = correct.id;
        let wrong_id = wrong.id;
        players.insert(correct.id, correct);
        players.insert(wrong.id, wrong);

        let touched = score_question(&mut players, &question(20), 0);

        assert_eq!(touched.len(), 2);
        assert_eq!(players[&correct_id].score, 500);
        assert!(players[&correct_id].answers[&0].correct);
        assert_eq!(players[&wrong_id].score, 0);
        assert!(players[&wrong_id].answers[&0].scored);
        assert!(!players[&wrong_id].answers[&0].correct);
    }

    #[test]
    fn rescoring_the_same_question_awards_nothing() {
        let player = player_with_answer(1, 5_000);
        let mut players = IndexMap::new();
        let id = player.id;
        players.insert(player.id, player);

        let first = score_question(&mut players, &question(20), 0);
        let score_after_first = players[&id].score;
        let second = score_question(&mut players, &question(20), 0);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(players[&id].score, score_after_first);
    }

    #[test]
    fn players_without_an_answer_are_skipped() {
        let mut players = IndexMap::new();
        let silent = Player::new(Uuid::new_v4(), "quiet".into(), SystemTime::now());
        let id = silent.id;
        players.insert(silent.id, silent);

        assert!(score_question(&mut players, &question(20), 0).is_empty());
        assert_eq!(players[&id].score, 0);
    }
}
