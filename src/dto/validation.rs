//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dto::rooms::QuestionInput;

/// Names longer than this are truncated rather than rejected.
pub const MAX_NAME_LEN: usize = 20;
/// Sanitized names shorter than this are rejected.
pub const MIN_NAME_LEN: usize = 2;

/// Normalize a raw display name: trim the ends, collapse internal whitespace
/// runs to single spaces, and truncate to [`MAX_NAME_LEN`] characters.
pub fn sanitize_player_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_NAME_LEN).collect()
}

/// Validates that a display name still has at least [`MIN_NAME_LEN`]
/// characters once sanitized.
///
/// # Examples
///
/// ```ignore
/// validate_player_name("Ada Lovelace") // Ok
/// validate_player_name("  a  ")        // Err - one character after trim
/// validate_player_name("\t\n")         // Err - whitespace only
/// ```
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let sanitized = sanitize_player_name(name);
    if sanitized.chars().count() < MIN_NAME_LEN {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("Player name must have at least {MIN_NAME_LEN} characters").into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates the cross-field constraints of a question: the correct index
/// must point at one of its options.
pub fn validate_question_input(question: &QuestionInput) -> Result<(), ValidationError> {
    if question.correct_index >= question.options.len() {
        let mut err = ValidationError::new("correct_index_range");
        err.message = Some(
            format!(
                "Correct index {} is out of range for {} options",
                question.correct_index,
                question.options.len()
            )
            .into(),
        );
        return Err(err);
    }

    if question.options.iter().any(|option| option.trim().is_empty()) {
        let mut err = ValidationError::new("empty_option");
        err.message = Some("Options must not be blank".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_and_truncates() {
        assert_eq!(sanitize_player_name("  Ada   Lovelace  "), "Ada Lovelace");
        assert_eq!(sanitize_player_name("a\t\nb"), "a b");
        assert_eq!(
            sanitize_player_name("abcdefghijklmnopqrstuvwxyz"),
            "abcdefghijklmnopqrst"
        );
    }

    #[test]
    fn valid_names_pass() {
        assert!(validate_player_name("Ada").is_ok());
        assert!(validate_player_name("  Jo  ").is_ok());
    }

    #[test]
    fn short_or_blank_names_fail() {
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err());
        assert!(validate_player_name(" a ").is_err());
    }

    #[test]
    fn question_with_out_of_range_index_fails() {
        let question = QuestionInput {
            text: "q".into(),
            options: vec!["a".into(), "b".into()],
            correct_index: 2,
            time_limit_sec: 20,
        };
        assert!(validate_question_input(&question).is_err());
    }

    #[test]
    fn question_with_blank_option_fails() {
        let question = QuestionInput {
            text: "q".into(),
            options: vec!["a".into(), "  ".into()],
            correct_index: 0,
            time_limit_sec: 20,
        };
        assert!(validate_question_input(&question).is_err());
    }
}
