pub mod display;
pub mod reconcile;

use thiserror::Error;

pub const MAX_QUESTION_CHARS: usize = 150;
pub const MIN_ANSWERS: usize = 2;
pub const MAX_ANSWERS: usize = 10;

// Validation failures raised before any document is written
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Poll question is required.")]
    QuestionRequired,

    #[error("Poll question must be 150 characters or fewer.")]
    QuestionTooLong,

    #[error("At least two options are required.")]
    TooFewAnswers,

    #[error("A poll supports at most 10 options.")]
    TooManyAnswers,

    #[error("Invalid option.")]
    InvalidOption,

    #[error("optionId and profileId are required")]
    MissingVoteFields,
}

/// Trims the question and drops blank answers, keeping the original order.
/// Shared by the update handler and the admin form so both reject the same input.
pub fn validate_poll_input(question: &str, answers: &[String]) -> Result<(String, Vec<String>), PollError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(PollError::QuestionRequired);
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(PollError::QuestionTooLong);
    }

    let answers: Vec<String> = answers
        .iter()
        .map(|answer| answer.trim())
        .filter(|answer| !answer.is_empty())
        .map(str::to_string)
        .collect();

    if answers.len() < MIN_ANSWERS {
        return Err(PollError::TooFewAnswers);
    }
    if answers.len() > MAX_ANSWERS {
        return Err(PollError::TooManyAnswers);
    }

    Ok((question.to_string(), answers))
}
