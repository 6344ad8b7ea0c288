use crate::models::{DisplayMode, Poll, UpdatePollRequest};
use crate::voting::{MAX_ANSWERS, PollError, validate_poll_input};

pub const DEFAULT_ANSWER_SLOTS: usize = 5;

/// The admin's edit form for a poll.
///
/// Remembers the question and answers it was loaded with so a save can tell
/// whether it has to reset results (crucial) or only change the display mode.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminForm {
    pub question: String,
    pub answers: Vec<String>,
    pub display_mode: DisplayMode,
    original_question: String,
    original_answers: Vec<String>,
}

impl Default for AdminForm {
    fn default() -> Self {
        Self::from_poll(&Poll::default())
    }
}

impl AdminForm {
    pub fn from_poll(poll: &Poll) -> Self {
        let mut answers: Vec<String> = poll.answers.iter().take(MAX_ANSWERS).cloned().collect();
        if answers.len() < DEFAULT_ANSWER_SLOTS {
            answers.resize(DEFAULT_ANSWER_SLOTS, String::new());
        }

        Self {
            question: poll.question.clone(),
            answers,
            display_mode: poll.display_mode,
            original_question: normalized_question(&poll.question),
            original_answers: normalized_answers(&poll.answers),
        }
    }

    pub fn set_answer(&mut self, index: usize, value: &str) -> bool {
        match self.answers.get_mut(index) {
            Some(slot) => {
                *slot = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn add_answer_slot(&mut self) -> bool {
        if self.answers.len() >= MAX_ANSWERS {
            return false;
        }
        self.answers.push(String::new());
        true
    }

    pub fn is_crucial(&self) -> bool {
        normalized_question(&self.question) != self.original_question
            || normalized_answers(&self.answers) != self.original_answers
    }

    pub fn validate(&self) -> Result<(), PollError> {
        validate_poll_input(&self.question, &self.answers).map(|_| ())
    }

    /// Body for `PUT /poll`. Question and answers are only sent with a crucial save.
    pub fn to_request(&self) -> Result<UpdatePollRequest, PollError> {
        self.validate()?;

        if !self.is_crucial() {
            return Ok(UpdatePollRequest {
                question: None,
                answers: None,
                display_mode: self.display_mode,
                crucial: false,
            });
        }

        Ok(UpdatePollRequest {
            question: Some(self.question.trim().to_string()),
            answers: Some(normalized_answers(&self.answers)),
            display_mode: self.display_mode,
            crucial: true,
        })
    }
}

fn normalized_question(question: &str) -> String {
    question.trim().to_string()
}

fn normalized_answers(answers: &[String]) -> Vec<String> {
    answers
        .iter()
        .map(|answer| answer.trim())
        .filter(|answer| !answer.is_empty())
        .map(str::to_string)
        .collect()
}
