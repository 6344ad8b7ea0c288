use crate::models::{DisplayMode, OptionTally, Poll, VoteRecord};
use crate::voting::{PollError, validate_poll_input};
use std::collections::BTreeMap;

/// Builds the next poll for an edit that changes the question or answers.
///
/// Option indices may now point at different text, so every tally is zeroed
/// and all recorded results are dropped.
pub fn apply_crucial_update(
    question: &str,
    answers: &[String],
    display_mode: DisplayMode,
) -> Result<Poll, PollError> {
    let (question, answers) = validate_poll_input(question, answers)?;

    let options: BTreeMap<usize, OptionTally> = (0..answers.len())
        .map(|index| (index, OptionTally::default()))
        .collect();

    Ok(Poll {
        question,
        answers,
        display_mode,
        options,
        results: BTreeMap::new(),
    })
}

/// Display mode only. Votes, answers and stale option keys are left as they are.
pub fn apply_non_crucial_update(previous: &Poll, display_mode: DisplayMode) -> Poll {
    Poll {
        display_mode,
        ..previous.clone()
    }
}

/// Moves (or casts) a profile's single vote to `option_index`.
pub fn apply_vote(previous: &Poll, option_index: usize, profile_id: &str) -> Result<Poll, PollError> {
    let profile_id = profile_id.trim();
    if profile_id.is_empty() {
        return Err(PollError::MissingVoteFields);
    }

    // Votes only land on answers that exist and have text
    match previous.answers.get(option_index) {
        Some(answer) if !answer.trim().is_empty() => {}
        _ => return Err(PollError::InvalidOption),
    }

    let mut next = previous.clone();

    if let Some(previous_answer) = previous.answer_of(profile_id) {
        // Only touch an entry that exists; a stale index is left alone
        if let Some(tally) = next.options.get_mut(&previous_answer) {
            tally.votes = tally.votes.saturating_sub(1);
        }
    }

    next.options.entry(option_index).or_default().votes += 1;
    next.results
        .insert(profile_id.to_string(), VoteRecord { answer: option_index });

    Ok(next)
}

pub fn reset() -> Poll {
    Poll::default()
}
