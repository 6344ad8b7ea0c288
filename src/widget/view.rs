use crate::models::{Poll, VoteRequest};
use crate::voting::display::vote_text;
use crate::widget::state::{Action, WidgetState, reduce};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRow {
    pub index: usize,
    pub text: String,
    pub vote_text: String,
    pub is_selected: bool,
    // Results stay hidden until the visitor has voted, admins always see them
    pub show_vote: bool,
}

pub fn option_rows(poll: &Poll, selected: Option<usize>, is_admin: bool) -> Vec<OptionRow> {
    let total = poll.total_votes();

    poll.answers
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| OptionRow {
            index,
            text: text.clone(),
            vote_text: vote_text(poll.votes_for(index), total, poll.display_mode),
            is_selected: selected == Some(index),
            show_vote: is_admin || selected.is_some(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVote {
    pub option_index: usize,
    previous: Option<usize>,
}

impl PendingVote {
    pub fn request(&self, profile_id: &str) -> VoteRequest {
        VoteRequest {
            option_id: Some(self.option_index),
            profile_id: Some(profile_id.to_string()),
        }
    }
}

/// Local selection on the poll page, updated before the server confirms.
///
/// On failure the selection rolls back to whatever it was before the click.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteFlow {
    pub selected_option: Option<usize>,
    pub buttons_disabled: bool,
}

impl VoteFlow {
    // Pick up the visitor's recorded vote after a poll fetch
    pub fn sync_from_poll(&mut self, poll: &Poll, profile_id: Option<&str>) {
        if let Some(answer) = profile_id.and_then(|id| poll.answer_of(id)) {
            self.selected_option = Some(answer);
        }
    }

    pub fn begin_vote(&mut self, option_index: usize) -> Option<PendingVote> {
        if self.buttons_disabled {
            return None;
        }

        let pending = PendingVote {
            option_index,
            previous: self.selected_option,
        };
        self.selected_option = Some(option_index);
        self.buttons_disabled = true;
        Some(pending)
    }

    pub fn finish_vote(
        &mut self,
        pending: PendingVote,
        outcome: Result<Poll, String>,
        state: WidgetState,
    ) -> WidgetState {
        self.buttons_disabled = false;

        match outcome {
            Ok(poll) => {
                self.sync_from_poll(&poll, state.profile_id.as_deref());
                reduce(state, Action::SetPoll(poll))
            }
            Err(message) => {
                self.selected_option = pending.previous;
                reduce(state, Action::SetError(message))
            }
        }
    }
}
