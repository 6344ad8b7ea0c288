use crate::models::{Poll, Visitor};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Page {
    #[default]
    Loading,
    Home,
    Error,
}

/// Everything the poll widget knows about the current session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetState {
    pub page: Page,
    pub error: Option<String>,
    pub has_interactive_params: bool,
    pub has_setup_backend: bool,
    pub profile_id: Option<String>,
    pub scene_drop_id: Option<String>,
    pub visitor: Option<Visitor>,
    pub poll: Option<Poll>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetInteractiveParams {
        profile_id: String,
        scene_drop_id: String,
    },
    SetHasSetupBackend(bool),
    SetVisitorInfo(Visitor),
    SetPoll(Poll),
    SetError(String),
    // Session could not be established; the widget shows the error page
    BootstrapFailed(String),
}

impl WidgetState {
    pub fn is_admin(&self) -> bool {
        self.visitor.as_ref().map(|v| v.is_admin).unwrap_or(false)
    }

    /// A poll with no question is treated as "not configured yet".
    pub fn configured_poll(&self) -> Option<&Poll> {
        self.poll.as_ref().filter(|poll| !poll.question.trim().is_empty())
    }
}

pub fn reduce(state: WidgetState, action: Action) -> WidgetState {
    match action {
        Action::SetInteractiveParams { profile_id, scene_drop_id } => WidgetState {
            has_interactive_params: true,
            profile_id: Some(profile_id),
            scene_drop_id: Some(scene_drop_id),
            ..state
        },
        Action::SetHasSetupBackend(has_setup_backend) => WidgetState {
            has_setup_backend,
            ..state
        },
        Action::SetVisitorInfo(visitor) => WidgetState {
            visitor: Some(visitor),
            page: Page::Home,
            ..state
        },
        Action::SetPoll(poll) => WidgetState {
            poll: Some(poll),
            error: None,
            ..state
        },
        Action::SetError(error) => WidgetState {
            error: Some(error),
            ..state
        },
        Action::BootstrapFailed(error) => WidgetState {
            error: Some(error),
            page: Page::Error,
            ..state
        },
    }
}
