use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Poll state as stored on a dropped asset's data object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Poll {
    pub question: String,
    pub answers: Vec<String>,
    pub display_mode: DisplayMode,
    // Keyed by option index; serialized as stringified integers
    pub options: BTreeMap<usize, OptionTally>,
    // Keyed by visitor profile id
    pub results: BTreeMap<String, VoteRecord>,
}

impl Default for Poll {
    fn default() -> Self {
        Self {
            question: String::new(),
            answers: vec![String::new(), String::new()],
            display_mode: DisplayMode::default(),
            options: BTreeMap::new(),
            results: BTreeMap::new(),
        }
    }
}

impl Poll {
    pub fn total_votes(&self) -> u64 {
        self.options.values().map(|tally| tally.votes).sum()
    }

    pub fn votes_for(&self, option_index: usize) -> u64 {
        self.options
            .get(&option_index)
            .map(|tally| tally.votes)
            .unwrap_or(0)
    }

    pub fn answer_of(&self, profile_id: &str) -> Option<usize> {
        self.results.get(profile_id).map(|record| record.answer)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Percentage,
    Count,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionTally {
    pub votes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub answer: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub is_admin: bool,
    pub profile_id: String,
}

// Request bodies

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default)]
    pub crucial: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_id: Option<usize>,
    pub profile_id: Option<String>,
}

// Response bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResponse {
    pub poll: Poll,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorResponse {
    pub visitor: Visitor,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub app_version: String,
    pub status: String,
    pub server_start_date: DateTime<Utc>,
    pub envs: HashMap<String, Option<String>>,
}
