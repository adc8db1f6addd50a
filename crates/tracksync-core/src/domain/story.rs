//! Tracker-side model: stories, pending story mutations and iterations.
//!
//! None of these types are persisted by the sync engine. A `Story` lives in a
//! `StoryPass` for the duration of one reconciliation pass.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::StoryId;
use super::ticket::IssueState;

/// Workflow state of a tracker story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryState {
    Unscheduled,
    Unstarted,
    Planned,
    Started,
    Finished,
    Delivered,
    Rejected,
    Accepted,
}

impl StoryState {
    /// Fixed tracker -> issue state table.
    ///
    /// Only the four states below have a defined counterpart; the others are
    /// in-flight states and return `None`.
    pub fn issue_state(self) -> Option<IssueState> {
        match self {
            StoryState::Accepted => Some(IssueState::Closed),
            StoryState::Unstarted | StoryState::Unscheduled | StoryState::Started => {
                Some(IssueState::Open)
            }
            StoryState::Planned
            | StoryState::Finished
            | StoryState::Delivered
            | StoryState::Rejected => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoryState::Unscheduled => "unscheduled",
            StoryState::Unstarted => "unstarted",
            StoryState::Planned => "planned",
            StoryState::Started => "started",
            StoryState::Finished => "finished",
            StoryState::Delivered => "delivered",
            StoryState::Rejected => "rejected",
            StoryState::Accepted => "accepted",
        }
    }
}

impl fmt::Display for StoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryType {
    Feature,
    Bug,
    Chore,
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
}

impl Label {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub story_type: StoryType,
    pub current_state: StoryState,
    #[serde(default)]
    pub estimate: Option<u32>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub url: String,
}

impl Story {
    pub fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.name.as_str()).collect()
    }

    /// Apply pending mutations locally, mirroring what the tracker will store.
    pub fn apply(&mut self, update: &StoryUpdate) {
        if let Some(labels) = &update.labels {
            self.labels = labels.clone();
        }
        if let Some(state) = update.current_state {
            self.current_state = state;
        }
        if let Some(estimate) = update.estimate {
            self.estimate = Some(estimate);
        }
        if let Some(accepted_at) = update.accepted_at {
            self.accepted_at = accepted_at;
        }
    }
}

/// Request body for story creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewStory {
    pub name: String,
    pub description: String,
    pub story_type: StoryType,
}

/// Pending story mutations, committed by a single remote update.
///
/// `accepted_at` is doubly optional: `None` leaves the field untouched,
/// `Some(None)` serializes as `null` and clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<StoryState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<Option<DateTime<Utc>>>,
}

/// One iteration of the tracker backlog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Iteration {
    pub number: u32,
    pub finish: DateTime<Utc>,
    #[serde(default)]
    pub stories: Vec<Story>,
}
