//! Ticket: one GitHub issue mapped to at most one tracker story.
//!
//! This module holds the pure half of the reconciliation state machine:
//! change detection, trigger gating, label/state mapping and ETA diffing.
//! Everything that talks to a remote service lives in `app::reconcile`.
//!
//! Derived phases (never stored):
//! - `NoStory`: no story id yet
//! - `Unsynced`: story linked, no watched field changed by the last upsert
//! - `NeedsSync`: story linked, brand-new ticket or a watched field changed

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::errors::ValidationError;
use super::ids::{IssueId, IssueNumber, MilestoneId, StoryId};
use super::milestone::Milestone;
use super::payload::IssueFields;
use super::story::{Label, NewStory, Story, StoryState, StoryType, StoryUpdate};

/// Label whose presence authorizes story creation, unless configured otherwise.
pub const DEFAULT_TRIGGERING_LABEL: &str = "PT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(IssueState::Open),
            "closed" => Ok(IssueState::Closed),
            other => Err(ValidationError::Malformed {
                field: "issue.state",
                reason: format!("expected `open` or `closed`, got `{other}`"),
            }),
        }
    }
}

/// Which watched fields differed from the stored values at upsert time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldChanges {
    pub labels: bool,
    pub state: bool,
}

impl FieldChanges {
    pub fn any(&self) -> bool {
        self.labels || self.state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    NoStory,
    Unsynced,
    NeedsSync,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    // GitHub side
    pub issue_id: IssueId,
    pub number: IssueNumber,
    pub title: String,
    pub html_url: String,
    pub labels: Vec<String>,
    pub author: String,
    pub state: IssueState,
    pub body: String,
    pub milestone_id: Option<MilestoneId>,
    pub needs_comment: bool,

    // Tracker side
    pub story_id: Option<StoryId>,
    pub epic_id: Option<MilestoneId>,
    pub epic_label: Option<String>,
    pub eta: Option<NaiveDate>,
    pub previous_eta: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Result of the last upsert; `None` for a ticket that was just created.
    #[serde(skip)]
    changes: Option<FieldChanges>,
}

impl Ticket {
    pub fn new(fields: IssueFields, now: DateTime<Utc>) -> Self {
        Self {
            issue_id: fields.issue_id,
            number: fields.number,
            title: fields.title,
            html_url: fields.html_url,
            labels: fields.labels,
            author: fields.author,
            state: fields.state,
            body: fields.body,
            milestone_id: fields.milestone.map(|m| m.id),
            needs_comment: false,
            story_id: None,
            epic_id: None,
            epic_label: None,
            eta: None,
            previous_eta: None,
            created_at: now,
            updated_at: now,
            changes: None,
        }
    }

    /// Overwrite the GitHub-side fields from a newer payload.
    ///
    /// Changes are computed against the stored values before anything is
    /// assigned; comparing afterwards would always read "unchanged".
    pub fn apply_update(&mut self, fields: IssueFields, now: DateTime<Utc>) -> FieldChanges {
        let changes = FieldChanges {
            labels: label_set(&self.labels) != label_set(&fields.labels),
            state: self.state != fields.state,
        };

        self.number = fields.number;
        self.title = fields.title;
        self.html_url = fields.html_url;
        self.labels = fields.labels;
        self.author = fields.author;
        self.state = fields.state;
        self.body = fields.body;
        self.milestone_id = fields.milestone.map(|m| m.id);
        self.updated_at = now;
        self.changes = Some(changes);
        changes
    }

    pub fn changes(&self) -> Option<FieldChanges> {
        self.changes
    }

    pub fn need_sync(&self) -> bool {
        self.changes.is_none_or(|c| c.any())
    }

    pub fn phase(&self) -> SyncPhase {
        match (self.story_id, self.need_sync()) {
            (None, _) => SyncPhase::NoStory,
            (Some(_), true) => SyncPhase::NeedsSync,
            (Some(_), false) => SyncPhase::Unsynced,
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn should_create_story(&self, triggering_label: &str) -> bool {
        self.story_id.is_none() && self.has_label(triggering_label)
    }

    pub fn story_name(&self) -> String {
        format!("#{}: {}", self.number.get(), self.title)
    }

    pub fn new_story(&self) -> NewStory {
        NewStory {
            name: self.story_name(),
            description: self.html_url.clone(),
            story_type: StoryType::Chore,
        }
    }

    /// Record the id of the story created for this ticket.
    ///
    /// Returns `false` (and keeps the existing id) if a story is already linked.
    pub fn link_story(&mut self, story_id: StoryId, now: DateTime<Utc>) -> bool {
        if self.story_id.is_some() {
            return false;
        }
        self.story_id = Some(story_id);
        self.updated_at = now;
        true
    }

    /// Copy the milestone onto the epic fields. Returns whether anything changed.
    pub fn set_epic(&mut self, milestone: Option<&Milestone>, now: DateTime<Utc>) -> bool {
        let Some(milestone) = milestone else {
            return false;
        };
        let epic_label = Some(milestone.title.clone()).filter(|t| !t.is_empty());
        if self.epic_id == Some(milestone.id) && self.epic_label == epic_label {
            return false;
        }
        self.epic_id = Some(milestone.id);
        self.epic_label = epic_label;
        self.updated_at = now;
        true
    }

    /// Labels the story must carry: the issue labels plus the epic label.
    ///
    /// This is a full overwrite. Labels added only on the tracker side are dropped.
    pub fn desired_labels(&self) -> Vec<Label> {
        let mut names: Vec<&str> = Vec::with_capacity(self.labels.len() + 1);
        for name in self.labels.iter().map(String::as_str) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        if let Some(epic) = self.epic_label.as_deref()
            && !names.contains(&epic)
        {
            names.push(epic);
        }
        names.into_iter().map(Label::named).collect()
    }

    /// State mutations needed to make `story` agree with the issue state.
    ///
    /// States outside the fixed table count as open.
    pub fn state_update(&self, story: &Story) -> StoryUpdate {
        let mapped = story
            .current_state
            .issue_state()
            .unwrap_or(IssueState::Open);
        if mapped == self.state {
            return StoryUpdate::default();
        }

        match self.state {
            // reopened: do not guess which pre-accepted state to restore
            IssueState::Open => StoryUpdate {
                current_state: Some(StoryState::Unstarted),
                accepted_at: Some(None),
                ..Default::default()
            },
            // the tracker only accepts estimated work
            IssueState::Closed => StoryUpdate {
                current_state: Some(StoryState::Accepted),
                estimate: story.estimate.is_none().then_some(0),
                ..Default::default()
            },
        }
    }

    /// Full set of mutations for one sync: labels, then state.
    pub fn reconcile(&self, story: &Story) -> StoryUpdate {
        StoryUpdate {
            labels: Some(self.desired_labels()),
            ..self.state_update(story)
        }
    }

    /// Store a freshly computed ETA. Returns whether the ticket changed.
    pub fn record_eta(&mut self, eta: NaiveDate, now: DateTime<Utc>) -> bool {
        match self.eta {
            Some(current) if current == eta => return false,
            Some(current) => self.previous_eta = Some(current),
            None => {}
        }
        self.eta = Some(eta);
        self.needs_comment = true;
        self.updated_at = now;
        true
    }

    /// Is there a previous ETA worth showing next to the current one?
    pub fn display_previous_eta(&self) -> bool {
        matches!((self.previous_eta, self.eta), (Some(prev), Some(cur)) if prev != cur)
    }

    /// Follow a body the sync engine itself wrote back to the issue source.
    pub fn replace_body(&mut self, body: String, now: DateTime<Utc>) {
        self.body = body;
        self.updated_at = now;
    }

    pub fn clear_needs_comment(&mut self, now: DateTime<Utc>) {
        self.needs_comment = false;
        self.updated_at = now;
    }
}

/// ETA for a story in an iteration finishing at `finish`.
pub fn eta_for(finish: DateTime<Utc>, lead_days: i64) -> NaiveDate {
    finish.date_naive() - Duration::days(lead_days)
}

fn label_set(labels: &[String]) -> BTreeSet<&str> {
    labels.iter().map(String::as_str).collect()
}
