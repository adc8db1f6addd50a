//! Milestone / epic: a GitHub milestone mirrored as a tracker epic label.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::MilestoneId;
use super::payload::MilestoneRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,

    /// Pushed to the story as the epic label.
    pub title: String,

    pub created_at: DateTime<Utc>,
}

impl Milestone {
    pub fn new(reference: MilestoneRef, now: DateTime<Utc>) -> Self {
        Self {
            id: reference.id,
            title: reference.title,
            created_at: now,
        }
    }
}
