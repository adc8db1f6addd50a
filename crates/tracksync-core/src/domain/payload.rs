//! Decoding of the webhook payload into primitive issue fields.
//!
//! Only the fields the sync engine reads are modelled; everything else in
//! GitHub's `issues` event is ignored.

use serde::Deserialize;

use super::errors::ValidationError;
use super::ids::{IssueId, IssueNumber, MilestoneId};
use super::ticket::IssueState;

/// Milestone as referenced by an issue payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneRef {
    pub id: MilestoneId,
    pub title: String,
}

/// Issue fields decoded from one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueFields {
    pub issue_id: IssueId,
    pub number: IssueNumber,
    pub title: String,
    pub html_url: String,
    pub labels: Vec<String>,
    pub author: String,
    pub state: IssueState,
    pub body: String,
    pub milestone: Option<MilestoneRef>,
}

#[derive(Deserialize)]
struct RawIssue {
    id: Option<IssueId>,
    number: Option<IssueNumber>,
    title: Option<String>,
    html_url: Option<String>,
    labels: Option<Vec<RawLabel>>,
    state: Option<String>,
    body: Option<String>,
    milestone: Option<RawMilestone>,
}

#[derive(Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Deserialize)]
struct RawMilestone {
    id: MilestoneId,
    title: Option<String>,
}

#[derive(Deserialize)]
struct RawSender {
    login: Option<String>,
}

impl IssueFields {
    /// Decode the `issue` and `sender` objects of a delivery.
    pub fn decode(
        issue: &serde_json::Value,
        sender: &serde_json::Value,
    ) -> Result<Self, ValidationError> {
        let raw: RawIssue =
            serde_json::from_value(issue.clone()).map_err(|e| ValidationError::Malformed {
                field: "issue",
                reason: e.to_string(),
            })?;
        let sender: RawSender =
            serde_json::from_value(sender.clone()).map_err(|e| ValidationError::Malformed {
                field: "sender",
                reason: e.to_string(),
            })?;

        let issue_id = raw.id.ok_or(ValidationError::MissingField("issue.id"))?;
        let number = raw
            .number
            .ok_or(ValidationError::MissingField("issue.number"))?;
        let title = non_blank(raw.title).ok_or(ValidationError::MissingField("issue.title"))?;
        let author = non_blank(sender.login).ok_or(ValidationError::MissingField("sender.login"))?;
        let state = raw
            .state
            .ok_or(ValidationError::MissingField("issue.state"))?
            .parse::<IssueState>()?;

        Ok(Self {
            issue_id,
            number,
            title,
            html_url: raw.html_url.unwrap_or_default(),
            labels: raw
                .labels
                .unwrap_or_default()
                .into_iter()
                .map(|label| label.name)
                .collect(),
            author,
            state,
            body: raw.body.unwrap_or_default(),
            milestone: raw.milestone.map(|m| MilestoneRef {
                id: m.id,
                title: m.title.unwrap_or_default(),
            }),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
