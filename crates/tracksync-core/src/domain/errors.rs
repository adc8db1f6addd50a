//! Errors - エラー型と分類
//!
//! # 分類
//! - **Validation**: payload の必須フィールド欠落など。書き込みは一切行わない
//! - **Store**: 一意制約違反、存在しないレコード、バックエンド障害
//! - **Remote**: Tracker / Issue source の API エラー（network, auth, 4xx, 5xx）
//!
//! 「triggering label が無い」「story がまだ無い」などの論理的な no-op は
//! エラーではありません（guard で早期 return する）。

use std::fmt;

use thiserror::Error;

use super::ids::{IssueId, IssueNumber, StoryId, WebHookId};

/// ErrorKind は運用上の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Store,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is malformed: {reason}")]
    Malformed { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("issue number {number} already belongs to {owner}")]
    DuplicateIssueNumber { number: IssueNumber, owner: IssueId },

    #[error("{story_id} is already linked to {owner}")]
    DuplicateStoryId { story_id: StoryId, owner: IssueId },

    #[error("{issue_id} is linked to {current}; story id cannot change")]
    StoryIdImmutable { issue_id: IssueId, current: StoryId },

    #[error("webhook record {0} not found")]
    UnknownRecord(WebHookId),
}

/// Which remote API failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Tracker,
    IssueSource,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Tracker => f.write_str("tracker"),
            Service::IssueSource => f.write_str("issue source"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service} request failed{}: {message}", .status.map(|s| format!(" with status {s}")).unwrap_or_default())]
pub struct RemoteError {
    pub service: Service,
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(service: Service, message: impl Into<String>) -> Self {
        Self {
            service,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(service: Service, status: u16, message: impl Into<String>) -> Self {
        Self {
            service,
            status: Some(status),
            message: message.into(),
        }
    }
}

/// Top-level error of a sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid issue payload: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Validation(_) => ErrorKind::Validation,
            SyncError::Store(_) => ErrorKind::Store,
            SyncError::Remote(_) => ErrorKind::Remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_message_includes_status_when_known() {
        let err = RemoteError::with_status(Service::Tracker, 404, "story gone");
        assert_eq!(err.to_string(), "tracker request failed with status 404: story gone");

        let err = RemoteError::new(Service::IssueSource, "connection reset");
        assert_eq!(err.to_string(), "issue source request failed: connection reset");
    }

    #[test]
    fn sync_error_classifies_its_source() {
        let err: SyncError = ValidationError::MissingField("issue.title").into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: SyncError = StoreError::DuplicateIssueNumber {
            number: IssueNumber::new(12),
            owner: IssueId::new(1),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Store);
    }
}
