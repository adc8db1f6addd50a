//! IssueSourceClient port - issue source（GitHub issues）への薄い型付きファサード
//!
//! client は構築時に一つのリポジトリにスコープされます。

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{IssueNumber, RemoteError};

/// Freshest issue text as currently stored by the issue source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueDetails {
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[async_trait]
pub trait IssueSourceClient: Send + Sync {
    async fn fetch_issue(&self, number: IssueNumber) -> Result<IssueDetails, RemoteError>;

    async fn update_issue(
        &self,
        number: IssueNumber,
        title: &str,
        body: &str,
    ) -> Result<(), RemoteError>;

    async fn add_comment(&self, number: IssueNumber, text: &str) -> Result<(), RemoteError>;
}
