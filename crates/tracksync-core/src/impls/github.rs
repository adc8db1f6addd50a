//! GitHub issues REST client, scoped to one repository.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Serialize;

use super::http::{self, endpoint};
use crate::config::{ConfigError, GitHubConfig};
use crate::domain::{IssueNumber, RemoteError, Service};
use crate::ports::{IssueDetails, IssueSourceClient};

const USER_AGENT: &str = concat!("tracksync/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";

#[derive(Serialize)]
struct IssuePatch<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct NewComment<'a> {
    body: &'a str,
}

#[derive(Clone)]
pub struct GitHubClient {
    config: GitHubConfig,
    client: Client,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            http::header_value("TRACKSYNC_GITHUB_TOKEN", &format!("Bearer {}", config.token))?,
        );
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT));
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );
        let client = http::build_client("issue source", headers, timeout)?;

        Ok(Self { config, client })
    }

    pub fn repository(&self) -> &str {
        &self.config.repository
    }

    fn issue_path(&self, number: IssueNumber) -> String {
        endpoint(
            &self.config.api_url,
            &format!("repos/{}/issues/{}", self.config.repository, number.get()),
        )
    }

    fn comments_path(&self, number: IssueNumber) -> String {
        format!("{}/comments", self.issue_path(number))
    }
}

#[async_trait]
impl IssueSourceClient for GitHubClient {
    async fn fetch_issue(&self, number: IssueNumber) -> Result<IssueDetails, RemoteError> {
        let request = self.client.get(self.issue_path(number));
        http::request_json(Service::IssueSource, request).await
    }

    async fn update_issue(
        &self,
        number: IssueNumber,
        title: &str,
        body: &str,
    ) -> Result<(), RemoteError> {
        let request = self
            .client
            .patch(self.issue_path(number))
            .json(&IssuePatch { title, body });
        http::request_status_only(Service::IssueSource, request).await
    }

    async fn add_comment(&self, number: IssueNumber, text: &str) -> Result<(), RemoteError> {
        let request = self
            .client
            .post(self.comments_path(number))
            .json(&NewComment { body: text });
        http::request_status_only(Service::IssueSource, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_repository_scoped() {
        let client = GitHubClient::new(
            GitHubConfig {
                api_url: "https://api.github.com".into(),
                token: "ghp_test".into(),
                repository: "acme/widgets".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(client.repository(), "acme/widgets");
        assert_eq!(
            client.issue_path(IssueNumber::new(12)),
            "https://api.github.com/repos/acme/widgets/issues/12"
        );
        assert_eq!(
            client.comments_path(IssueNumber::new(12)),
            "https://api.github.com/repos/acme/widgets/issues/12/comments"
        );
    }

    #[test]
    fn patch_body_carries_title_and_body() {
        let v = serde_json::to_value(IssuePatch {
            title: "Login fails",
            body: "steps",
        })
        .unwrap();
        assert_eq!(v, serde_json::json!({"title": "Login fails", "body": "steps"}));
    }
}
