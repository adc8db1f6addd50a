//! Pivotal Tracker v5 REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::debug;

use super::http::{self, endpoint};
use crate::config::{ConfigError, TrackerConfig};
use crate::domain::{Iteration, NewStory, RemoteError, Service, Story, StoryId, StoryUpdate};
use crate::ports::TrackerClient;

const TOKEN_HEADER: &str = "X-TrackerToken";
const BACKLOG_SCOPE: &str = "current_backlog";

/// Client bound to one tracker project.
#[derive(Clone)]
pub struct PivotalClient {
    config: TrackerConfig,
    client: Client,
}

impl PivotalClient {
    pub fn new(config: TrackerConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            TOKEN_HEADER,
            http::header_value("TRACKSYNC_TRACKER_TOKEN", &config.token)?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let client = http::build_client("tracker", headers, timeout)?;

        Ok(Self { config, client })
    }

    fn project_path(&self, path: &str) -> String {
        endpoint(
            &self.config.api_url,
            &format!("projects/{}/{}", self.config.project_id, path),
        )
    }

    fn story_path(&self, id: StoryId) -> String {
        self.project_path(&format!("stories/{}", id.get()))
    }
}

#[async_trait]
impl TrackerClient for PivotalClient {
    async fn create_story(&self, story: NewStory) -> Result<Story, RemoteError> {
        let request = self.client.post(self.project_path("stories")).json(&story);
        let created: Story = http::request_json(Service::Tracker, request).await?;
        debug!(story_id = %created.id, name = %created.name, "tracker story created");
        Ok(created)
    }

    async fn fetch_story(&self, id: StoryId) -> Result<Option<Story>, RemoteError> {
        let request = self.client.get(self.story_path(id));
        http::request_optional_json(Service::Tracker, request).await
    }

    async fn update_story(&self, id: StoryId, update: &StoryUpdate) -> Result<Story, RemoteError> {
        let request = self.client.put(self.story_path(id)).json(update);
        http::request_json(Service::Tracker, request).await
    }

    async fn current_iterations(&self) -> Result<Vec<Iteration>, RemoteError> {
        let request = self
            .client
            .get(self.project_path("iterations"))
            .query(&[("scope", BACKLOG_SCOPE)]);
        http::request_json(Service::Tracker, request).await
    }
}
