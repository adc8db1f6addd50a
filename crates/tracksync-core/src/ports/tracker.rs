//! TrackerClient port - project tracker（Pivotal Tracker）への薄い型付きファサード
//!
//! 使う操作だけを定義します。プロジェクトは client の構築時に固定されます。

use async_trait::async_trait;

use crate::domain::{Iteration, NewStory, RemoteError, Story, StoryId, StoryUpdate};

#[async_trait]
pub trait TrackerClient: Send + Sync {
    async fn create_story(&self, story: NewStory) -> Result<Story, RemoteError>;

    /// `Ok(None)` when the story was deleted or never existed.
    async fn fetch_story(&self, id: StoryId) -> Result<Option<Story>, RemoteError>;

    /// Commit pending mutations in one call and return the updated story.
    async fn update_story(&self, id: StoryId, update: &StoryUpdate) -> Result<Story, RemoteError>;

    /// Iterations of the current backlog scope, each with its stories.
    async fn current_iterations(&self) -> Result<Vec<Iteration>, RemoteError>;
}
