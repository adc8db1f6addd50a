//! TicketStore port - Ticket と Milestone の正本（source of truth）
//!
//! # 設計原則
//! - reconciliation ロジックはストレージ技術を知らない
//! - `save_ticket` は issue id をキーにした upsert
//! - 一意制約（issue number, story id）と story id の不変性はストアが守る
//! - Ticket フィールドに対する compare-and-swap は無い（last write wins）

use async_trait::async_trait;

use crate::domain::{IssueId, Milestone, MilestoneId, StoreError, StoryId, Ticket};

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn find_ticket(&self, issue_id: IssueId) -> Result<Option<Ticket>, StoreError>;

    async fn find_ticket_by_story(&self, story_id: StoryId)
    -> Result<Option<Ticket>, StoreError>;

    /// Insert or replace the ticket keyed by its issue id.
    ///
    /// Rejects a duplicate issue number or story id owned by another ticket,
    /// and any attempt to change an already linked story id. Nothing is
    /// written on rejection.
    async fn save_ticket(&self, ticket: &Ticket) -> Result<(), StoreError>;

    async fn tickets_needing_comment(&self) -> Result<Vec<Ticket>, StoreError>;

    async fn find_milestone(&self, id: MilestoneId) -> Result<Option<Milestone>, StoreError>;

    /// Insert unless present. Returns the stored milestone either way.
    async fn insert_milestone(&self, milestone: Milestone) -> Result<Milestone, StoreError>;
}
