//! In-memory store implementing both `TicketStore` and `WebHookQueue`.
//!
//! # 学習ポイント
//! - 状態はすべて一つの `tokio::sync::Mutex` の内側にある
//! - claim は「探す + 書き換える」をロックを握ったまま行うので atomic
//! - ロックは各メソッドの中で完結し、await を跨がない

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    IssueId, IssueNumber, Milestone, MilestoneId, StoreError, StoryId, SyncState, Ticket,
    WebHookId, WebHookRecord,
};
use crate::ports::{QueueCounts, TicketStore, WebHookQueue};

struct MemoryState {
    /// Keyed by ULID, so iteration order is arrival order.
    webhooks: BTreeMap<WebHookId, WebHookRecord>,

    tickets: HashMap<IssueId, Ticket>,

    /// Secondary unique indexes over `tickets`.
    by_number: HashMap<IssueNumber, IssueId>,
    by_story: HashMap<StoryId, IssueId>,

    milestones: HashMap<MilestoneId, Milestone>,
}

impl MemoryState {
    fn new() -> Self {
        Self {
            webhooks: BTreeMap::new(),
            tickets: HashMap::new(),
            by_number: HashMap::new(),
            by_story: HashMap::new(),
            milestones: HashMap::new(),
        }
    }

    fn check_constraints(&self, ticket: &Ticket) -> Result<(), StoreError> {
        if let Some(&owner) = self.by_number.get(&ticket.number)
            && owner != ticket.issue_id
        {
            return Err(StoreError::DuplicateIssueNumber {
                number: ticket.number,
                owner,
            });
        }

        if let Some(current) = self
            .tickets
            .get(&ticket.issue_id)
            .and_then(|stored| stored.story_id)
            && ticket.story_id != Some(current)
        {
            return Err(StoreError::StoryIdImmutable {
                issue_id: ticket.issue_id,
                current,
            });
        }

        if let Some(story_id) = ticket.story_id
            && let Some(&owner) = self.by_story.get(&story_id)
            && owner != ticket.issue_id
        {
            return Err(StoreError::DuplicateStoryId { story_id, owner });
        }

        Ok(())
    }

    fn put_ticket(&mut self, ticket: Ticket) {
        if let Some(previous) = self.tickets.get(&ticket.issue_id)
            && previous.number != ticket.number
        {
            self.by_number.remove(&previous.number);
        }
        self.by_number.insert(ticket.number, ticket.issue_id);
        if let Some(story_id) = ticket.story_id {
            self.by_story.insert(story_id, ticket.issue_id);
        }
        self.tickets.insert(ticket.issue_id, ticket);
    }

    fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.webhooks.values() {
            match record.sync_state {
                SyncState::Todo => counts.todo += 1,
                SyncState::Processing => counts.processing += 1,
                SyncState::Done => counts.done += 1,
            }
        }
        counts
    }
}

/// Process-local store. Cloning shares the same state.
#[derive(Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn find_ticket(&self, issue_id: IssueId) -> Result<Option<Ticket>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.tickets.get(&issue_id).cloned())
    }

    async fn find_ticket_by_story(
        &self,
        story_id: StoryId,
    ) -> Result<Option<Ticket>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .by_story
            .get(&story_id)
            .and_then(|issue_id| state.tickets.get(issue_id))
            .cloned())
    }

    async fn save_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check_constraints(ticket)?;
        state.put_ticket(ticket.clone());
        Ok(())
    }

    async fn tickets_needing_comment(&self) -> Result<Vec<Ticket>, StoreError> {
        let state = self.state.lock().await;
        let mut tickets: Vec<Ticket> = state
            .tickets
            .values()
            .filter(|t| t.needs_comment)
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.number);
        Ok(tickets)
    }

    async fn find_milestone(&self, id: MilestoneId) -> Result<Option<Milestone>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.milestones.get(&id).cloned())
    }

    async fn insert_milestone(&self, milestone: Milestone) -> Result<Milestone, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state
            .milestones
            .entry(milestone.id)
            .or_insert(milestone)
            .clone())
    }
}

#[async_trait]
impl WebHookQueue for InMemoryStore {
    async fn enqueue(&self, record: WebHookRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.webhooks.insert(record.id, record);
        Ok(())
    }

    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<WebHookRecord>, StoreError> {
        let mut state = self.state.lock().await;
        let claimed = state
            .webhooks
            .values_mut()
            .find(|record| record.sync_state.is_claimable())
            .map(|record| {
                record.start_processing(now);
                record.clone()
            });
        Ok(claimed)
    }

    async fn mark_done(&self, id: WebHookId, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let record = state
            .webhooks
            .get_mut(&id)
            .ok_or(StoreError::UnknownRecord(id))?;
        record.mark_done(now);
        Ok(())
    }

    async fn release_stale(
        &self,
        cutoff: DateTime<Utc>,
        max_claims: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<WebHookId>, StoreError> {
        let mut state = self.state.lock().await;
        let mut released = Vec::new();
        for record in state.webhooks.values_mut() {
            if record.is_stale(cutoff) && record.claims < max_claims {
                record.release(now);
                released.push(record.id);
            }
        }
        Ok(released)
    }

    async fn stuck_records(
        &self,
        cutoff: DateTime<Utc>,
        max_claims: u32,
    ) -> Result<Vec<WebHookId>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .webhooks
            .values()
            .filter(|record| record.is_stale(cutoff) && record.claims >= max_claims)
            .map(|record| record.id)
            .collect())
    }

    async fn get(&self, id: WebHookId) -> Result<Option<WebHookRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.webhooks.get(&id).cloned())
    }

    async fn counts(&self) -> Result<QueueCounts, StoreError> {
        let state = self.state.lock().await;
        Ok(state.counts())
    }
}
