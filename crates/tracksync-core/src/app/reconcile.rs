//! TicketReconciler - Ticket と tracker story の一方向 reconciliation
//!
//! # フロー
//! 1. `insert_or_update`: payload から Ticket を upsert（変更検出は代入の前）
//! 2. `create_story`: triggering label があり story が無ければ作成 → sync
//! 3. `set_epic`: milestone を epic フィールドへコピー
//! 4. `sync`: labels → state の順に StoryUpdate を組み立て、1 回の update で commit
//!
//! issue 側が常に勝ちます。tracker 側だけで付けた label は上書きで消えます。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    IssueFields, Milestone, RemoteError, Story, StoryId, StoryState, SyncError, Ticket,
};
use crate::ports::{Clock, TicketStore, TrackerClient};

const UNSCHEDULED: &str = "unscheduled";

/// Stories fetched during one pass. Dropped with the pass, never persisted.
#[derive(Debug, Default)]
pub struct StoryPass {
    stories: HashMap<StoryId, Option<Story>>,
}

impl StoryPass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a story the pass already holds (created or just updated).
    pub fn seed(&mut self, story: Story) {
        self.stories.insert(story.id, Some(story));
    }

    /// Fetch `id` at most once per pass. A story missing remotely is cached as `None`.
    pub async fn story(
        &mut self,
        tracker: &dyn TrackerClient,
        id: StoryId,
    ) -> Result<Option<&Story>, RemoteError> {
        if !self.stories.contains_key(&id) {
            let fetched = tracker.fetch_story(id).await?;
            self.stories.insert(id, fetched);
        }
        Ok(self.stories.get(&id).and_then(Option::as_ref))
    }
}

pub struct TicketReconciler {
    store: Arc<dyn TicketStore>,
    tracker: Arc<dyn TrackerClient>,
    clock: Arc<dyn Clock>,
    triggering_label: String,
}

impl TicketReconciler {
    pub fn new(
        store: Arc<dyn TicketStore>,
        tracker: Arc<dyn TrackerClient>,
        clock: Arc<dyn Clock>,
        triggering_label: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tracker,
            clock,
            triggering_label: triggering_label.into(),
        }
    }

    /// Upsert the ticket keyed by issue id and return it with its changed map.
    pub async fn insert_or_update(&self, fields: IssueFields) -> Result<Ticket, SyncError> {
        let now = self.clock.now();
        let ticket = match self.store.find_ticket(fields.issue_id).await? {
            Some(mut ticket) => {
                let changes = ticket.apply_update(fields, now);
                debug!(
                    issue = %ticket.number,
                    labels_changed = changes.labels,
                    state_changed = changes.state,
                    "ticket updated"
                );
                ticket
            }
            None => {
                let ticket = Ticket::new(fields, now);
                debug!(issue = %ticket.number, "ticket created");
                ticket
            }
        };
        self.store.save_ticket(&ticket).await?;
        Ok(ticket)
    }

    /// Create the story when the ticket is eligible, then sync it.
    ///
    /// Returns whether a story was created.
    pub async fn create_story(
        &self,
        ticket: &mut Ticket,
        pass: &mut StoryPass,
    ) -> Result<bool, SyncError> {
        if !ticket.should_create_story(&self.triggering_label) {
            debug!(
                issue = %ticket.number,
                has_story = ticket.story_id.is_some(),
                "story creation skipped"
            );
            return Ok(false);
        }

        let story = self.tracker.create_story(ticket.new_story()).await?;
        ticket.link_story(story.id, self.clock.now());
        self.store.save_ticket(ticket).await?;
        info!(issue = %ticket.number, story_id = %story.id, "story created");

        // a new story carries none of the ticket's labels or state yet
        pass.seed(story);
        self.sync_story(ticket, pass).await?;
        Ok(true)
    }

    /// Copy the milestone onto the ticket's epic fields, saving only on change.
    pub async fn set_epic(
        &self,
        ticket: &mut Ticket,
        milestone: Option<&Milestone>,
    ) -> Result<bool, SyncError> {
        if !ticket.set_epic(milestone, self.clock.now()) {
            return Ok(false);
        }
        self.store.save_ticket(ticket).await?;
        debug!(issue = %ticket.number, epic = ?ticket.epic_label, "epic set");
        Ok(true)
    }

    /// Push labels and state to the linked story in a single update.
    ///
    /// Returns whether an update was committed.
    pub async fn sync(&self, ticket: &Ticket, pass: &mut StoryPass) -> Result<bool, SyncError> {
        let Some(story_id) = ticket.story_id else {
            debug!(issue = %ticket.number, "sync skipped: no story");
            return Ok(false);
        };
        if !ticket.need_sync() {
            debug!(issue = %ticket.number, "sync skipped: nothing changed");
            return Ok(false);
        }
        self.sync_story(ticket, pass).await
    }

    /// Push labels and state to the linked story whether or not the ticket changed.
    pub async fn sync_story(
        &self,
        ticket: &Ticket,
        pass: &mut StoryPass,
    ) -> Result<bool, SyncError> {
        let Some(story_id) = ticket.story_id else {
            debug!(issue = %ticket.number, "sync skipped: no story");
            return Ok(false);
        };
        let Some(story) = pass.story(self.tracker.as_ref(), story_id).await? else {
            warn!(issue = %ticket.number, %story_id, "linked story not found on tracker");
            return Ok(false);
        };

        let update = ticket.reconcile(story);
        let updated = self.tracker.update_story(story_id, &update).await?;
        debug!(
            issue = %ticket.number,
            %story_id,
            state = %updated.current_state,
            "story synced"
        );
        pass.seed(updated);
        Ok(true)
    }

    /// Tracker state of the linked story, or `unscheduled` when there is none.
    pub async fn status(
        &self,
        ticket: &Ticket,
        pass: &mut StoryPass,
    ) -> Result<&'static str, SyncError> {
        let Some(story_id) = ticket.story_id else {
            return Ok(UNSCHEDULED);
        };
        Ok(pass
            .story(self.tracker.as_ref(), story_id)
            .await?
            .map(|story| story.current_state.as_str())
            .unwrap_or(UNSCHEDULED))
    }

    pub async fn scheduled(&self, ticket: &Ticket, pass: &mut StoryPass) -> Result<bool, SyncError> {
        Ok(self.status(ticket, pass).await? != StoryState::Unscheduled.as_str())
    }

    /// URL of the linked story, if it exists remotely.
    pub async fn story_url(
        &self,
        ticket: &Ticket,
        pass: &mut StoryPass,
    ) -> Result<Option<String>, SyncError> {
        let Some(story_id) = ticket.story_id else {
            return Ok(None);
        };
        Ok(pass
            .story(self.tracker.as_ref(), story_id)
            .await?
            .map(|story| story.url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IssueState, Label, MilestoneId, MilestoneRef, StoryType};
    use crate::impls::InMemoryStore;
    use crate::ports::FixedClock;
    use crate::testing::{FakeTracker, IssuePayload, sender, story, t0};
    use rstest::rstest;

    struct Fixture {
        store: Arc<InMemoryStore>,
        tracker: Arc<FakeTracker>,
        reconciler: TicketReconciler,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let tracker = Arc::new(FakeTracker::new());
        let reconciler = TicketReconciler::new(
            store.clone(),
            tracker.clone(),
            Arc::new(FixedClock::new(t0())),
            "PT",
        );
        Fixture {
            store,
            tracker,
            reconciler,
        }
    }

    fn fields(payload: IssuePayload) -> IssueFields {
        IssueFields::decode(&payload.build(), &sender("octocat")).unwrap()
    }

    fn milestone(id: u64, title: &str) -> Milestone {
        Milestone::new(
            MilestoneRef {
                id: MilestoneId::new(id),
                title: title.into(),
            },
            t0(),
        )
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let f = fixture();
        let payload = IssuePayload::new(1, 12).labels(&["bug"]);

        let first = f.reconciler.insert_or_update(fields(payload)).await.unwrap();
        assert!(first.need_sync());

        let payload = IssuePayload::new(1, 12).labels(&["bug"]);
        let second = f.reconciler.insert_or_update(fields(payload)).await.unwrap();
        assert!(!second.need_sync());

        let stored = f.store.find_ticket(first.issue_id).await.unwrap().unwrap();
        assert_eq!(stored.labels, vec!["bug".to_string()]);
        assert_eq!(stored.number, first.number);
    }

    #[tokio::test]
    async fn label_reorder_is_not_a_change() {
        let f = fixture();
        f.reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(&["a", "b"])))
            .await
            .unwrap();

        let ticket = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(&["b", "a"])))
            .await
            .unwrap();

        assert!(!ticket.need_sync());
    }

    #[rstest]
    #[case::no_label(&[], false)]
    #[case::other_labels(&["bug", "pt"], false)]
    #[case::trigger(&["bug", "PT"], true)]
    #[tokio::test]
    async fn story_is_created_only_with_triggering_label(
        #[case] labels: &[&str],
        #[case] created: bool,
    ) {
        let f = fixture();
        let mut ticket = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(labels)))
            .await
            .unwrap();

        let result = f
            .reconciler
            .create_story(&mut ticket, &mut StoryPass::new())
            .await
            .unwrap();

        assert_eq!(result, created);
        assert_eq!(f.tracker.created().len(), usize::from(created));
        assert_eq!(ticket.story_id.is_some(), created);
    }

    #[tokio::test]
    async fn created_story_is_named_after_issue_and_synced() {
        let f = fixture();
        let mut ticket = f
            .reconciler
            .insert_or_update(fields(
                IssuePayload::new(1, 12).title("Login fails").labels(&["PT"]),
            ))
            .await
            .unwrap();

        f.reconciler
            .create_story(&mut ticket, &mut StoryPass::new())
            .await
            .unwrap();

        let created = &f.tracker.created()[0];
        assert_eq!(created.name, "#12: Login fails");
        assert_eq!(
            created.description,
            "https://github.com/acme/widgets/issues/12"
        );
        assert_eq!(created.story_type, StoryType::Chore);

        let story_id = ticket.story_id.unwrap();
        let stored = f.store.find_ticket(ticket.issue_id).await.unwrap().unwrap();
        assert_eq!(stored.story_id, Some(story_id));

        // seeded story was used; no fetch needed for the sync
        assert_eq!(f.tracker.fetch_count(), 0);
        let remote = f.tracker.story(story_id).unwrap();
        assert_eq!(remote.label_names(), vec!["PT"]);
        assert_eq!(remote.current_state, StoryState::Unscheduled);
    }

    #[tokio::test]
    async fn second_create_is_a_noop() {
        let f = fixture();
        let mut ticket = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(&["PT"])))
            .await
            .unwrap();
        let mut pass = StoryPass::new();
        f.reconciler.create_story(&mut ticket, &mut pass).await.unwrap();

        let again = f.reconciler.create_story(&mut ticket, &mut pass).await.unwrap();

        assert!(!again);
        assert_eq!(f.tracker.created().len(), 1);
    }

    #[tokio::test]
    async fn labels_are_overwritten_with_epic_label() {
        let f = fixture();
        let mut ticket = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(&["PT", "bug"])))
            .await
            .unwrap();
        ticket.link_story(StoryId::new(555), t0());
        f.store.save_ticket(&ticket).await.unwrap();
        let mut remote = story(555, StoryState::Started);
        remote.labels = vec![Label::named("tracker-only")];
        f.tracker.insert(remote);

        f.reconciler
            .set_epic(&mut ticket, Some(&milestone(77, "v2.0")))
            .await
            .unwrap();
        let synced = f.reconciler.sync(&ticket, &mut StoryPass::new()).await.unwrap();

        assert!(synced);
        assert_eq!(
            f.tracker.story(StoryId::new(555)).unwrap().label_names(),
            vec!["PT", "bug", "v2.0"]
        );
    }

    #[tokio::test]
    async fn closing_issue_accepts_story_and_estimates_it() {
        let f = fixture();
        let mut ticket = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(&["PT"])))
            .await
            .unwrap();
        ticket.link_story(StoryId::new(555), t0());
        f.store.save_ticket(&ticket).await.unwrap();
        f.tracker.insert(story(555, StoryState::Started));

        let closed = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(&["PT"]).closed()))
            .await
            .unwrap();
        assert_eq!(closed.state, IssueState::Closed);
        f.reconciler.sync(&closed, &mut StoryPass::new()).await.unwrap();

        let remote = f.tracker.story(StoryId::new(555)).unwrap();
        assert_eq!(remote.current_state, StoryState::Accepted);
        assert_eq!(remote.estimate, Some(0));
        assert_eq!(f.tracker.updates().len(), 1);
    }

    #[tokio::test]
    async fn unchanged_ticket_is_not_synced() {
        let f = fixture();
        let mut ticket = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(&["PT"])))
            .await
            .unwrap();
        ticket.link_story(StoryId::new(555), t0());
        f.store.save_ticket(&ticket).await.unwrap();
        f.tracker.insert(story(555, StoryState::Started));

        let again = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(&["PT"])))
            .await
            .unwrap();

        assert!(!f.reconciler.sync(&again, &mut StoryPass::new()).await.unwrap());
        assert!(f.tracker.updates().is_empty());
        assert_eq!(f.tracker.fetch_count(), 0);
    }

    #[tokio::test]
    async fn story_created_on_unchanged_upsert_is_still_synced() {
        let f = fixture();
        let payload = || IssuePayload::new(1, 12).labels(&["PT", "bug"]).closed();
        f.reconciler.insert_or_update(fields(payload())).await.unwrap();
        let mut ticket = f.reconciler.insert_or_update(fields(payload())).await.unwrap();
        assert!(!ticket.need_sync());

        f.reconciler
            .create_story(&mut ticket, &mut StoryPass::new())
            .await
            .unwrap();

        let remote = f.tracker.story(ticket.story_id.unwrap()).unwrap();
        assert_eq!(remote.label_names(), vec!["PT", "bug"]);
        assert_eq!(remote.current_state, StoryState::Accepted);
        assert_eq!(f.tracker.updates().len(), 1);
    }

    #[tokio::test]
    async fn missing_story_is_skipped() {
        let f = fixture();
        let mut ticket = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(&["PT"])))
            .await
            .unwrap();
        ticket.link_story(StoryId::new(404), t0());

        let synced = f.reconciler.sync(&ticket, &mut StoryPass::new()).await.unwrap();

        assert!(!synced);
        assert!(f.tracker.updates().is_empty());
    }

    #[tokio::test]
    async fn tracker_failure_propagates() {
        let f = fixture();
        let mut ticket = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12).labels(&["PT"])))
            .await
            .unwrap();
        ticket.link_story(StoryId::new(555), t0());
        f.tracker.insert(story(555, StoryState::Started));
        f.tracker.fail_updates(true);

        let err = f
            .reconciler
            .sync(&ticket, &mut StoryPass::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::domain::ErrorKind::Remote);
    }

    #[tokio::test]
    async fn set_epic_without_milestone_keeps_fields() {
        let f = fixture();
        let mut ticket = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12)))
            .await
            .unwrap();
        f.reconciler
            .set_epic(&mut ticket, Some(&milestone(77, "v2.0")))
            .await
            .unwrap();

        assert!(!f.reconciler.set_epic(&mut ticket, None).await.unwrap());
        assert!(
            !f.reconciler
                .set_epic(&mut ticket, Some(&milestone(77, "v2.0")))
                .await
                .unwrap()
        );
        let stored = f.store.find_ticket(ticket.issue_id).await.unwrap().unwrap();
        assert_eq!(stored.epic_label.as_deref(), Some("v2.0"));
    }

    #[tokio::test]
    async fn status_reports_unscheduled_without_story() {
        let f = fixture();
        let mut ticket = f
            .reconciler
            .insert_or_update(fields(IssuePayload::new(1, 12)))
            .await
            .unwrap();
        let mut pass = StoryPass::new();

        assert_eq!(f.reconciler.status(&ticket, &mut pass).await.unwrap(), "unscheduled");
        assert!(!f.reconciler.scheduled(&ticket, &mut pass).await.unwrap());

        ticket.link_story(StoryId::new(555), t0());
        f.tracker.insert(story(555, StoryState::Started));
        let mut pass = StoryPass::new();
        assert_eq!(f.reconciler.status(&ticket, &mut pass).await.unwrap(), "started");
        assert!(f.reconciler.scheduled(&ticket, &mut pass).await.unwrap());
        assert_eq!(f.tracker.fetch_count(), 1);

        f.tracker.remove(StoryId::new(555));
        let mut pass = StoryPass::new();
        assert_eq!(f.reconciler.status(&ticket, &mut pass).await.unwrap(), "unscheduled");
    }
}
