//! WebHookQueueConsumer - webhook キューの逐次ドレイン
//!
//! # フロー
//! claim_next → decode → manage → mark_done を TODO が尽きるまで繰り返す。
//!
//! # 失敗時
//! エラーはそのまま `sync()` から返り、処理中のレコードは PROCESSING のまま残る。
//! 回収は Reaper の責務。

use std::sync::Arc;

use tracing::{debug, info};

use super::reconcile::{StoryPass, TicketReconciler};
use crate::domain::{IssueFields, Milestone, MilestoneRef, SyncError, Ticket, WebHookRecord};
use crate::ports::{Clock, TicketStore, WebHookQueue};

pub struct WebHookQueueConsumer {
    queue: Arc<dyn WebHookQueue>,
    store: Arc<dyn TicketStore>,
    reconciler: Arc<TicketReconciler>,
    clock: Arc<dyn Clock>,
}

impl WebHookQueueConsumer {
    pub fn new(
        queue: Arc<dyn WebHookQueue>,
        store: Arc<dyn TicketStore>,
        reconciler: Arc<TicketReconciler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue,
            store,
            reconciler,
            clock,
        }
    }

    /// Drain every pending record. Returns how many were processed.
    pub async fn sync(&self) -> Result<usize, SyncError> {
        let mut processed = 0;
        while let Some(record) = self.queue.claim_next(self.clock.now()).await? {
            debug!(record = %record.id, claims = record.claims, "webhook claimed");
            self.consume(&record).await?;
            processed += 1;
        }
        if processed > 0 {
            info!(processed, "webhook queue drained");
        }
        Ok(processed)
    }

    /// Process one claimed record and mark it done.
    pub async fn consume(&self, record: &WebHookRecord) -> Result<(), SyncError> {
        let fields = IssueFields::decode(&record.issue, &record.sender)?;
        let ticket = self.manage(fields).await?;
        self.queue.mark_done(record.id, self.clock.now()).await?;
        debug!(record = %record.id, issue = %ticket.number, "webhook done");
        Ok(())
    }

    pub async fn manage(&self, fields: IssueFields) -> Result<Ticket, SyncError> {
        let reference = fields.milestone.clone();
        let mut ticket = self.reconciler.insert_or_update(fields).await?;
        let mut pass = StoryPass::new();
        self.reconciler.create_story(&mut ticket, &mut pass).await?;

        let milestone = match reference {
            Some(reference) => Some(self.resolve_milestone(reference).await?),
            None => None,
        };
        let epic_changed = self
            .reconciler
            .set_epic(&mut ticket, milestone.as_ref())
            .await?;
        if epic_changed {
            self.reconciler.sync_story(&ticket, &mut pass).await?;
        } else {
            self.reconciler.sync(&ticket, &mut pass).await?;
        }
        Ok(ticket)
    }

    async fn resolve_milestone(&self, reference: MilestoneRef) -> Result<Milestone, SyncError> {
        if let Some(existing) = self.store.find_milestone(reference.id).await? {
            return Ok(existing);
        }
        let created = self
            .store
            .insert_milestone(Milestone::new(reference, self.clock.now()))
            .await?;
        debug!(milestone = %created.id, title = %created.title, "milestone recorded");
        Ok(created)
    }
}
