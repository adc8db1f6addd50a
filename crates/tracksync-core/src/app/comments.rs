//! CommentDispatcher - `needs_comment` の立ったチケットへ ETA コメントを投稿する
//!
//! # 失敗時
//! - 投稿に失敗したチケットはフラグが残り、次回のパスで再試行される
//! - 1 件の失敗でドレインは止まらない（warn して数えるだけ）
//! - フラグはコメント投稿に成功した後にだけ下ろす

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::reconcile::{StoryPass, TicketReconciler};
use crate::domain::{IssueNumber, SyncError, Ticket};
use crate::ports::{
    Clock, EtaNotice, IssueDetails, IssueSourceClient, SyncSummary, TextRenderer, TicketStore,
};

/// Outcome of one comment drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentReport {
    pub posted: usize,
    pub failed: Vec<IssueNumber>,
}

pub struct CommentDispatcher {
    store: Arc<dyn TicketStore>,
    issues: Arc<dyn IssueSourceClient>,
    renderer: Arc<dyn TextRenderer>,
    reconciler: Arc<TicketReconciler>,
    clock: Arc<dyn Clock>,
}

impl CommentDispatcher {
    pub fn new(
        store: Arc<dyn TicketStore>,
        issues: Arc<dyn IssueSourceClient>,
        renderer: Arc<dyn TextRenderer>,
        reconciler: Arc<TicketReconciler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            issues,
            renderer,
            reconciler,
            clock,
        }
    }

    pub async fn manage_comments(&self) -> Result<CommentReport, SyncError> {
        let tickets = self.store.tickets_needing_comment().await?;
        let mut pass = StoryPass::new();
        let mut report = CommentReport::default();

        for ticket in tickets {
            let number = ticket.number;
            match self.manage_comment(ticket, &mut pass).await {
                Ok(true) => report.posted += 1,
                Ok(false) => {}
                Err(error) => {
                    warn!(issue = %number, kind = ?error.kind(), %error, "eta comment failed");
                    report.failed.push(number);
                }
            }
        }

        info!(
            posted = report.posted,
            failed = report.failed.len(),
            "comment drain finished"
        );
        Ok(report)
    }

    /// Post the comment if the ticket still asks for one. Returns whether it was posted.
    pub async fn manage_comment(
        &self,
        mut ticket: Ticket,
        pass: &mut StoryPass,
    ) -> Result<bool, SyncError> {
        if !ticket.needs_comment {
            debug!(issue = %ticket.number, "no comment pending");
            return Ok(false);
        }
        self.create_comment(&mut ticket, pass).await?;
        Ok(true)
    }

    pub async fn create_comment(
        &self,
        ticket: &mut Ticket,
        pass: &mut StoryPass,
    ) -> Result<(), SyncError> {
        let fresh = self.issues.fetch_issue(ticket.number).await?;
        let notice = EtaNotice {
            eta: ticket.eta,
            previous_eta: ticket.previous_eta,
            display_previous: ticket.display_previous_eta(),
            story_url: self.reconciler.story_url(ticket, pass).await?,
        };
        let text = self.renderer.eta_comment(&notice);

        self.issues.add_comment(ticket.number, &text).await?;
        ticket.clear_needs_comment(self.clock.now());
        self.store.save_ticket(ticket).await?;
        debug!(issue = %ticket.number, eta = ?ticket.eta, "eta comment posted");

        // the comment is out; a failed refresh must not raise the flag again
        if let Err(error) = self.refresh_description(ticket, &fresh, pass).await {
            warn!(issue = %ticket.number, %error, "issue description refresh failed");
        }
        Ok(())
    }

    /// Rewrite the sync block of the issue body. Returns whether the issue was updated.
    pub async fn refresh_description(
        &self,
        ticket: &mut Ticket,
        fresh: &IssueDetails,
        pass: &mut StoryPass,
    ) -> Result<bool, SyncError> {
        let status = self.reconciler.status(ticket, pass).await?;
        let summary = SyncSummary {
            status: status.to_owned(),
            scheduled: self.reconciler.scheduled(ticket, pass).await?,
            story_url: self.reconciler.story_url(ticket, pass).await?,
            eta: ticket.eta,
        };
        let body = self.renderer.issue_description(&fresh.body, &summary);
        if body == fresh.body {
            debug!(issue = %ticket.number, "description already current");
            return Ok(false);
        }

        self.issues
            .update_issue(ticket.number, &fresh.title, &body)
            .await?;
        ticket.replace_body(body, self.clock.now());
        self.store.save_ticket(ticket).await?;
        Ok(true)
    }
}
