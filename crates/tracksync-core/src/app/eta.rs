//! EtaScheduler - iteration の終了日から ETA を計算する
//!
//! ETA = iteration finish の日付 - lead days。
//! ETA が変わったチケットだけ `needs_comment` を立てる。コメント投稿は CommentDispatcher。

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{SyncError, eta_for};
use crate::ports::{Clock, TicketStore, TrackerClient};

pub struct EtaScheduler {
    store: Arc<dyn TicketStore>,
    tracker: Arc<dyn TrackerClient>,
    clock: Arc<dyn Clock>,
    lead_days: i64,
}

impl EtaScheduler {
    pub fn new(
        store: Arc<dyn TicketStore>,
        tracker: Arc<dyn TrackerClient>,
        clock: Arc<dyn Clock>,
        lead_days: i64,
    ) -> Self {
        Self {
            store,
            tracker,
            clock,
            lead_days,
        }
    }

    /// Returns the number of tickets whose ETA changed.
    pub async fn compute_eta(&self) -> Result<usize, SyncError> {
        let iterations = self.tracker.current_iterations().await?;
        let mut updated = 0;

        for iteration in &iterations {
            let eta = eta_for(iteration.finish, self.lead_days);
            for story in &iteration.stories {
                let Some(mut ticket) = self.store.find_ticket_by_story(story.id).await? else {
                    continue;
                };
                let previous = ticket.eta;
                if !ticket.record_eta(eta, self.clock.now()) {
                    continue;
                }
                self.store.save_ticket(&ticket).await?;
                debug!(
                    issue = %ticket.number,
                    story_id = %story.id,
                    iteration = iteration.number,
                    ?previous,
                    %eta,
                    "eta changed"
                );
                updated += 1;
            }
        }

        info!(
            iterations = iterations.len(),
            updated, "eta computation finished"
        );
        Ok(updated)
    }
}
