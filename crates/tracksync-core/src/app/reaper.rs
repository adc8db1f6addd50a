//! Reaper - lease 期限切れの PROCESSING レコードを回収する
//!
//! # フロー
//! 1. `sync_ts < now - lease_timeout` の PROCESSING レコードを探す
//! 2. claim 回数が `max_claims` 未満なら TODO に戻す
//! 3. 使い切ったものは PROCESSING のまま残し、warn で知らせる（手動対応）

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::domain::{StoreError, WebHookId};
use crate::ports::{Clock, WebHookQueue};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub released: Vec<WebHookId>,
    pub stuck: Vec<WebHookId>,
}

pub struct Reaper {
    queue: Arc<dyn WebHookQueue>,
    clock: Arc<dyn Clock>,
    lease_timeout: Duration,
    max_claims: u32,
}

impl Reaper {
    pub fn new(
        queue: Arc<dyn WebHookQueue>,
        clock: Arc<dyn Clock>,
        lease_timeout: Duration,
        max_claims: u32,
    ) -> Self {
        Self {
            queue,
            clock,
            lease_timeout,
            max_claims,
        }
    }

    pub async fn reap(&self) -> Result<ReapReport, StoreError> {
        self.reap_at(self.clock.now()).await
    }

    pub async fn reap_at(&self, now: DateTime<Utc>) -> Result<ReapReport, StoreError> {
        let cutoff = now - self.lease_timeout;
        let released = self
            .queue
            .release_stale(cutoff, self.max_claims, now)
            .await?;
        let stuck = self.queue.stuck_records(cutoff, self.max_claims).await?;

        if !released.is_empty() {
            info!(count = released.len(), "stale webhook claims released");
        }
        for id in &stuck {
            warn!(record = %id, max_claims = self.max_claims, "webhook exhausted its claims");
        }
        Ok(ReapReport { released, stuck })
    }
}
