//! WebHookQueue port - webhook レコードのキュー
//!
//! # 設計原則
//! - claim の権威はここにある。TODO→PROCESSING は find-and-update を一手で行う
//!   atomic な compare-and-set で、アプリ側のロックは一切使わない
//! - レコードは削除しない（retention は外部の責務）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{StoreError, WebHookId, WebHookRecord};

/// Record counts per sync state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub todo: usize,
    pub processing: usize,
    pub done: usize,
}

#[async_trait]
pub trait WebHookQueue: Send + Sync {
    async fn enqueue(&self, record: WebHookRecord) -> Result<(), StoreError>;

    /// Atomically take the oldest TODO record, mark it PROCESSING and stamp it.
    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<WebHookRecord>, StoreError>;

    async fn mark_done(&self, id: WebHookId, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Return PROCESSING records last stamped before `cutoff` to TODO, as long
    /// as they were claimed fewer than `max_claims` times.
    async fn release_stale(
        &self,
        cutoff: DateTime<Utc>,
        max_claims: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<WebHookId>, StoreError>;

    /// PROCESSING records last stamped before `cutoff` that exhausted their claims.
    async fn stuck_records(
        &self,
        cutoff: DateTime<Utc>,
        max_claims: u32,
    ) -> Result<Vec<WebHookId>, StoreError>;

    async fn get(&self, id: WebHookId) -> Result<Option<WebHookRecord>, StoreError>;

    async fn counts(&self) -> Result<QueueCounts, StoreError>;
}
