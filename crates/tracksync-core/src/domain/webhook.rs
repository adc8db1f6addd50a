//! Webhook record: raw delivery + claim state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::WebHookId;

/// Claim state of a queued delivery.
///
/// State transitions:
/// - Todo -> Processing -> Done
/// - Processing -> Todo (only through the reaper, when the lease went stale)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    /// Waiting to be claimed.
    Todo,

    /// Claimed by exactly one consumer.
    Processing,

    /// Fully consumed.
    Done,
}

impl SyncState {
    pub fn is_claimable(self) -> bool {
        matches!(self, SyncState::Todo)
    }
}

/// One webhook delivery waiting in (or drained from) the queue.
///
/// Design:
/// - The store is the single source of truth; consumers get clones.
/// - All state transitions go through the methods below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebHookRecord {
    pub id: WebHookId,

    /// `issue` object of the delivery, kept verbatim.
    pub issue: serde_json::Value,

    /// `sender` object of the delivery, kept verbatim.
    pub sender: serde_json::Value,

    pub sync_state: SyncState,

    /// Timestamp of the last state transition.
    pub sync_ts: DateTime<Utc>,

    /// Number of times this record has been claimed.
    #[serde(default)]
    pub claims: u32,

    pub created_at: DateTime<Utc>,
}

impl WebHookRecord {
    pub fn new(
        id: WebHookId,
        issue: serde_json::Value,
        sender: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            issue,
            sender,
            sync_state: SyncState::Todo,
            sync_ts: now,
            claims: 0,
            created_at: now,
        }
    }

    /// Todo -> Processing. The caller must hold the store's lock.
    pub fn start_processing(&mut self, now: DateTime<Utc>) {
        self.sync_state = SyncState::Processing;
        self.claims += 1;
        self.sync_ts = now;
    }

    pub fn mark_done(&mut self, now: DateTime<Utc>) {
        self.sync_state = SyncState::Done;
        self.sync_ts = now;
    }

    /// Processing -> Todo, used when a consumer died mid-record.
    pub fn release(&mut self, now: DateTime<Utc>) {
        self.sync_state = SyncState::Todo;
        self.sync_ts = now;
    }

    /// Has this record been held in Processing since before `cutoff`?
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.sync_state == SyncState::Processing && self.sync_ts < cutoff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use ulid::Ulid;

    fn record(now: DateTime<Utc>) -> WebHookRecord {
        WebHookRecord::new(
            WebHookId::from_ulid(Ulid::new()),
            serde_json::json!({"id": 1}),
            serde_json::json!({"login": "octocat"}),
            now,
        )
    }

    #[test]
    fn new_record_is_claimable() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let record = record(now);

        assert!(record.sync_state.is_claimable());
        assert_eq!(record.claims, 0);
        assert_eq!(record.sync_ts, now);
    }

    #[test]
    fn processing_stamps_time_and_counts_claims() {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut record = record(t0);

        let t1 = t0 + Duration::seconds(5);
        record.start_processing(t1);
        assert_eq!(record.sync_state, SyncState::Processing);
        assert_eq!(record.sync_ts, t1);
        assert_eq!(record.claims, 1);

        assert!(record.is_stale(t1 + Duration::seconds(1)));
        assert!(!record.is_stale(t1));

        record.mark_done(t1 + Duration::seconds(1));
        assert!(!record.is_stale(t1 + Duration::hours(1)));
    }

    #[test]
    fn sync_state_serializes_in_upper_case() {
        let s = serde_json::to_string(&SyncState::Processing).unwrap();
        assert_eq!(s, "\"PROCESSING\"");
    }
}
