//! Domain identifiers (strongly-typed IDs).
//!
//! # 二種類の ID
//! - **ローカル ID**（`Id<T>`）: このシステムが発行する ULID。WebHookRecord のキー。
//!   先頭が timestamp なので、ID 順 = 受信順になる（claim は最古から取る）。
//! - **リモート ID**（`RemoteId<T>`）: GitHub / Pivotal Tracker が発行する数値 ID。
//!
//! どちらも Phantom type パターンで、IssueId と StoryId のような
//! 同じ `u64` 表現の ID をコンパイル時に区別します。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"webhook-", "issue-", "story-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ULID ベースのローカル ID
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// リモートサービスが発行した数値 ID
///
/// JSON 上は素の数値として (de)serialize されるので、
/// webhook payload や API レスポンスにそのまま使えます。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId<T: IdMarker> {
    value: u64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> RemoteId<T> {
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> u64 {
        self.value
    }
}

impl<T: IdMarker> From<u64> for RemoteId<T> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for RemoteId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WebHook {}

impl IdMarker for WebHook {
    fn prefix() -> &'static str {
        "webhook-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Issue {}

impl IdMarker for Issue {
    fn prefix() -> &'static str {
        "issue-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueNum {}

impl IdMarker for IssueNum {
    fn prefix() -> &'static str {
        "#"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Story {}

impl IdMarker for Story {
    fn prefix() -> &'static str {
        "story-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Milestone {}

impl IdMarker for Milestone {
    fn prefix() -> &'static str {
        "milestone-"
    }
}

// ========================================
// Type Alias
// ========================================

/// Identifier of a queued webhook delivery.
pub type WebHookId = Id<WebHook>;

/// GitHub's global issue id (`issue.id`).
pub type IssueId = RemoteId<Issue>;

/// Repository-scoped issue number (`issue.number`).
pub type IssueNumber = RemoteId<IssueNum>;

/// Pivotal Tracker story id.
pub type StoryId = RemoteId<Story>;

/// GitHub milestone id; doubles as the epic key on the tracker side.
pub type MilestoneId = RemoteId<Milestone>;
