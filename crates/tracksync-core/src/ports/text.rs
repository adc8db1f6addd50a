//! TextRenderer port - 人が読むテキストの生成
//!
//! コメントや issue 本文の書式は同期エンジンの関心外なので、ここで差し替え可能にしておく。
//! デフォルト実装は `impls::markdown::MarkdownRenderer`。

use chrono::NaiveDate;

/// Input of an ETA comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtaNotice {
    pub eta: Option<NaiveDate>,
    pub previous_eta: Option<NaiveDate>,
    pub display_previous: bool,
    pub story_url: Option<String>,
}

/// Tracker view rendered into the issue body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub status: String,
    pub scheduled: bool,
    pub story_url: Option<String>,
    pub eta: Option<NaiveDate>,
}

pub trait TextRenderer: Send + Sync {
    fn eta_comment(&self, notice: &EtaNotice) -> String;

    /// Return `body` with its sync section replaced (or appended).
    fn issue_description(&self, body: &str, summary: &SyncSummary) -> String;
}
