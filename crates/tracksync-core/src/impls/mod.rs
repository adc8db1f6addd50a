//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStore**: TicketStore + WebHookQueue（プロセス内、開発・テスト用）
//! - **PivotalClient**: Pivotal Tracker v5 REST
//! - **GitHubClient**: GitHub issues REST（1 リポジトリにスコープ）
//! - **MarkdownRenderer**: ETA コメントと issue 本文の sync block

mod http;

pub mod github;
pub mod markdown;
pub mod memory_store;
pub mod pivotal;

pub use self::github::GitHubClient;
pub use self::markdown::MarkdownRenderer;
pub use self::memory_store::InMemoryStore;
pub use self::pivotal::PivotalClient;
