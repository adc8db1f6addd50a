//! tracksync-core
//!
//! GitHub issues と Pivotal Tracker stories を同期するエンジン。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, ticket, story, webhook, payload, errors）
//! - **ports**: 抽象化レイヤー（TicketStore, WebHookQueue, TrackerClient, IssueSourceClient, TextRenderer, Clock）
//! - **impls**: 実装（InMemoryStore, PivotalClient, GitHubClient, MarkdownRenderer）
//! - **app**: アプリケーションロジック（builder, reconcile, consumer, eta, comments, reaper）
//! - **config**: 環境変数からの設定読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;
