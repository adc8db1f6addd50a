//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 外部システム（ストア、Pivotal Tracker、GitHub、テキスト生成）への
//! インターフェースで、app 層はここの trait だけに依存します。
//!
//! # 設計原則
//! - client はプロセス起動時に一度だけ構築し、`Arc<dyn ...>` で注入する
//! - グローバルな singleton や遅延初期化は使わない

pub mod clock;
pub mod id_generator;
pub mod issue_source;
pub mod text;
pub mod ticket_store;
pub mod tracker;
pub mod webhook_queue;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::issue_source::{IssueDetails, IssueSourceClient};
pub use self::text::{EtaNotice, SyncSummary, TextRenderer};
pub use self::ticket_store::TicketStore;
pub use self::tracker::TrackerClient;
pub use self::webhook_queue::{QueueCounts, WebHookQueue};
