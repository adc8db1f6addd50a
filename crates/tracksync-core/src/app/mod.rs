//! App - アプリケーション層
//!
//! ports を組み合わせて同期エンジンを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **TicketReconciler**: Ticket の upsert と story への一方向 sync
//! - **WebHookQueueConsumer**: キューの逐次ドレイン（claim→manage→done）
//! - **EtaScheduler**: iteration から ETA を計算
//! - **CommentDispatcher**: ETA コメントの投稿と issue 本文の更新
//! - **Reaper**: Lease 期限切れの回収

pub mod builder;
pub mod comments;
pub mod consumer;
pub mod eta;
pub mod reaper;
pub mod reconcile;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::comments::{CommentDispatcher, CommentReport};
pub use self::consumer::WebHookQueueConsumer;
pub use self::eta::EtaScheduler;
pub use self::reaper::{ReapReport, Reaper};
pub use self::reconcile::{StoryPass, TicketReconciler};
