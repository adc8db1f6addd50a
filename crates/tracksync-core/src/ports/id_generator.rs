//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::WebHookId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は WebHookRecord の ID を生成
///
/// # ULID の特性
/// - 時刻でソート可能（= キューの FIFO 順になる）
/// - 複数の receiver プロセスから調整なしで生成できる
pub trait IdGenerator: Send + Sync {
    fn generate_webhook_id(&self) -> WebHookId;
}

/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時は FixedClock を渡すと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_webhook_id(&self) -> WebHookId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        WebHookId::from(ulid)
    }
}
