//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - client は一度だけ構築して `Arc<dyn Port>` で全コンポーネントに共有する

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::comments::CommentDispatcher;
use super::consumer::WebHookQueueConsumer;
use super::eta::EtaScheduler;
use super::reaper::Reaper;
use super::reconcile::TicketReconciler;
use crate::config::{ConfigError, SyncConfig, SyncSettings};
use crate::domain::{StoreError, WebHookId, WebHookRecord};
use crate::impls::{GitHubClient, MarkdownRenderer, PivotalClient};
use crate::ports::{
    Clock, IdGenerator, IssueSourceClient, QueueCounts, SystemClock, TextRenderer, TicketStore,
    TrackerClient, UlidGenerator, WebHookQueue,
};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let store = Arc::new(InMemoryStore::new());
/// let app = AppBuilder::new()
///     .store(store)
///     .remote_clients(&config)?
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - store / queue / tracker / issue source は必須
/// - build() 時に不足をまとめて BuildError で返す
/// - clock と renderer にはデフォルトがある
pub struct AppBuilder {
    ticket_store: Option<Arc<dyn TicketStore>>,
    queue: Option<Arc<dyn WebHookQueue>>,
    tracker: Option<Arc<dyn TrackerClient>>,
    issues: Option<Arc<dyn IssueSourceClient>>,
    renderer: Arc<dyn TextRenderer>,
    clock: Arc<dyn Clock>,
    settings: SyncSettings,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing ports: {0:?}. These must be provided before build()")]
    MissingPorts(Vec<&'static str>),

    #[error("setting `{name}` is invalid: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            ticket_store: None,
            queue: None,
            tracker: None,
            issues: None,
            renderer: Arc::new(MarkdownRenderer::new()),
            clock: Arc::new(SystemClock),
            settings: SyncSettings::default(),
        }
    }

    /// Use one backend for both the ticket store and the webhook queue.
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: TicketStore + WebHookQueue + 'static,
    {
        self.ticket_store(store.clone()).queue(store)
    }

    pub fn ticket_store(mut self, store: Arc<dyn TicketStore>) -> Self {
        self.ticket_store = Some(store);
        self
    }

    pub fn queue(mut self, queue: Arc<dyn WebHookQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn tracker(mut self, tracker: Arc<dyn TrackerClient>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn issue_source(mut self, issues: Arc<dyn IssueSourceClient>) -> Self {
        self.issues = Some(issues);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn TextRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the Pivotal and GitHub clients from `config` and adopt its settings.
    pub fn remote_clients(self, config: &SyncConfig) -> Result<Self, ConfigError> {
        let timeout = config.settings.http_timeout;
        let tracker = PivotalClient::new(config.tracker.clone(), timeout)?;
        let issues = GitHubClient::new(config.github.clone(), timeout)?;
        debug!(
            project_id = config.tracker.project_id,
            repository = %issues.repository(),
            "remote clients built"
        );
        Ok(self
            .tracker(Arc::new(tracker))
            .issue_source(Arc::new(issues))
            .settings(config.settings.clone()))
    }

    /// # 検証
    /// - 必須 port が全て揃っているか
    /// - lease timeout が chrono で表現できるか
    pub fn build(self) -> Result<App, BuildError> {
        let missing: Vec<&'static str> = [
            ("ticket_store", self.ticket_store.is_none()),
            ("queue", self.queue.is_none()),
            ("tracker", self.tracker.is_none()),
            ("issue_source", self.issues.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        let (Some(store), Some(queue), Some(tracker), Some(issues)) =
            (self.ticket_store, self.queue, self.tracker, self.issues)
        else {
            return Err(BuildError::MissingPorts(missing));
        };

        let lease_timeout = chrono::Duration::from_std(self.settings.lease_timeout).map_err(
            |error| BuildError::InvalidSetting {
                name: "lease_timeout",
                reason: error.to_string(),
            },
        )?;
        if self.settings.triggering_label.trim().is_empty() {
            return Err(BuildError::InvalidSetting {
                name: "triggering_label",
                reason: "must not be blank".to_owned(),
            });
        }

        let reconciler = Arc::new(TicketReconciler::new(
            store.clone(),
            tracker.clone(),
            self.clock.clone(),
            self.settings.triggering_label.clone(),
        ));

        Ok(App {
            consumer: WebHookQueueConsumer::new(
                queue.clone(),
                store.clone(),
                reconciler.clone(),
                self.clock.clone(),
            ),
            eta_scheduler: EtaScheduler::new(
                store.clone(),
                tracker,
                self.clock.clone(),
                self.settings.eta_lead_days,
            ),
            comment_dispatcher: CommentDispatcher::new(
                store,
                issues,
                self.renderer,
                reconciler,
                self.clock.clone(),
            ),
            reaper: Reaper::new(
                queue.clone(),
                self.clock.clone(),
                lease_timeout,
                self.settings.max_claims,
            ),
            ids: UlidGenerator::new(self.clock.clone()),
            queue,
            clock: self.clock,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は組み立て済みの同期エンジン
pub struct App {
    consumer: WebHookQueueConsumer,
    eta_scheduler: EtaScheduler,
    comment_dispatcher: CommentDispatcher,
    reaper: Reaper,
    ids: UlidGenerator<Arc<dyn Clock>>,
    queue: Arc<dyn WebHookQueue>,
    clock: Arc<dyn Clock>,
}

impl App {
    pub fn consumer(&self) -> &WebHookQueueConsumer {
        &self.consumer
    }

    pub fn eta_scheduler(&self) -> &EtaScheduler {
        &self.eta_scheduler
    }

    pub fn comment_dispatcher(&self) -> &CommentDispatcher {
        &self.comment_dispatcher
    }

    pub fn reaper(&self) -> &Reaper {
        &self.reaper
    }

    pub async fn queue_counts(&self) -> Result<QueueCounts, StoreError> {
        self.queue.counts().await
    }

    /// Record one webhook delivery as TODO, the way the receiver does.
    pub async fn enqueue_webhook(
        &self,
        issue: Value,
        sender: Value,
    ) -> Result<WebHookId, StoreError> {
        let id = self.ids.generate_webhook_id();
        self.queue
            .enqueue(WebHookRecord::new(id, issue, sender, self.clock.now()))
            .await?;
        debug!(record = %id, "webhook enqueued");
        Ok(id)
    }
}
