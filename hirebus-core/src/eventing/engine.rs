//! 事件系统引擎（EventSystem）
//!
//! 启动编排：对每个注册了处理器的事件类型
//! 1. 订阅 `events:<type>`（订阅失败直接返回给宿主进程）；
//! 2. 启动该类型的分发循环；
//! 3. 启动该类型的回放任务：先回放一次积压，若配置了 `drain_interval`
//!    再按间隔继续回放（同一类型的回放从不并发）。
//!
//! 每个类型的投递路径都是独立任务，慢处理器只会拖慢本类型。
//! 返回的 `EngineHandle` 用于关闭与等待；关闭只在信封之间生效，
//! 不会打断正在执行的处理器链或回放。
//!
use super::dispatcher::Dispatcher;
use super::handler::EventHandler;
use super::publisher::Publisher;
use super::reconciler::{DEFAULT_DRAIN_BATCH_SIZE, Reconciler};
use super::registry::HandlerRegistry;
use crate::error::EventResult;
use crate::event_type::{EventType, channel_for};
use crate::substrate::MessageSubstrate;
use bon::Builder;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BACKLOG_MAX_LEN: usize = 1000;

/// 事件系统配置
#[derive(Clone, Copy, Debug, Builder)]
pub struct EventSystemConfig {
    /// 每次追加后积压列表保留的最新条目数
    #[builder(default = DEFAULT_BACKLOG_MAX_LEN)]
    pub backlog_max_len: usize,
    /// 回放时每批读取的条目数
    #[builder(default = DEFAULT_DRAIN_BATCH_SIZE)]
    pub drain_batch_size: usize,
    /// 周期回放间隔；`None` 表示只在启动时回放一次
    pub drain_interval: Option<Duration>,
    /// 同一条目失败多少次后移入死信列表；`None` 表示无限重试
    pub dead_letter_after: Option<u32>,
}

impl Default for EventSystemConfig {
    fn default() -> Self {
        Self {
            backlog_max_len: DEFAULT_BACKLOG_MAX_LEN,
            drain_batch_size: DEFAULT_DRAIN_BATCH_SIZE,
            drain_interval: None,
            dead_letter_after: None,
        }
    }
}

#[derive(Builder)]
pub struct EventSystem {
    substrate: Arc<dyn MessageSubstrate>,
    registry: HandlerRegistry,
    #[builder(default)]
    config: EventSystemConfig,
}

impl EventSystem {
    pub fn config(&self) -> &EventSystemConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn publisher(&self) -> Publisher {
        Publisher::new(self.substrate.clone(), self.config.backlog_max_len)
    }

    /// 新建回放器；死信计数只在同一个回放器实例内累计
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::builder()
            .substrate(self.substrate.clone())
            .batch_size(self.config.drain_batch_size)
            .maybe_dead_letter_after(self.config.dead_letter_after)
            .dead_letter_max_len(self.config.backlog_max_len)
            .build()
    }

    /// 启动事件系统，返回可用于关闭/等待的句柄
    pub async fn start(self: Arc<Self>) -> EventResult<EngineHandle> {
        let mut handle = EngineHandle {
            token: CancellationToken::new(),
            tasks: Vec::new(),
        };
        let reconciler = self.reconciler();

        for event_type in self.registry.event_types() {
            let handlers: Vec<Arc<dyn EventHandler>> =
                self.registry.handlers_for(event_type).to_vec();

            // 订阅失败时 handle 被丢弃，已启动的任务随之收到关闭信号
            let stream = self.substrate.subscribe(&channel_for(event_type)).await?;
            tracing::info!(
                event_type = %event_type,
                handlers = handlers.len(),
                "subscribed to event channel"
            );

            let dispatcher = Dispatcher::new(event_type, handlers.clone());
            handle
                .tasks
                .push(tokio::spawn(dispatcher.run(stream, handle.token.clone())));

            handle.tasks.push(Self::spawn_drain(
                handle.token.clone(),
                self.config.drain_interval,
                reconciler.clone(),
                event_type,
                handlers,
            ));
        }

        if handle.tasks.is_empty() {
            tracing::warn!("event system started without any registered handler");
        }

        Ok(handle)
    }

    /// 每个类型只有一个回放任务：先执行启动回放，再按间隔循环，
    /// 同一类型的回放因此严格串行
    fn spawn_drain(
        token: CancellationToken,
        interval: Option<Duration>,
        reconciler: Reconciler,
        event_type: EventType,
        handlers: Vec<Arc<dyn EventHandler>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            reconciler.drain_logged(event_type, &handlers).await;

            let Some(interval) = interval else {
                return;
            };
            // 首次回放已在上面完成，从一个间隔之后开始计时
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        reconciler.drain_logged(event_type, &handlers).await;
                    }
                }
            }
        })
    }
}

/// 一步完成构建与启动：返回发布者与运行句柄
pub async fn init(
    substrate: Arc<dyn MessageSubstrate>,
    registry: HandlerRegistry,
    config: EventSystemConfig,
) -> EventResult<(Publisher, EngineHandle)> {
    let system = Arc::new(
        EventSystem::builder()
            .substrate(substrate)
            .registry(registry)
            .config(config)
            .build(),
    );
    let publisher = system.publisher();
    let handle = system.start().await?;
    Ok((publisher, handle))
}

/// 运行句柄：用于优雅关闭与等待任务结束
pub struct EngineHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(mut self) {
        let tasks = std::mem::take(&mut self.tasks);

        for t in tasks {
            let _ = t.await;
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
