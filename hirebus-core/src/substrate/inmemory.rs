//! 内存版消息底座（InMemorySubstrate）
//!
//! 每个频道一个 `tokio::sync::broadcast`，每个积压列表一个双端队列（队首为最新）。
//! 提供可达性开关以模拟存储宕机。典型用途：测试、示例与本地开发。
//!
use super::MessageSubstrate;
use crate::error::{EventError, EventResult};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct InMemorySubstrate {
    inner: Arc<Inner>,
}

struct Inner {
    channels: DashMap<String, broadcast::Sender<String>>,
    backlogs: DashMap<String, VecDeque<String>>,
    reachable: AtomicBool,
    capacity: usize,
}

impl Default for InMemorySubstrate {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl InMemorySubstrate {
    /// `capacity` 为每个频道的广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                channels: DashMap::new(),
                backlogs: DashMap::new(),
                reachable: AtomicBool::new(true),
                capacity,
            }),
        }
    }

    /// 模拟存储宕机/恢复
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn backlog_len(&self, key: &str) -> usize {
        self.inner.backlogs.get(key).map(|l| l.len()).unwrap_or(0)
    }

    /// 积压列表快照，最新在前
    pub fn backlog(&self, key: &str) -> Vec<String> {
        self.inner
            .backlogs
            .get(key)
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.inner
            .channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    fn ensure_reachable(&self) -> EventResult<()> {
        if self.inner.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EventError::connectivity("in-memory substrate unreachable"))
        }
    }
}

#[async_trait]
impl MessageSubstrate for InMemorySubstrate {
    async fn publish(&self, channel: &str, message: &str) -> EventResult<()> {
        self.ensure_reachable()?;
        if let Some(tx) = self.inner.channels.get(channel) {
            // 没有订阅者时 send 返回错误，与 PUBLISH 返回 0 等价，忽略
            let _ = tx.send(message.to_string());
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
    ) -> EventResult<BoxStream<'static, EventResult<String>>> {
        self.ensure_reachable()?;
        let rx = self
            .inner
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .subscribe();
        let stream = BroadcastStream::new(rx)
            .map(|r| r.map_err(|e| EventError::connectivity(e.to_string())));
        Ok(Box::pin(stream))
    }

    async fn append_to_backlog(&self, key: &str, message: &str) -> EventResult<()> {
        self.ensure_reachable()?;
        self.inner
            .backlogs
            .entry(key.to_string())
            .or_default()
            .push_front(message.to_string());
        Ok(())
    }

    async fn trim_backlog(&self, key: &str, max_len: usize) -> EventResult<()> {
        self.ensure_reachable()?;
        if let Some(mut list) = self.inner.backlogs.get_mut(key) {
            list.truncate(max_len);
        }
        Ok(())
    }

    async fn read_backlog_range(
        &self,
        key: &str,
        start: isize,
        end: isize,
    ) -> EventResult<Vec<String>> {
        self.ensure_reachable()?;
        let Some(list) = self.inner.backlogs.get(key) else {
            return Ok(Vec::new());
        };
        let Some((from, to)) = resolve_range(list.len(), start, end) else {
            return Ok(Vec::new());
        };
        Ok(list.range(from..=to).cloned().collect())
    }

    async fn remove_from_backlog(&self, key: &str, message: &str) -> EventResult<bool> {
        self.ensure_reachable()?;
        let Some(mut list) = self.inner.backlogs.get_mut(key) else {
            return Ok(false);
        };
        match list.iter().rposition(|m| m == message) {
            Some(pos) => {
                list.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// 按 LRANGE 语义把（可能为负的）闭区间换算成实际下标
fn resolve_range(len: usize, start: isize, end: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { len + start } else { start }.max(0);
    let end = if end < 0 { len + end } else { end }.min(len - 1);
    if len == 0 || start > end {
        return None;
    }
    Some((start as usize, end as usize))
}
