//! 消息底座（MessageSubstrate）协议
//!
//! 对外部共享存储的最小契约：频道发布/订阅 + 有界积压列表的追加、裁剪、
//! 区间读取与按值删除。所有操作在存储不可达时返回 `EventError::Connectivity`，
//! 适配器内部从不重试，重试交由宿主进程的监督机制。
//!
//! 积压列表的索引与 Redis 列表一致：0 为最新条目，负数从最旧一端计数（-1 为最旧）。
//!
mod inmemory;
#[cfg(feature = "redis")]
mod redis_substrate;

pub use inmemory::InMemorySubstrate;
#[cfg(feature = "redis")]
pub use redis_substrate::RedisSubstrate;

use crate::error::EventResult;
use async_trait::async_trait;
use futures_core::stream::BoxStream;

#[async_trait]
pub trait MessageSubstrate: Send + Sync {
    /// 向频道广播一条已编码的消息；没有订阅者时消息直接丢失
    async fn publish(&self, channel: &str, message: &str) -> EventResult<()>;

    /// 订阅频道，返回 'static 生命周期的消息流，便于在 tokio::spawn 中消费
    async fn subscribe(&self, channel: &str) -> EventResult<BoxStream<'static, EventResult<String>>>;

    /// 在积压列表最新一端追加
    async fn append_to_backlog(&self, key: &str, message: &str) -> EventResult<()>;

    /// 仅保留最新的 `max_len` 条
    async fn trim_backlog(&self, key: &str, max_len: usize) -> EventResult<()>;

    /// 读取闭区间 `[start, end]`，按最新到最旧的顺序返回
    async fn read_backlog_range(&self, key: &str, start: isize, end: isize)
    -> EventResult<Vec<String>>;

    /// 删除一条与 `message` 完全相同的条目，返回是否删除成功
    async fn remove_from_backlog(&self, key: &str, message: &str) -> EventResult<bool>;
}
