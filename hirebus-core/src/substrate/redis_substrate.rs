//! Redis 版消息底座（RedisSubstrate）
//!
//! 命令与订阅使用不同的连接：命令走可复用的 multiplexed 连接，
//! 每个订阅独占一条 pub/sub 连接（Redis 在订阅模式下不接受普通命令）。
//! 积压列表使用 LPUSH/LTRIM/LRANGE/LREM，索引语义即 Redis 原生语义。
//!
use super::MessageSubstrate;
use crate::error::{EventError, EventResult};
use ::redis::AsyncCommands;
use ::redis::aio::MultiplexedConnection;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;

#[derive(Clone)]
pub struct RedisSubstrate {
    client: ::redis::Client,
    commands: MultiplexedConnection,
}

impl RedisSubstrate {
    pub async fn connect(url: &str) -> EventResult<Self> {
        let client = ::redis::Client::open(url)?;
        let commands = client.get_multiplexed_async_connection().await?;
        tracing::info!("redis command connection established");
        Ok(Self { client, commands })
    }
}

#[async_trait]
impl MessageSubstrate for RedisSubstrate {
    async fn publish(&self, channel: &str, message: &str) -> EventResult<()> {
        let mut conn = self.commands.clone();
        let _receivers: i64 = conn.publish(channel, message).await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
    ) -> EventResult<BoxStream<'static, EventResult<String>>> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        tracing::info!(channel, "redis subscriber connected");
        let stream = pubsub
            .into_on_message()
            .map(|msg| msg.get_payload::<String>().map_err(EventError::from));
        Ok(Box::pin(stream))
    }

    async fn append_to_backlog(&self, key: &str, message: &str) -> EventResult<()> {
        let mut conn = self.commands.clone();
        let _len: i64 = conn.lpush(key, message).await?;
        Ok(())
    }

    async fn trim_backlog(&self, key: &str, max_len: usize) -> EventResult<()> {
        let mut conn = self.commands.clone();
        if max_len == 0 {
            // LTRIM key 0 -1 会保留全部元素
            let _: i64 = conn.del(key).await?;
        } else {
            let _: () = conn.ltrim(key, 0, max_len as isize - 1).await?;
        }
        Ok(())
    }

    async fn read_backlog_range(
        &self,
        key: &str,
        start: isize,
        end: isize,
    ) -> EventResult<Vec<String>> {
        let mut conn = self.commands.clone();
        Ok(conn.lrange(key, start, end).await?)
    }

    async fn remove_from_backlog(&self, key: &str, message: &str) -> EventResult<bool> {
        let mut conn = self.commands.clone();
        // 负数 count 从列表尾部（最旧一端）开始匹配
        let removed: i64 = conn.lrem(key, -1, message).await?;
        Ok(removed > 0)
    }
}
