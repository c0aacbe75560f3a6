//! 分发器（Dispatcher）
//!
//! 每个事件类型一个订阅循环：解码广播消息，按注册顺序逐个执行该类型的处理器。
//! 解码失败记录后丢弃，不重试；分发器从不触碰积压列表。
//!
use super::handler::{DeliveryPath, EventHandler, HandlerOutcome, run_handlers};
use crate::codec;
use crate::error::EventResult;
use crate::event_type::EventType;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct Dispatcher {
    event_type: EventType,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl Dispatcher {
    pub fn new(event_type: EventType, handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        Self {
            event_type,
            handlers,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// 消费订阅流直到流结束或收到关闭信号；正在执行的处理器链不会被打断
    pub async fn run(
        self,
        mut stream: BoxStream<'static, EventResult<String>>,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    break;
                }
                next = stream.next() => {
                    match next {
                        Some(Ok(raw)) => {
                            self.dispatch(&raw).await;
                        }
                        Some(Err(err)) => {
                            tracing::warn!(
                                event_type = %self.event_type,
                                error = %err,
                                "subscription stream error"
                            );
                        }
                        None => {
                            tracing::warn!(event_type = %self.event_type, "subscription closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// 处理单条广播消息；解码失败或类型不符时返回 `None`
    pub async fn dispatch(&self, raw: &str) -> Option<HandlerOutcome> {
        let envelope = match codec::decode(raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(
                    event_type = %self.event_type,
                    error = %err,
                    "discarding undecodable message"
                );
                return None;
            }
        };

        if envelope.event_type() != self.event_type {
            tracing::warn!(
                channel_type = %self.event_type,
                envelope_type = %envelope.event_type(),
                envelope_id = envelope.id(),
                "discarding message published on the wrong channel"
            );
            return None;
        }

        Some(run_handlers(&envelope, &self.handlers, DeliveryPath::Dispatch).await)
    }
}
