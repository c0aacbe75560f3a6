//! 发布者（Publisher）
//!
//! 构建信封后先广播到 `events:<type>`，再追加到 `queue:<type>` 并裁剪到上限。
//! 两次写入不具备事务性：任一失败都会返回错误，但另一次写入可能已经生效。
//!
use crate::codec;
use crate::envelope::Envelope;
use crate::error::EventResult;
use crate::event_type::{EventType, backlog_for, channel_for};
use crate::substrate::MessageSubstrate;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct Publisher {
    substrate: Arc<dyn MessageSubstrate>,
    backlog_max_len: usize,
}

impl Publisher {
    pub fn new(substrate: Arc<dyn MessageSubstrate>, backlog_max_len: usize) -> Self {
        Self {
            substrate,
            backlog_max_len,
        }
    }

    /// 发布事件，返回信封 id 供调用方关联
    pub async fn publish(&self, event_type: EventType, payload: Value) -> EventResult<String> {
        let envelope = Envelope::new(event_type, payload);
        self.publish_envelope(&envelope).await?;
        Ok(envelope.id().to_string())
    }

    pub async fn publish_typed<P>(&self, event_type: EventType, payload: &P) -> EventResult<String>
    where
        P: Serialize + ?Sized,
    {
        let payload = serde_json::to_value(payload)?;
        self.publish(event_type, payload).await
    }

    pub async fn publish_envelope(&self, envelope: &Envelope) -> EventResult<()> {
        let message = codec::encode(envelope)?;
        let event_type = envelope.event_type();

        let broadcast = self
            .substrate
            .publish(&channel_for(event_type), &message)
            .await;
        let backlog = self.append_to_backlog(event_type, &message).await;

        match (broadcast, backlog) {
            (Ok(()), Ok(())) => {
                tracing::debug!(
                    event_type = %event_type,
                    envelope_id = envelope.id(),
                    "published event"
                );
                Ok(())
            }
            (Err(err), backlog) => {
                tracing::error!(
                    event_type = %event_type,
                    envelope_id = envelope.id(),
                    error = %err,
                    backlog_appended = backlog.is_ok(),
                    "event broadcast failed"
                );
                Err(err)
            }
            (Ok(()), Err(err)) => {
                tracing::error!(
                    event_type = %event_type,
                    envelope_id = envelope.id(),
                    error = %err,
                    "event broadcast succeeded but backlog append failed"
                );
                Err(err)
            }
        }
    }

    async fn append_to_backlog(&self, event_type: EventType, message: &str) -> EventResult<()> {
        let key = backlog_for(event_type);
        self.substrate.append_to_backlog(&key, message).await?;
        self.substrate.trim_backlog(&key, self.backlog_max_len).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventError;
    use crate::substrate::InMemorySubstrate;
    use async_trait::async_trait;
    use futures_core::stream::BoxStream;
    use futures_util::StreamExt;
    use serde_json::json;

    /// 只让广播或只让积压写入失败的底座
    struct HalfBroken {
        inner: InMemorySubstrate,
        broadcast_down: bool,
        backlog_down: bool,
    }

    impl HalfBroken {
        fn check(down: bool) -> EventResult<()> {
            if down {
                Err(EventError::connectivity("connection reset"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl MessageSubstrate for HalfBroken {
        async fn publish(&self, channel: &str, message: &str) -> EventResult<()> {
            Self::check(self.broadcast_down)?;
            self.inner.publish(channel, message).await
        }

        async fn subscribe(
            &self,
            channel: &str,
        ) -> EventResult<BoxStream<'static, EventResult<String>>> {
            self.inner.subscribe(channel).await
        }

        async fn append_to_backlog(&self, key: &str, message: &str) -> EventResult<()> {
            Self::check(self.backlog_down)?;
            self.inner.append_to_backlog(key, message).await
        }

        async fn trim_backlog(&self, key: &str, max_len: usize) -> EventResult<()> {
            Self::check(self.backlog_down)?;
            self.inner.trim_backlog(key, max_len).await
        }

        async fn read_backlog_range(
            &self,
            key: &str,
            start: isize,
            end: isize,
        ) -> EventResult<Vec<String>> {
            self.inner.read_backlog_range(key, start, end).await
        }

        async fn remove_from_backlog(&self, key: &str, message: &str) -> EventResult<bool> {
            self.inner.remove_from_backlog(key, message).await
        }
    }

    #[tokio::test]
    async fn failed_broadcast_still_appends_to_backlog() {
        let inner = InMemorySubstrate::default();
        let publisher = Publisher::new(
            Arc::new(HalfBroken {
                inner: inner.clone(),
                broadcast_down: true,
                backlog_down: false,
            }),
            1000,
        );

        let err = publisher
            .publish(EventType::ApplicationCreated, json!({"jobId": "j1"}))
            .await
            .unwrap_err();
        assert!(err.is_connectivity());

        let backlog = inner.backlog("queue:application.created");
        assert_eq!(backlog.len(), 1);
        assert_eq!(
            codec::decode(&backlog[0]).unwrap().payload(),
            &json!({"jobId": "j1"})
        );
    }

    #[tokio::test]
    async fn failed_backlog_append_is_surfaced_after_broadcast() {
        let inner = InMemorySubstrate::default();
        let mut stream = inner.subscribe("events:application.created").await.unwrap();
        let publisher = Publisher::new(
            Arc::new(HalfBroken {
                inner: inner.clone(),
                broadcast_down: false,
                backlog_down: true,
            }),
            1000,
        );

        let err = publisher
            .publish(EventType::ApplicationCreated, json!({"jobId": "j2"}))
            .await
            .unwrap_err();
        assert!(err.is_connectivity());

        let raw = stream.next().await.unwrap().unwrap();
        assert_eq!(codec::decode(&raw).unwrap().payload(), &json!({"jobId": "j2"}));
        assert_eq!(inner.backlog_len("queue:application.created"), 0);
    }

    #[tokio::test]
    async fn publish_broadcasts_and_appends() {
        let substrate = InMemorySubstrate::default();
        let publisher = Publisher::new(Arc::new(substrate.clone()), 1000);
        let mut stream = substrate.subscribe("events:job.created").await.unwrap();

        let id = publisher
            .publish(EventType::JobCreated, json!({"jobId": "j7"}))
            .await
            .unwrap();
        assert!(!id.is_empty());

        let raw = stream.next().await.unwrap().unwrap();
        let env = codec::decode(&raw).unwrap();
        assert_eq!(env.id(), id);
        assert_eq!(env.payload(), &json!({"jobId": "j7"}));

        assert_eq!(substrate.backlog("queue:job.created"), vec![raw]);
    }

    #[tokio::test]
    async fn backlog_is_trimmed_after_each_append() {
        let substrate = InMemorySubstrate::default();
        let publisher = Publisher::new(Arc::new(substrate.clone()), 3);

        for i in 0..5 {
            publisher
                .publish(EventType::UserRegistered, json!({"n": i}))
                .await
                .unwrap();
            assert!(substrate.backlog_len("queue:user.registered") <= 3);
        }
        let kept: Vec<i64> = substrate
            .backlog("queue:user.registered")
            .iter()
            .map(|raw| codec::decode(raw).unwrap().payload()["n"].as_i64().unwrap())
            .collect();
        assert_eq!(kept, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn unreachable_store_surfaces_connectivity_error() {
        let substrate = InMemorySubstrate::default();
        substrate.set_reachable(false);
        let publisher = Publisher::new(Arc::new(substrate), 1000);

        let err = publisher
            .publish(EventType::JobCreated, json!({}))
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn publish_typed_serializes_payload() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Solved<'a> {
            user_id: &'a str,
            problem_id: &'a str,
        }

        let substrate = InMemorySubstrate::default();
        let publisher = Publisher::new(Arc::new(substrate.clone()), 1000);
        publisher
            .publish_typed(
                EventType::ProblemSolved,
                &Solved {
                    user_id: "u1",
                    problem_id: "p42",
                },
            )
            .await
            .unwrap();

        let raw = &substrate.backlog("queue:activity.problem_solved")[0];
        let env = codec::decode(raw).unwrap();
        assert_eq!(env.payload(), &json!({"userId": "u1", "problemId": "p42"}));
    }
}
