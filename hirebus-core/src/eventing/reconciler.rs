//! 积压回放器（Reconciler）
//!
//! 一次回放（drain pass）从最旧一端按批读取 `queue:<type>`，逐条解码并执行该类型的
//! 全部处理器：全部成功才删除条目，任一失败则原样保留，留给下一次回放。
//! 失败条目留在列表尾部，后续批次越过这些条目继续向较新的一端读取，
//! 因此即使存在永久失败的条目，一次回放也必然结束。
//!
//! 条目状态：Pending（已追加）→ Processing（被某次回放取出）→
//! Removed（全部成功）| 回到 Pending（任一失败）。
//! 配置 `dead_letter_after` 后，在同一进程内累计失败达到阈值的条目会被移入
//! `deadletter:<type>`。
//!
use super::handler::{DeliveryPath, EventHandler, run_handlers};
use crate::codec;
use crate::error::EventResult;
use crate::event_type::{EventType, backlog_for, dead_letter_for};
use crate::substrate::MessageSubstrate;
use bon::Builder;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

pub const DEFAULT_DRAIN_BATCH_SIZE: usize = 10;

/// 一次回放的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// 本次回放取出的条目数
    pub visited: usize,
    /// 全部处理器成功并已删除
    pub removed: usize,
    /// 有处理器失败，保留在积压列表中
    pub retained: usize,
    /// 无法解码而被丢弃
    pub discarded: usize,
    /// 达到失败阈值被移入死信列表
    pub dead_lettered: usize,
}

enum EntryOutcome {
    Removed,
    Retained,
    Discarded,
    DeadLettered,
}

#[derive(Clone, Builder)]
pub struct Reconciler {
    substrate: Arc<dyn MessageSubstrate>,
    #[builder(default = DEFAULT_DRAIN_BATCH_SIZE)]
    batch_size: usize,
    dead_letter_after: Option<u32>,
    #[builder(default = 1000)]
    dead_letter_max_len: usize,
    #[builder(skip)]
    attempts: Arc<DashMap<(EventType, String), u32>>,
}

impl Reconciler {
    /// 执行一次回放；仅在存储不可达时返回错误
    pub async fn drain(
        &self,
        event_type: EventType,
        handlers: &[Arc<dyn EventHandler>],
    ) -> EventResult<DrainReport> {
        let key = backlog_for(event_type);
        let batch = self.batch_size.max(1) as isize;
        let mut report = DrainReport::default();
        let mut seen = HashSet::new();

        loop {
            // 尾部的 `retained` 条是本次已失败的条目，越过它们读取下一批最旧条目
            let skip = report.retained as isize;
            let mut entries = self
                .substrate
                .read_backlog_range(&key, -(skip + batch), -(skip + 1))
                .await?;
            if entries.is_empty() {
                break;
            }
            entries.reverse();

            for raw in entries {
                report.visited += 1;
                match self
                    .process(event_type, &key, &raw, handlers, &mut seen)
                    .await?
                {
                    EntryOutcome::Removed => report.removed += 1,
                    EntryOutcome::Retained => report.retained += 1,
                    EntryOutcome::Discarded => report.discarded += 1,
                    EntryOutcome::DeadLettered => report.dead_lettered += 1,
                }
            }
        }

        // 本次未再见到的条目已离开积压列表（被裁剪或被删除），丢弃其失败计数
        self.attempts
            .retain(|(ty, id), _| *ty != event_type || seen.contains(id));

        Ok(report)
    }

    /// 执行一次回放并把结果写入日志；用于后台任务，错误不再向上传播
    pub async fn drain_logged(
        &self,
        event_type: EventType,
        handlers: &[Arc<dyn EventHandler>],
    ) -> Option<DrainReport> {
        match self.drain(event_type, handlers).await {
            Ok(report) => {
                if report.visited > 0 {
                    tracing::info!(
                        event_type = %event_type,
                        visited = report.visited,
                        removed = report.removed,
                        retained = report.retained,
                        discarded = report.discarded,
                        dead_lettered = report.dead_lettered,
                        "backlog drain pass finished"
                    );
                } else {
                    tracing::debug!(event_type = %event_type, "backlog empty");
                }
                Some(report)
            }
            Err(err) => {
                tracing::error!(event_type = %event_type, error = %err, "backlog drain pass aborted");
                None
            }
        }
    }

    async fn process(
        &self,
        event_type: EventType,
        key: &str,
        raw: &str,
        handlers: &[Arc<dyn EventHandler>],
        seen: &mut HashSet<String>,
    ) -> EventResult<EntryOutcome> {
        let envelope = match codec::decode(raw) {
            Ok(envelope) if envelope.event_type() == event_type => envelope,
            Ok(envelope) => {
                tracing::warn!(
                    backlog_type = %event_type,
                    envelope_type = %envelope.event_type(),
                    envelope_id = envelope.id(),
                    "discarding backlog entry of the wrong type"
                );
                self.substrate.remove_from_backlog(key, raw).await?;
                return Ok(EntryOutcome::Discarded);
            }
            Err(err) => {
                tracing::warn!(
                    event_type = %event_type,
                    error = %err,
                    "discarding undecodable backlog entry"
                );
                self.substrate.remove_from_backlog(key, raw).await?;
                return Ok(EntryOutcome::Discarded);
            }
        };

        let counter_key = (event_type, envelope.id().to_string());
        let outcome = run_handlers(&envelope, handlers, DeliveryPath::Drain).await;
        if outcome.is_success() {
            self.substrate.remove_from_backlog(key, raw).await?;
            self.attempts.remove(&counter_key);
            return Ok(EntryOutcome::Removed);
        }

        let Some(limit) = self.dead_letter_after else {
            return Ok(EntryOutcome::Retained);
        };

        let attempts = {
            let mut counter = self.attempts.entry(counter_key.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        if attempts < limit {
            seen.insert(counter_key.1);
            return Ok(EntryOutcome::Retained);
        }

        let dead_letter = dead_letter_for(event_type);
        self.substrate.append_to_backlog(&dead_letter, raw).await?;
        self.substrate
            .trim_backlog(&dead_letter, self.dead_letter_max_len)
            .await?;
        self.substrate.remove_from_backlog(key, raw).await?;
        self.attempts.remove(&counter_key);

        tracing::error!(
            event_type = %event_type,
            envelope_id = envelope.id(),
            attempts,
            failed_handlers = ?outcome.failed,
            "backlog entry moved to dead letter list"
        );
        Ok(EntryOutcome::DeadLettered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Envelope;
    use crate::eventing::handler::FnHandler;
    use crate::substrate::InMemorySubstrate;
    use serde_json::json;
    use std::sync::Mutex;

    async fn seed(substrate: &InMemorySubstrate, event_type: EventType, n: usize) -> Vec<String> {
        let mut ids = Vec::new();
        for i in 0..n {
            let env = Envelope::new(event_type, json!({"n": i}));
            let raw = codec::encode(&env).unwrap();
            substrate
                .append_to_backlog(&backlog_for(event_type), &raw)
                .await
                .unwrap();
            ids.push(env.id().to_string());
        }
        ids
    }

    fn reconciler(substrate: &InMemorySubstrate) -> Reconciler {
        Reconciler::builder()
            .substrate(Arc::new(substrate.clone()))
            .build()
    }

    #[tokio::test]
    async fn successful_entries_are_removed_oldest_first() {
        let substrate = InMemorySubstrate::default();
        let ids = seed(&substrate, EventType::JobUpdated, 25).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<dyn EventHandler> = {
            let seen = seen.clone();
            Arc::new(FnHandler::new("record", move |env: Envelope| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(env.id().to_string());
                    Ok(())
                }
            }))
        };

        let report = reconciler(&substrate)
            .drain(EventType::JobUpdated, &[handler])
            .await
            .unwrap();

        assert_eq!(report.visited, 25);
        assert_eq!(report.removed, 25);
        assert_eq!(substrate.backlog_len("queue:job.updated"), 0);
        assert_eq!(*seen.lock().unwrap(), ids);
    }

    #[tokio::test]
    async fn failing_entries_stay_and_pass_terminates() {
        let substrate = InMemorySubstrate::default();
        seed(&substrate, EventType::InterviewCompleted, 15).await;

        // 偶数条目永久失败
        let handler: Arc<dyn EventHandler> =
            Arc::new(FnHandler::new("even-fails", |env: Envelope| async move {
                let n = env.payload()["n"].as_u64().unwrap_or_default();
                anyhow::ensure!(n % 2 == 1, "entry {n} rejected");
                Ok(())
            }));

        let report = reconciler(&substrate)
            .drain(EventType::InterviewCompleted, &[handler])
            .await
            .unwrap();

        assert_eq!(report.visited, 15);
        assert_eq!(report.removed, 7);
        assert_eq!(report.retained, 8);
        let remaining: Vec<u64> = substrate
            .backlog("queue:interview.completed")
            .iter()
            .map(|raw| codec::decode(raw).unwrap().payload()["n"].as_u64().unwrap())
            .collect();
        assert_eq!(remaining, vec![14, 12, 10, 8, 6, 4, 2, 0]);
    }

    #[tokio::test]
    async fn entry_kept_when_any_handler_fails_but_all_handlers_run() {
        let substrate = InMemorySubstrate::default();
        seed(&substrate, EventType::ProblemSolved, 1).await;
        let calls = Arc::new(Mutex::new(Vec::new()));

        let mk = |name: &'static str, fail: bool| -> Arc<dyn EventHandler> {
            let calls = calls.clone();
            Arc::new(FnHandler::new(name, move |_env: Envelope| {
                let calls = calls.clone();
                async move {
                    calls.lock().unwrap().push(name);
                    anyhow::ensure!(!fail, "{name} failed");
                    Ok(())
                }
            }))
        };
        let handlers = vec![mk("first", true), mk("second", false)];

        let report = reconciler(&substrate)
            .drain(EventType::ProblemSolved, &handlers)
            .await
            .unwrap();

        assert_eq!(report.retained, 1);
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(substrate.backlog_len("queue:activity.problem_solved"), 1);
    }

    #[tokio::test]
    async fn undecodable_entries_are_discarded() {
        let substrate = InMemorySubstrate::default();
        substrate
            .append_to_backlog("queue:job.created", "{garbage")
            .await
            .unwrap();
        let wrong = codec::encode(&Envelope::new(EventType::JobDeleted, json!({}))).unwrap();
        substrate
            .append_to_backlog("queue:job.created", &wrong)
            .await
            .unwrap();

        let report = reconciler(&substrate)
            .drain(EventType::JobCreated, &[])
            .await
            .unwrap();

        assert_eq!(report.discarded, 2);
        assert_eq!(substrate.backlog_len("queue:job.created"), 0);
    }

    #[tokio::test]
    async fn dead_letter_after_repeated_failures() {
        let substrate = InMemorySubstrate::default();
        seed(&substrate, EventType::NotificationSend, 1).await;
        let handler: Arc<dyn EventHandler> =
            Arc::new(FnHandler::new("always-fails", |_env: Envelope| async move {
                Err::<(), _>(anyhow::anyhow!("smtp down"))
            }));
        let reconciler = Reconciler::builder()
            .substrate(Arc::new(substrate.clone()))
            .dead_letter_after(2)
            .build();

        let first = reconciler
            .drain(EventType::NotificationSend, &[handler.clone()])
            .await
            .unwrap();
        assert_eq!(first.retained, 1);
        assert_eq!(substrate.backlog_len("queue:notification.send"), 1);

        let second = reconciler
            .drain(EventType::NotificationSend, &[handler])
            .await
            .unwrap();
        assert_eq!(second.dead_lettered, 1);
        assert_eq!(substrate.backlog_len("queue:notification.send"), 0);
        assert_eq!(substrate.backlog_len("deadletter:notification.send"), 1);
    }

    #[tokio::test]
    async fn failure_counts_are_dropped_once_entries_leave_the_backlog() {
        let substrate = InMemorySubstrate::default();
        seed(&substrate, EventType::JobCreated, 2).await;
        seed(&substrate, EventType::JobDeleted, 1).await;
        let handler: Arc<dyn EventHandler> =
            Arc::new(FnHandler::new("always-fails", |_env: Envelope| async move {
                Err::<(), _>(anyhow::anyhow!("search index down"))
            }));
        let reconciler = Reconciler::builder()
            .substrate(Arc::new(substrate.clone()))
            .dead_letter_after(5)
            .build();

        reconciler
            .drain(EventType::JobCreated, &[handler.clone()])
            .await
            .unwrap();
        reconciler
            .drain(EventType::JobDeleted, &[handler.clone()])
            .await
            .unwrap();
        assert_eq!(reconciler.attempts.len(), 3);

        // 积压列表被裁剪到只剩最新一条
        substrate.trim_backlog("queue:job.created", 1).await.unwrap();
        let report = reconciler
            .drain(EventType::JobCreated, &[handler])
            .await
            .unwrap();

        assert_eq!(report.retained, 1);
        assert_eq!(reconciler.attempts.len(), 2);
        assert!(
            reconciler
                .attempts
                .iter()
                .any(|e| e.key().0 == EventType::JobDeleted)
        );
    }

    #[tokio::test]
    async fn unreachable_store_aborts_pass() {
        let substrate = InMemorySubstrate::default();
        seed(&substrate, EventType::JobCreated, 1).await;
        substrate.set_reachable(false);

        let err = reconciler(&substrate)
            .drain(EventType::JobCreated, &[])
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
        assert!(
            reconciler(&substrate)
                .drain_logged(EventType::JobCreated, &[])
                .await
                .is_none()
        );
    }
}
