/// 事件系统（内存版）示例
/// 展示 发布 -> 频道分发 -> 处理器 的实时路径，以及处理器失败后由积压回放补偿
use anyhow::Result as AnyResult;
use hirebus_core::event_type::backlog_for;
use hirebus_core::eventing::{EventHandler, FnHandler};
use hirebus_core::{
    Envelope, EventSystem, EventSystemConfig, EventType, HandlerRegistry, InMemorySubstrate,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

// ============================================================================
// 示例处理器（EventHandler）
// ============================================================================

/// 第一次调用失败，之后成功；模拟短暂的下游故障
struct FlakyMailer {
    recovered: AtomicBool,
}

#[async_trait::async_trait]
impl EventHandler for FlakyMailer {
    fn handler_name(&self) -> &str {
        "flaky-mailer"
    }

    async fn handle(&self, envelope: &Envelope) -> AnyResult<()> {
        if !self.recovered.swap(true, Ordering::SeqCst) {
            anyhow::bail!("smtp relay unavailable");
        }
        println!("[flaky-mailer] welcome mail sent for {}", envelope.payload()["userId"]);
        Ok(())
    }
}

// ============================================================================
// main
// ============================================================================

#[tokio::main]
async fn main() -> AnyResult<()> {
    let substrate = InMemorySubstrate::default();

    let mut registry = HandlerRegistry::new();
    registry
        .register(
            EventType::UserRegistered,
            Arc::new(FlakyMailer {
                recovered: AtomicBool::new(false),
            }),
        )
        .register(
            EventType::UserRegistered,
            Arc::new(FnHandler::new("audit", |env: Envelope| async move {
                println!("[audit] {} {}", env.event_type(), env.id());
                anyhow::Ok(())
            })),
        );

    let system = Arc::new(
        EventSystem::builder()
            .substrate(Arc::new(substrate.clone()))
            .registry(registry)
            .config(
                EventSystemConfig::builder()
                    .drain_interval(Duration::from_millis(200))
                    .build(),
            )
            .build(),
    );
    let publisher = system.publisher();
    let handle = system.clone().start().await?;

    publisher
        .publish(EventType::UserRegistered, json!({"userId": "u1"}))
        .await?;

    let key = backlog_for(EventType::UserRegistered);
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("backlog after live dispatch: {}", substrate.backlog_len(&key));

    // 周期回放在下一个间隔重试失败的条目
    tokio::time::sleep(Duration::from_millis(400)).await;
    println!("backlog after periodic drain: {}", substrate.backlog_len(&key));

    handle.shutdown();
    handle.join().await;
    Ok(())
}
